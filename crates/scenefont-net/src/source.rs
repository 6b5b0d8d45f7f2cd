//! Network and file font source

use std::time::Duration;

use url::Url;

use crate::{FetchError, FontSource};

/// Client options for [`NetFontSource`]
#[derive(Debug, Clone)]
pub struct NetOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("scenefont/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fetches fonts over http/https and from `file:` URLs.
///
/// The HTTP client is blocking; requests run on smol's blocking pool so
/// the returned futures work on any executor.
#[derive(Debug, Clone)]
pub struct NetFontSource {
    client: reqwest::blocking::Client,
}

impl NetFontSource {
    pub fn new(options: NetOptions) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let client = self.client.clone();
        let url = url.clone();
        smol::unblock(move || {
            let response = client.get(url.as_str()).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            Ok(response.bytes()?.to_vec())
        })
        .await
    }
}

impl FontSource for NetFontSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(%url, "fetching font");
        let body = match url.scheme() {
            "http" | "https" => self.fetch_http(url).await?,
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::UnsupportedScheme(url.to_string()))?;
                smol::fs::read(path).await?
            }
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        };
        tracing::debug!(%url, bytes = body.len(), "fetched font");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = NetOptions::default();
        assert!(options.user_agent.starts_with("scenefont/"));
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_unsupported_scheme() {
        let source = NetFontSource::new(NetOptions::default()).unwrap();
        let url = Url::parse("ftp://example.com/Virgil.woff2").unwrap();
        let err = smol::block_on(source.fetch(&url)).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(s) if s == "ftp"));
    }
}
