//! scenefont Networking
//!
//! Byte retrieval for font binaries:
//! - `FontSource` contract used by the embedder
//! - `NetFontSource` for http/https (reqwest) and `file:` URLs
//! - `MemoryFontSource` for hosts that bundle their fonts

mod memory;
mod source;

pub use memory::MemoryFontSource;
pub use source::{NetFontSource, NetOptions};
pub use url::Url;

/// Something that can produce the bytes behind a font URL
#[allow(async_fn_in_trait)]
pub trait FontSource {
    /// Fetch the full body behind `url`
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

impl<S: FontSource + ?Sized> FontSource for &S {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url).await
    }
}

/// Fetch error
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

impl FetchError {
    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
