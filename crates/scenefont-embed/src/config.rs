//! Embedding Configuration

use std::path::Path;
use std::time::Duration;

use scenefont_font::{CodepointPolicy, GlyfSubsetter, Woff2Codec};
use scenefont_net::NetOptions;
use scenefont_scene::{FontFamilyRegistry, DEFAULT_FAMILY};
use serde::{Deserialize, Serialize};
use url::Url;

/// Embedding configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Base URL font files are resolved against (`<base>/<family>.woff2`)
    pub font_base_url: String,

    /// Family every chain ends with, and the name unresolved ids map to
    pub default_family: String,

    /// Installed font named in fallback `@font-face` rules
    pub local_fallback_family: String,

    /// Families placed between the resolved family and the default
    pub fallback_families: Vec<String>,

    /// Codepoints resolved per subsetting batch
    pub subset_batch_size: usize,

    /// Add the CJK Unified Ideographs block to every subset
    pub include_cjk_unified: bool,

    /// Apply the WOFF2 glyf/loca transform when encoding
    pub transform_glyf: bool,

    /// Brotli quality (0-11)
    pub brotli_quality: u32,

    /// HTTP timeout per font request
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            font_base_url: "http://localhost/".to_string(),
            default_family: DEFAULT_FAMILY.to_string(),
            local_fallback_family: "Arial".to_string(),
            fallback_families: Vec::new(),
            subset_batch_size: scenefont_font::subset::DEFAULT_BATCH_SIZE,
            include_cjk_unified: false,
            transform_glyf: true,
            brotli_quality: scenefont_font::woff2::MAX_QUALITY,
            request_timeout_secs: 30,
            user_agent: format!("scenefont/{}", crate::VERSION),
        }
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A font URL could not be formed
#[derive(Debug, thiserror::Error)]
pub enum FontUrlError {
    #[error("Invalid font base URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("Font base URL '{0}' cannot take path segments")]
    CannotBeABase(String),
}

impl EmbedConfig {
    /// Parse JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_font_base_url(mut self, url: &str) -> Self {
        self.font_base_url = url.to_string();
        self
    }

    pub fn with_default_family(mut self, family: &str) -> Self {
        self.default_family = family.to_string();
        self
    }

    pub fn with_local_fallback_family(mut self, family: &str) -> Self {
        self.local_fallback_family = family.to_string();
        self
    }

    pub fn with_fallback_family(mut self, family: &str) -> Self {
        self.fallback_families.push(family.to_string());
        self
    }

    pub fn with_subset_batch_size(mut self, size: usize) -> Self {
        self.subset_batch_size = size;
        self
    }

    pub fn with_cjk_unified(mut self, include: bool) -> Self {
        self.include_cjk_unified = include;
        self
    }

    pub fn with_glyf_transform(mut self, enabled: bool) -> Self {
        self.transform_glyf = enabled;
        self
    }

    /// URL of a family's WOFF2 file. The file name is appended as one
    /// percent-encoded path segment.
    pub fn font_url(&self, family: &str) -> Result<Url, FontUrlError> {
        let mut url = Url::parse(&self.font_base_url)?;
        url.path_segments_mut()
            .map_err(|_| FontUrlError::CannotBeABase(self.font_base_url.clone()))?
            .pop_if_empty()
            .push(&format!("{family}.woff2"));
        Ok(url)
    }

    pub fn codepoint_policy(&self) -> CodepointPolicy {
        CodepointPolicy::with_cjk_unified(self.include_cjk_unified)
    }

    pub fn codec(&self) -> Woff2Codec {
        Woff2Codec::new()
            .with_glyf_transform(self.transform_glyf)
            .with_quality(self.brotli_quality)
    }

    pub fn subsetter(&self) -> GlyfSubsetter {
        GlyfSubsetter::new().with_batch_size(self.subset_batch_size)
    }

    pub fn net_options(&self) -> NetOptions {
        NetOptions {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// The Excalidraw registry with this config's default family
    pub fn registry(&self) -> FontFamilyRegistry {
        let mut registry = FontFamilyRegistry::excalidraw();
        registry.set_default_family(&self.default_family);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmbedConfig::default();
        assert_eq!(config.default_family, "Segoe UI Emoji");
        assert_eq!(config.local_fallback_family, "Arial");
        assert_eq!(config.subset_batch_size, 1000);
        assert!(!config.include_cjk_unified);
        assert!(config.fallback_families.is_empty());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EmbedConfig::from_json_str(
            r#"{ "font_base_url": "https://cdn.test/fonts/", "include_cjk_unified": true }"#,
        )
        .unwrap();
        assert_eq!(config.font_base_url, "https://cdn.test/fonts/");
        assert!(config.include_cjk_unified);
        assert_eq!(config.local_fallback_family, "Arial");
        assert_eq!(config.brotli_quality, 11);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EmbedConfig::from_json_str("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_font_url_percent_encodes() {
        let config = EmbedConfig::default();
        assert_eq!(
            config.font_url("Lilita One").unwrap().as_str(),
            "http://localhost/Lilita%20One.woff2"
        );
        assert_eq!(
            config.font_url("A/B#C").unwrap().as_str(),
            "http://localhost/A%2FB%23C.woff2"
        );
    }

    #[test]
    fn test_font_url_keeps_base_path() {
        let config = EmbedConfig::default().with_font_base_url("https://cdn.test/assets/fonts/");
        assert_eq!(
            config.font_url("Virgil").unwrap().as_str(),
            "https://cdn.test/assets/fonts/Virgil.woff2"
        );
    }

    #[test]
    fn test_font_url_errors() {
        let bad = EmbedConfig::default().with_font_base_url("not a url");
        assert!(matches!(bad.font_url("Virgil"), Err(FontUrlError::Parse(_))));

        let opaque = EmbedConfig::default().with_font_base_url("data:text/plain,x");
        assert!(matches!(opaque.font_url("Virgil"), Err(FontUrlError::CannotBeABase(_))));
    }

    #[test]
    fn test_registry_uses_default_family() {
        let registry = EmbedConfig::default().with_default_family("Noto Emoji").registry();
        assert_eq!(registry.default_family(), "Noto Emoji");
        assert_eq!(registry.name(1), Some("Virgil"));
    }
}
