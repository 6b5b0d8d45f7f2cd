//! Font Embedder
//!
//! Turns one family plus the characters it renders into an `@font-face`
//! rule. Every failure past the URL stage ends in a local-font fallback
//! rule, so embedding a family never fails.

use std::collections::BTreeSet;

use scenefont_font::{codepoints_for, CodecError, FontCodec, Subsetter};
use scenefont_net::{FetchError, FontSource};
use scenefont_svg::VectorDocument;
use tracing::{debug, info, warn};

use crate::config::{EmbedConfig, FontUrlError};
use crate::css;

// ============================================================================
// Records
// ============================================================================

/// Why a family was not embedded
#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error("{0}")]
    Url(#[from] FontUrlError),

    #[error("fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("decoding failed: {0}")]
    Decode(#[source] CodecError),

    #[error("encoding failed: {0}")]
    Encode(#[source] CodecError),
}

/// Result of preparing one family
#[derive(Debug)]
pub enum FontOutcome {
    /// Subset font inlined as a `data:` URI
    Embedded { data_uri: String },
    /// Local fonts named instead
    Fallback {
        reason: FallbackReason,
        local_fallback: String,
    },
}

/// A prepared family, ready to become a style node
#[derive(Debug)]
pub struct EmbeddedFont {
    pub family: String,
    pub outcome: FontOutcome,
}

impl EmbeddedFont {
    pub fn is_embedded(&self) -> bool {
        matches!(self.outcome, FontOutcome::Embedded { .. })
    }

    pub fn data_uri(&self) -> Option<&str> {
        match &self.outcome {
            FontOutcome::Embedded { data_uri } => Some(data_uri),
            FontOutcome::Fallback { .. } => None,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match &self.outcome {
            FontOutcome::Embedded { .. } => None,
            FontOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    /// The `@font-face` rule for this record
    pub fn to_css(&self) -> String {
        match &self.outcome {
            FontOutcome::Embedded { data_uri } => css::embedded_font_face(&self.family, data_uri),
            FontOutcome::Fallback { local_fallback, .. } => {
                css::local_font_face(&self.family, local_fallback)
            }
        }
    }
}

// ============================================================================
// Embedder
// ============================================================================

/// Fetches, subsets and re-encodes families through a [`FontSource`]
pub struct FontEmbedder<S> {
    source: S,
    config: EmbedConfig,
    codec: Box<dyn FontCodec>,
    subsetter: Box<dyn Subsetter>,
}

impl<S: FontSource> FontEmbedder<S> {
    /// Embedder using the config's WOFF2 codec and glyf subsetter
    pub fn new(source: S, config: EmbedConfig) -> Self {
        let codec = Box::new(config.codec());
        let subsetter = Box::new(config.subsetter());
        Self {
            source,
            config,
            codec,
            subsetter,
        }
    }

    pub fn with_codec(mut self, codec: impl FontCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn with_subsetter(mut self, subsetter: impl Subsetter + 'static) -> Self {
        self.subsetter = Box::new(subsetter);
        self
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Build the record for one family without touching any document
    pub async fn prepare(&self, family: &str, used: &BTreeSet<char>) -> EmbeddedFont {
        let outcome = match self.embed_font(family, used).await {
            Ok(data_uri) => {
                info!(family, bytes = data_uri.len(), "embedded font");
                FontOutcome::Embedded { data_uri }
            }
            Err(reason) => {
                warn!(family, %reason, "font not embedded, using local fallback");
                FontOutcome::Fallback {
                    reason,
                    local_fallback: self.config.local_fallback_family.clone(),
                }
            }
        };
        EmbeddedFont {
            family: family.to_string(),
            outcome,
        }
    }

    /// Prepare a family and insert its rule as the document's first style
    pub async fn embed<D: VectorDocument>(
        &self,
        document: &mut D,
        family: &str,
        used: &BTreeSet<char>,
    ) -> EmbeddedFont {
        let font = self.prepare(family, used).await;
        document.insert_style_first(&font.to_css());
        font
    }

    async fn embed_font(&self, family: &str, used: &BTreeSet<char>) -> Result<String, FallbackReason> {
        let url = self.config.font_url(family)?;
        debug!(family, %url, "fetching font");

        let bytes = self
            .source
            .fetch(&url)
            .await
            .map_err(|source| FallbackReason::Fetch {
                url: url.to_string(),
                source,
            })?;

        let sfnt = self.codec.decode(&bytes).map_err(FallbackReason::Decode)?;

        let codepoints = codepoints_for(used, self.config.codepoint_policy());
        let subset = match self.subsetter.subset(&sfnt, &codepoints) {
            Ok(subset) => {
                debug!(family, before = sfnt.len(), after = subset.len(), "subset font");
                subset
            }
            Err(e) => {
                warn!(family, error = %e, "subsetting failed, embedding the full font");
                sfnt
            }
        };

        let woff2 = self.codec.encode(&subset).map_err(FallbackReason::Encode)?;
        Ok(css::woff2_data_uri(&woff2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenefont_font::fixtures::FixtureFont;
    use scenefont_font::{SubsetError, Woff2Codec};
    use scenefont_net::MemoryFontSource;
    use scenefont_svg::SvgDocument;

    const URL: &str = "http://localhost/Virgil.woff2";

    fn chars(text: &str) -> BTreeSet<char> {
        text.chars().collect()
    }

    fn served_font() -> Vec<u8> {
        let sfnt = FixtureFont::with_chars("Hi").build();
        Woff2Codec::new().encode(&sfnt).unwrap()
    }

    struct FailingSubsetter;

    impl Subsetter for FailingSubsetter {
        fn subset(&self, _: &[u8], _: &BTreeSet<char>) -> Result<Vec<u8>, SubsetError> {
            Err(SubsetError::UnsupportedOutlines)
        }
    }

    struct FailingEncoder;

    impl FontCodec for FailingEncoder {
        fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
            Woff2Codec::new().decode(data)
        }

        fn encode(&self, _: &[u8]) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::EmptyOutput)
        }
    }

    #[test]
    fn test_prepare_embeds() {
        let source = MemoryFontSource::new().with_font(URL, served_font());
        let embedder = FontEmbedder::new(source, EmbedConfig::default());

        let font = smol::block_on(embedder.prepare("Virgil", &chars("Hi")));
        assert!(font.is_embedded());
        assert!(font.data_uri().unwrap().starts_with("data:font/woff2;base64,"));
        assert!(font.to_css().contains("format(\"woff2\")"));
        assert_eq!(embedder.source().requests().len(), 1);
    }

    #[test]
    fn test_missing_font_falls_back() {
        let embedder = FontEmbedder::new(MemoryFontSource::new(), EmbedConfig::default());

        let font = smol::block_on(embedder.prepare("Virgil", &chars("Hi")));
        assert!(!font.is_embedded());
        match font.fallback_reason() {
            Some(FallbackReason::Fetch { url, source }) => {
                assert_eq!(url, URL);
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("unexpected reason: {other:?}"),
        }
        assert!(font.to_css().contains("local(\"Virgil\"), local(\"Arial\")"));
    }

    #[test]
    fn test_bad_base_url_falls_back() {
        let config = EmbedConfig::default().with_font_base_url("::");
        let embedder = FontEmbedder::new(MemoryFontSource::new(), config);

        let font = smol::block_on(embedder.prepare("Virgil", &chars("a")));
        assert!(matches!(font.fallback_reason(), Some(FallbackReason::Url(_))));
        assert!(embedder.source().requests().is_empty());
    }

    #[test]
    fn test_undecodable_font_falls_back() {
        let source = MemoryFontSource::new().with_font(URL, b"not a font".to_vec());
        let embedder = FontEmbedder::new(source, EmbedConfig::default());

        let font = smol::block_on(embedder.prepare("Virgil", &chars("a")));
        assert!(matches!(font.fallback_reason(), Some(FallbackReason::Decode(_))));
    }

    #[test]
    fn test_subset_failure_embeds_full_font() {
        let source = MemoryFontSource::new().with_font(URL, served_font());
        let embedder =
            FontEmbedder::new(source, EmbedConfig::default()).with_subsetter(FailingSubsetter);

        let font = smol::block_on(embedder.prepare("Virgil", &chars("H")));
        assert!(font.is_embedded());
    }

    #[test]
    fn test_encode_failure_falls_back() {
        let source = MemoryFontSource::new().with_font(URL, served_font());
        let embedder =
            FontEmbedder::new(source, EmbedConfig::default()).with_codec(FailingEncoder);

        let font = smol::block_on(embedder.prepare("Virgil", &chars("H")));
        assert!(matches!(font.fallback_reason(), Some(FallbackReason::Encode(_))));
    }

    #[test]
    fn test_embed_inserts_one_style() {
        let embedder = FontEmbedder::new(MemoryFontSource::new(), EmbedConfig::default());
        let mut doc = SvgDocument::new();

        smol::block_on(embedder.embed(&mut doc, "Virgil", &chars("a")));
        let styles = doc.style_sheets();
        assert_eq!(styles.len(), 1);
        assert!(styles[0].contains("local(\"Virgil\")"));
    }
}
