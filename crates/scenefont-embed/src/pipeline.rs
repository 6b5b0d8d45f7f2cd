//! Pipeline Driver
//!
//! Collects used characters, prepares every family concurrently, then
//! mutates the document: style nodes first, text-node attributes after all
//! families have settled.

use futures::future::join_all;
use scenefont_font::{FontCodec, Subsetter};
use scenefont_net::FontSource;
use scenefont_scene::{
    collect_used_characters, text_elements, Element, FontFamilyRef, FontFamilyRegistry, Scene,
};
use scenefont_svg::{SvgDocument, VectorDocument};
use tracing::{debug, info};

use crate::config::EmbedConfig;
use crate::embedder::{EmbeddedFont, FontEmbedder};
use crate::EmbedError;

/// Attribute carrying the element's raw family id
const FAMILY_NUMBER_ATTR: &str = "font-family-number";

/// What a pipeline run did
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// One record per family, sorted by family name
    pub fonts: Vec<EmbeddedFont>,
    /// Text nodes whose family attributes were rewritten
    pub text_nodes: usize,
}

impl PipelineReport {
    pub fn embedded_count(&self) -> usize {
        self.fonts.iter().filter(|f| f.is_embedded()).count()
    }

    pub fn fallback_count(&self) -> usize {
        self.fonts.len() - self.embedded_count()
    }

    /// Record for a family
    pub fn font(&self, family: &str) -> Option<&EmbeddedFont> {
        self.fonts.iter().find(|f| f.family == family)
    }
}

/// Font embedding for whole scenes
pub struct Pipeline<S> {
    embedder: FontEmbedder<S>,
    registry: FontFamilyRegistry,
}

impl<S: FontSource> Pipeline<S> {
    pub fn new(source: S, config: EmbedConfig) -> Self {
        let registry = config.registry();
        Self {
            embedder: FontEmbedder::new(source, config),
            registry,
        }
    }

    /// Replace the family registry
    pub fn with_registry(mut self, registry: FontFamilyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_codec(mut self, codec: impl FontCodec + 'static) -> Self {
        self.embedder = self.embedder.with_codec(codec);
        self
    }

    pub fn with_subsetter(mut self, subsetter: impl Subsetter + 'static) -> Self {
        self.embedder = self.embedder.with_subsetter(subsetter);
        self
    }

    pub fn embedder(&self) -> &FontEmbedder<S> {
        &self.embedder
    }

    pub fn registry(&self) -> &FontFamilyRegistry {
        &self.registry
    }

    /// Embed the fonts `elements` use into `document`
    pub async fn run<D: VectorDocument>(&self, document: &mut D, elements: &[Element]) -> PipelineReport {
        // Without text elements the rewrite pass has nothing to assign
        if text_elements(elements).next().is_none() {
            debug!("no text elements, nothing to embed");
            return PipelineReport::default();
        }

        let used = collect_used_characters(elements, &self.registry);

        let fonts = join_all(used.iter().map(|(family, chars)| self.embedder.prepare(family, chars))).await;

        // Each insert lands first, so walk backwards to keep family order
        for font in fonts.iter().rev() {
            document.insert_style_first(&font.to_css());
        }

        let text_nodes = self.rewrite_text_nodes(document, elements);

        let report = PipelineReport { fonts, text_nodes };
        info!(
            families = report.fonts.len(),
            embedded = report.embedded_count(),
            fallback = report.fallback_count(),
            text_nodes,
            "embedded scene fonts"
        );
        report
    }

    /// Parse SVG text, embed, and serialize
    pub async fn embed_svg(&self, svg: &str, elements: &[Element]) -> Result<String, EmbedError> {
        let mut document = SvgDocument::parse(svg)?;
        self.run(&mut document, elements).await;
        Ok(document.to_svg_string())
    }

    /// [`embed_svg`](Self::embed_svg) with elements taken from scene JSON
    pub async fn embed_scene_json(&self, svg: &str, scene_json: &str) -> Result<String, EmbedError> {
        let scene = Scene::from_json(scene_json)?;
        self.embed_svg(svg, &scene.elements).await
    }

    /// Family chain for an element's family reference
    pub fn family_chain(&self, family: Option<&FontFamilyRef>) -> String {
        let default = self.registry.default_family();
        let mut chain: Vec<&str> = Vec::new();
        if let Some(name) = self.registry.resolve(family) {
            chain.push(name);
        }
        for extra in &self.embedder.config().fallback_families {
            if !chain.contains(&extra.as_str()) && extra != default {
                chain.push(extra);
            }
        }
        if !chain.contains(&default) {
            chain.push(default);
        }
        chain.join(", ")
    }

    /// Numeric id written next to the chain, empty when there is none
    fn family_number(&self, family: Option<&FontFamilyRef>) -> String {
        let id = match family {
            Some(FontFamilyRef::Id(id)) => Some(*id),
            Some(FontFamilyRef::Name(name)) => self.registry.id(name),
            Some(FontFamilyRef::Other(_)) | None => None,
        };
        id.map(|id| id.to_string()).unwrap_or_default()
    }

    /// The i-th text node takes the i-th text element's chain
    fn rewrite_text_nodes<D: VectorDocument>(&self, document: &mut D, elements: &[Element]) -> usize {
        let nodes = document.text_nodes();
        let mut families = text_elements(elements).map(|el| el.font_family.as_ref());

        for &node in &nodes {
            let family = families.next().flatten();
            document.set_attribute(node, "font-family", &self.family_chain(family));
            document.set_attribute(node, FAMILY_NUMBER_ATTR, &self.family_number(family));
        }
        nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenefont_net::MemoryFontSource;

    fn pipeline(config: EmbedConfig) -> Pipeline<MemoryFontSource> {
        Pipeline::new(MemoryFontSource::new(), config)
    }

    #[test]
    fn test_family_chain() {
        let p = pipeline(EmbedConfig::default());
        assert_eq!(p.family_chain(Some(&1.into())), "Virgil, Segoe UI Emoji");
        assert_eq!(p.family_chain(Some(&"Nunito".into())), "Nunito, Segoe UI Emoji");
        assert_eq!(p.family_chain(Some(&42.into())), "Segoe UI Emoji");
        assert_eq!(p.family_chain(None), "Segoe UI Emoji");
    }

    #[test]
    fn test_family_chain_with_fallbacks() {
        let p = pipeline(EmbedConfig::default().with_fallback_family("ChineseFont"));
        assert_eq!(p.family_chain(Some(&1.into())), "Virgil, ChineseFont, Segoe UI Emoji");
        assert_eq!(p.family_chain(Some(&4.into())), "ChineseFont, Segoe UI Emoji");
        assert_eq!(p.family_chain(None), "ChineseFont, Segoe UI Emoji");
    }

    #[test]
    fn test_other_family_value_has_no_number() {
        let p = pipeline(EmbedConfig::default());
        let family = FontFamilyRef::Other(serde_json::json!(true));
        assert_eq!(p.family_chain(Some(&family)), "Segoe UI Emoji");
        assert_eq!(p.family_number(Some(&family)), "");
    }

    #[test]
    fn test_report_counts() {
        let report = PipelineReport::default();
        assert_eq!(report.embedded_count(), 0);
        assert_eq!(report.fallback_count(), 0);
        assert!(report.font("Virgil").is_none());
    }

    #[test]
    fn test_no_text_leaves_document_alone() {
        let p = pipeline(EmbedConfig::default());
        let mut doc = SvgDocument::new();
        let before = doc.to_svg_string();

        let report = smol::block_on(p.run(&mut doc, &[Element::shape("rectangle")]));
        assert!(report.fonts.is_empty());
        assert_eq!(doc.to_svg_string(), before);
        assert!(p.embedder().source().requests().is_empty());
    }
}
