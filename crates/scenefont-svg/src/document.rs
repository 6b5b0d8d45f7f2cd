//! Document - High-level SVG document API

use crate::serialize;
use crate::{NodeId, Result, SvgError, SvgTree, VectorDocument, SVG_NS};

/// Namespace bound to the `xml` prefix
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Parsed, mutable SVG document
#[derive(Debug, Clone)]
pub struct SvgDocument {
    /// The node tree
    tree: SvgTree,
    /// Cached reference to the <svg> element
    root_element: NodeId,
}

impl SvgDocument {
    /// Create an empty `<svg>` document
    pub fn new() -> Self {
        let mut tree = SvgTree::new();
        let svg = tree.create_element("svg");
        if let Some(el) = tree.element_mut(svg) {
            el.set_attr("xmlns", SVG_NS);
        }
        tree.append_child(tree.root(), svg);
        Self {
            tree,
            root_element: svg,
        }
    }

    /// Parse SVG text
    pub fn parse(text: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let source = roxmltree::Document::parse_with_options(text, options)?;

        let source_root = source.root_element();
        if source_root.tag_name().name() != "svg" {
            return Err(SvgError::NotSvg(source_root.tag_name().name().to_string()));
        }

        let mut tree = SvgTree::new();
        let mut root_element = NodeId::NONE;
        for child in source.root().children() {
            let Some(id) = import_node(&mut tree, child) else {
                continue;
            };
            tree.append_child(NodeId::ROOT, id);
            if child == source_root {
                root_element = id;
            }
        }

        tracing::debug!(nodes = tree.len(), "parsed SVG document");
        Ok(Self { tree, root_element })
    }

    /// The `<svg>` element
    pub fn root_element(&self) -> NodeId {
        self.root_element
    }

    /// Access the node tree
    pub fn tree(&self) -> &SvgTree {
        &self.tree
    }

    /// Elements with the given local name, in document order
    pub fn elements_by_local_name(&self, name: &str) -> Vec<NodeId> {
        self.tree
            .descendants(self.root_element)
            .filter(|(_, node)| node.as_element().is_some_and(|el| el.local_name() == name))
            .map(|(id, _)| id)
            .collect()
    }

    /// Text content of every `<style>` element, in document order
    pub fn style_sheets(&self) -> Vec<String> {
        self.elements_by_local_name("style")
            .into_iter()
            .map(|id| self.tree.text_content(id))
            .collect()
    }

    /// Serialize back to SVG text
    pub fn to_svg_string(&self) -> String {
        serialize::to_string(&self.tree)
    }
}

impl Default for SvgDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_svg_string())
    }
}

impl std::str::FromStr for SvgDocument {
    type Err = SvgError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl VectorDocument for SvgDocument {
    fn insert_style_first(&mut self, css: &str) -> NodeId {
        let style = self.tree.create_element("style");
        let text = self.tree.create_text(css);
        self.tree.append_child(style, text);
        self.tree.prepend_child(self.root_element, style);
        style
    }

    fn text_nodes(&self) -> Vec<NodeId> {
        self.elements_by_local_name("text")
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.tree.element(node)?.get_attr(name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.tree.element_mut(node) {
            el.set_attr(name, value);
        }
    }
}

/// Copy a roxmltree node (and its subtree) into the arena
fn import_node(tree: &mut SvgTree, node: roxmltree::Node<'_, '_>) -> Option<NodeId> {
    use roxmltree::NodeType;

    let id = match node.node_type() {
        NodeType::Element => import_element(tree, node),
        NodeType::Text => tree.create_text(node.text().unwrap_or_default()),
        NodeType::Comment => tree.create_comment(node.text().unwrap_or_default()),
        NodeType::PI => {
            let pi = node.pi()?;
            tree.create_processing_instruction(pi.target, pi.value)
        }
        NodeType::Root => return None,
    };
    Some(id)
}

fn import_element(tree: &mut SvgTree, node: roxmltree::Node<'_, '_>) -> NodeId {
    let name = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());
    let id = tree.create_element(&name);

    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    if let Some(el) = tree.element_mut(id) {
        for ns in node.namespaces() {
            if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
                continue;
            }
            match ns.name() {
                Some(prefix) => el.set_attr(&format!("xmlns:{prefix}"), ns.uri()),
                None => el.set_attr("xmlns", ns.uri()),
            }
        }
        for attr in node.attributes() {
            let attr_name = qualified_name(node, attr.namespace(), attr.name());
            el.set_attr(&attr_name, attr.value());
        }
    }

    for child in node.children() {
        if let Some(child_id) = import_node(tree, child) {
            tree.append_child(id, child_id);
        }
    }
    id
}

fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let prefix = match namespace {
        Some(XML_NS) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    };
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORTED: &str = r##"<svg version="1.1" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 50">
  <!-- svg-source:excalidraw -->
  <defs><style class="style-fonts">@font-face { font-family: "Virgil"; src: url("https://example.com/Virgil.woff2"); }</style></defs>
  <rect x="0" y="0" width="100" height="50" fill="#ffffff"/>
  <g transform="translate(10 10)"><text x="0" y="18" font-family="Virgil, Segoe UI Emoji" font-size="20px">Hi</text></g>
  <g transform="translate(10 30)"><text x="0" y="18" font-family="Helvetica, Segoe UI Emoji">A &amp; B</text></g>
</svg>"##;

    #[test]
    fn test_new_document() {
        let doc = SvgDocument::new();
        assert!(doc.root_element().is_valid());
        assert!(doc.text_nodes().is_empty());
        assert_eq!(doc.to_svg_string(), r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
    }

    #[test]
    fn test_parse_text_nodes() {
        let doc = SvgDocument::parse(EXPORTED).unwrap();
        let texts = doc.text_nodes();
        assert_eq!(texts.len(), 2);
        assert_eq!(doc.tree().text_content(texts[0]), "Hi");
        assert_eq!(doc.tree().text_content(texts[1]), "A & B");
        assert_eq!(
            doc.attribute(texts[0], "font-family"),
            Some("Virgil, Segoe UI Emoji")
        );
    }

    #[test]
    fn test_insert_style_first() {
        let mut doc = SvgDocument::parse(EXPORTED).unwrap();
        let style = doc.insert_style_first("@font-face { font-family: \"X\"; }");

        let root = doc.root_element();
        assert_eq!(doc.tree().get(root).unwrap().first_child, style);
        assert_eq!(doc.style_sheets().len(), 2);
        assert!(doc.style_sheets()[0].contains("\"X\""));
    }

    #[test]
    fn test_set_attribute() {
        let mut doc = SvgDocument::parse(EXPORTED).unwrap();
        let first = doc.text_nodes()[0];
        doc.set_attribute(first, "font-family", "Nunito, Segoe UI Emoji");
        assert_eq!(doc.attribute(first, "font-family"), Some("Nunito, Segoe UI Emoji"));
    }

    #[test]
    fn test_rejects_non_svg_root() {
        let err = SvgDocument::parse("<html><body/></html>").unwrap_err();
        assert!(matches!(err, SvgError::NotSvg(name) if name == "html"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(SvgDocument::parse("<svg>"), Err(SvgError::Parse(_))));
    }

    #[test]
    fn test_prefixed_attributes_survive() {
        let src = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a" xml:space="preserve"/></svg>"##;
        let doc = SvgDocument::parse(src).unwrap();
        let out = doc.to_svg_string();
        assert!(out.contains(r##"xlink:href="#a""##));
        assert!(out.contains(r#"xml:space="preserve""#));
        assert!(out.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
    }
}
