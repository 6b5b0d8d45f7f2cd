//! scenefont SVG - Vector document tree
//!
//! Arena-based SVG tree used as the mutation target of the font pipeline:
//! - Parsing from text (roxmltree) and serialization back to text
//! - Style-node insertion ahead of all other content
//! - Text-node enumeration and attribute access

mod node;
mod tree;
mod document;
mod serialize;

pub use node::{Attribute, ElementData, Node, NodeData};
pub use tree::{Children, Descendants, SvgTree};
pub use document::SvgDocument;

/// SVG namespace
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node
    pub const ROOT: NodeId = NodeId(0);
    /// Absent link
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The operations the font pipeline performs on a rendered vector document.
///
/// Mutation is limited to prepending style nodes and writing attributes on
/// text nodes; nothing is ever removed.
pub trait VectorDocument {
    /// Insert a `<style>` node containing `css` as the first child of the
    /// root element
    fn insert_style_first(&mut self, css: &str) -> NodeId;

    /// Text-bearing leaf elements, in document order
    fn text_nodes(&self) -> Vec<NodeId>;

    /// Read an attribute of an element node
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Write an attribute of an element node
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
}

/// SVG document error types
#[derive(Debug, thiserror::Error)]
pub enum SvgError {
    #[error("Failed to parse SVG: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Root element is <{0}>, expected <svg>")]
    NotSvg(String),
}

pub type Result<T> = std::result::Result<T, SvgError>;
