//! Drawing elements
//!
//! Only text elements matter to the font pipeline, but scenes carry every
//! element kind, so the model keeps the `type` tag as a plain string and
//! ignores fields it does not use.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Element kind tag for text-bearing elements
const TEXT_KIND: &str = "text";

/// Reference to a font family as stored on an element.
///
/// Scenes store a numeric id; a symbolic family name is accepted as well and
/// is resolved through the registry's name index. Any other JSON value is
/// kept as-is and never resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontFamilyRef {
    Id(u32),
    Name(String),
    Other(serde_json::Value),
}

impl FontFamilyRef {
    /// Numeric id, if this reference carries one
    pub fn id(&self) -> Option<u32> {
        match self {
            FontFamilyRef::Id(id) => Some(*id),
            FontFamilyRef::Name(_) | FontFamilyRef::Other(_) => None,
        }
    }
}

impl From<u32> for FontFamilyRef {
    fn from(id: u32) -> Self {
        FontFamilyRef::Id(id)
    }
}

impl From<&str> for FontFamilyRef {
    fn from(name: &str) -> Self {
        FontFamilyRef::Name(name.to_string())
    }
}

/// A single drawing element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Element kind (`"text"`, `"rectangle"`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Text content (empty for non-text elements)
    #[serde(default)]
    pub text: String,
    /// Font family reference, absent or null when unset
    #[serde(default)]
    pub font_family: Option<FontFamilyRef>,
    /// Soft-deleted elements stay in the scene but are never rendered
    #[serde(default)]
    pub is_deleted: bool,
}

impl Element {
    /// Create a text element using the given font family
    pub fn text(text: &str, font_family: impl Into<FontFamilyRef>) -> Self {
        Self {
            kind: TEXT_KIND.to_string(),
            text: text.to_string(),
            font_family: Some(font_family.into()),
            is_deleted: false,
        }
    }

    /// Create a text element with no font family set
    pub fn unstyled_text(text: &str) -> Self {
        Self {
            kind: TEXT_KIND.to_string(),
            text: text.to_string(),
            font_family: None,
            is_deleted: false,
        }
    }

    /// Create a non-text element of the given kind
    pub fn shape(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: String::new(),
            font_family: None,
            is_deleted: false,
        }
    }

    /// Mark the element as deleted
    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind == TEXT_KIND
    }
}

/// Non-deleted text elements, in scene order
pub fn text_elements(elements: &[Element]) -> impl Iterator<Item = &Element> {
    elements.iter().filter(|el| !el.is_deleted && el.is_text())
}

/// A decoded scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Scene files are either a full scene object or a bare element array
#[derive(Deserialize)]
#[serde(untagged)]
enum SceneFile {
    Elements(Vec<Element>),
    Scene(Scene),
}

impl Scene {
    /// Decode a scene from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let scene = match serde_json::from_str::<SceneFile>(json)? {
            SceneFile::Scene(scene) => scene,
            SceneFile::Elements(elements) => Scene { elements },
        };
        tracing::debug!(elements = scene.elements.len(), "decoded scene");
        Ok(scene)
    }

    /// Elements that are not soft-deleted
    pub fn non_deleted(&self) -> Vec<Element> {
        self.elements.iter().filter(|el| !el.is_deleted).cloned().collect()
    }

    /// Non-deleted text elements
    pub fn text_elements(&self) -> impl Iterator<Item = &Element> {
        text_elements(&self.elements)
    }
}
