//! scenefont Scene
//!
//! The slice of the drawing model the font pipeline needs:
//! - Drawing elements as they come out of a serialized scene
//! - The font family registry (numeric id <-> family name)
//! - Collection of the characters each family has to render

mod element;
mod registry;
mod collector;

pub use element::{Element, FontFamilyRef, Scene, text_elements};
pub use registry::{FontFamilyRegistry, DEFAULT_FAMILY};
pub use collector::{collect_used_characters, UsedCharacters};

/// Scene model error types
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("Invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Font family id {id} is already registered as {existing:?}, cannot register {requested:?}")]
    ConflictingFamily {
        id: u32,
        existing: String,
        requested: String,
    },

    #[error("Font family {name:?} is already registered with id {existing}, cannot register id {requested}")]
    ConflictingId {
        name: String,
        existing: u32,
        requested: u32,
    },
}

pub type Result<T> = std::result::Result<T, SceneError>;
