//! scenefont Font - Font binary codec and subsetter
//!
//! Works on raw font buffers:
//! - WOFF2 decode/encode (table directory, glyf/loca and hmtx transforms,
//!   Brotli stream compression)
//! - Glyph subsetting that keeps glyph ids stable
//! - Codepoint policy for the characters every subset carries

pub mod reader;
pub mod sfnt;
mod glyf;
mod cmap;
mod transform;
pub mod woff2;
pub mod subset;
pub mod codepoints;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

use std::collections::BTreeSet;

pub use codepoints::{codepoints_for, CodepointPolicy};
pub use reader::ReadError;
pub use sfnt::{Sfnt, SfntBuilder, SfntError, Tag};
pub use subset::{GlyfSubsetter, SubsetPlan};
pub use woff2::{is_woff2, Woff2Codec};

/// Converts between the wire format of a font and the sfnt working buffer
pub trait FontCodec: Send + Sync {
    /// Wire format to sfnt
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// sfnt to wire format
    fn encode(&self, sfnt: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Reduces an sfnt to the glyphs needed for a set of codepoints
pub trait Subsetter: Send + Sync {
    fn subset(&self, font: &[u8], codepoints: &BTreeSet<char>) -> Result<Vec<u8>, SubsetError>;
}

/// Codec error types
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid WOFF2 signature")]
    InvalidSignature,

    #[error("Font collections are not supported")]
    Collection,

    #[error("Invalid table directory: {0}")]
    InvalidTableDirectory(String),

    #[error("Missing required table '{0}'")]
    MissingTable(&'static str),

    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Brotli stream error: {0}")]
    Brotli(#[from] std::io::Error),

    #[error("Truncated data: {0}")]
    Read(#[from] ReadError),

    #[error("Malformed sfnt: {0}")]
    Sfnt(#[from] SfntError),

    #[error("Codec produced no data")]
    EmptyOutput,
}

/// Subsetter error types
#[derive(Debug, thiserror::Error)]
pub enum SubsetError {
    #[error("Font parse error: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),

    #[error("Only TrueType outlines can be subset")]
    UnsupportedOutlines,

    #[error("Missing required table '{0}'")]
    MissingTable(&'static str),

    #[error("Invalid glyph {0}")]
    InvalidGlyph(u16),

    #[error("Glyph data exceeds the loca range")]
    LocaOverflow,

    #[error("Truncated data: {0}")]
    Read(#[from] ReadError),

    #[error("Malformed sfnt: {0}")]
    Sfnt(#[from] SfntError),
}
