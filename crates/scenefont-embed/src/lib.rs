//! scenefont Embed
//!
//! Makes an exported SVG independent of hosted fonts:
//!
//! 1. collect the characters each font family renders in the scene
//! 2. fetch and decode every family's WOFF2
//! 3. subset it to those characters plus a safety set
//! 4. re-encode, inline as a base64 `@font-face`, or fall back to local fonts
//! 5. point every `<text>` node at its family chain
//!
//! # Example
//! ```rust,ignore
//! use scenefont_embed::{EmbedConfig, Pipeline};
//! use scenefont_net::{NetFontSource, NetOptions};
//!
//! let config = EmbedConfig::default().with_font_base_url("https://cdn.example.com/fonts/");
//! let source = NetFontSource::new(config.net_options())?;
//! let pipeline = Pipeline::new(source, config);
//! let svg = smol::block_on(pipeline.embed_svg(&svg_text, &scene.elements))?;
//! ```

mod config;
mod css;
mod embedder;
mod pipeline;

pub use config::{ConfigError, EmbedConfig, FontUrlError};
pub use embedder::{EmbeddedFont, FallbackReason, FontEmbedder, FontOutcome};
pub use pipeline::{Pipeline, PipelineReport};

// Re-export sub-crates for hosts that drive the stages themselves
pub use scenefont_font as font;
pub use scenefont_net as net;
pub use scenefont_scene as scene;
pub use scenefont_svg as svg;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pipeline error
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("SVG error: {0}")]
    Svg(#[from] scenefont_svg::SvgError),

    #[error("Scene error: {0}")]
    Scene(#[from] scenefont_scene::SceneError),
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
/// Later calls do nothing.
pub fn init_tracing() {
    use tracing_subscriber::prelude::*;

    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .ok();
    });
}
