#![forbid(unsafe_code)]

//! `glyphcast` lays out emoji-bearing captions and composites them onto images.
//!
//! The same layout code serves an interactive preview and the offline publisher; only the
//! [`MetricsProvider`] differs. What the user approved in the preview is what gets painted.
//!
//! # Features
//!
//! - `http`: fetch emoji assets with a blocking HTTP client (`render::HttpAssetSource`)

pub use glyphcast_core::*;

/// Offline font stack, emoji asset cache, compositor and ribbon badges.
pub mod render {
    pub use glyphcast_render::*;
}

mod canvas;
mod engine;

pub use canvas::{CanvasFormat, CanvasSpec, PRESET_MARGIN};
pub use engine::CaptionEngine;

/// Failures of the high-level caption API. Shadows the layout-only `glyphcast_core::Result`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Render(#[from] render::RenderError),
    #[error(transparent)]
    Font(#[from] render::FontError),
    #[error(transparent)]
    Fetch(#[from] render::FetchError),
    #[error(transparent)]
    Publish(#[from] render::PublishError),
}

pub type Result<T> = std::result::Result<T, Error>;
