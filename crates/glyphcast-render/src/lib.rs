#![forbid(unsafe_code)]

//! Offline rendering for glyphcast layouts.
//!
//! [`FontFace`] and [`FontMetrics`] provide the offline measurement backend, [`EmojiAssetCache`]
//! resolves emoji images once per URL, and [`Compositor`] paints a
//! [`glyphcast_core::LayoutResult`] onto a `tiny_skia::Pixmap` and encodes it.

pub mod cache;
pub mod color;
pub mod compose;
pub mod decode;
pub mod error;
pub mod font;
pub mod ribbon;
pub mod source;

pub use cache::{
    CacheEntry, CacheOptions, DEFAULT_CACHE_CAPACITY, DEFAULT_RASTER_SIZE, EmojiAssetCache,
    EmojiImage, EntryState,
};
pub use color::parse_color;
pub use compose::{
    Align, Background, Compositor, ExportFormat, PaintOptions, PaintReport, RenderOptions,
    Rendered, Scrim, TextBox, VerticalAlign, encode,
};
pub use error::{AssetError, DecodeError, FetchError, FontError, RenderError, Result, StoreError};
pub use font::{FontFace, FontMetrics, VerticalMetrics};
pub use ribbon::{
    PublishError, RIBBON_CANVAS, RibbonColor, RibbonCorner, RibbonSpec, RibbonStore,
    publish_ribbon, render_ribbon,
};
#[cfg(feature = "http")]
pub use source::HttpAssetSource;
pub use source::{AssetSource, RetryingSource, StaticAssetSource, normalize_asset_url};

/// Re-exported so callers can build surfaces and colors without naming the crate themselves.
pub use tiny_skia;
