#![forbid(unsafe_code)]

//! Emoji-aware caption layout (headless, pure).
//!
//! The pipeline is `SegmentParser -> wrap_sequence <-> fit_sequence`, parameterized by a
//! [`MetricsProvider`]. The same code runs for the interactive preview and for the offline
//! renderer; only the provider differs, which is what keeps the two in lock-step.

pub mod config;
pub mod error;
pub mod fit;
pub mod metrics;
pub mod segment;
pub mod wrap;

pub use config::CaptionConfig;
pub use error::{EncodingError, LayoutError, Result};
pub use fit::{BoxSize, DEFAULT_ELLIPSIS, FitOptions, LayoutResult, fit_sequence, fit_text};
pub use metrics::{DeterministicMetrics, MetricsProvider, SurfaceMetrics};
pub use segment::{
    DEFAULT_EMOJI_ASSET_BASE, Emoji, Segment, SegmentKind, SegmentParser, Sequence,
    strip_hashtags,
};
pub use wrap::{WIDTH_EPSILON, wrap_sequence};

/// Parses raw caption bytes and fits them into `bx`.
///
/// The only failure for well-formed options is malformed UTF-8 in `bytes`.
pub fn layout_caption_bytes(
    parser: &SegmentParser,
    bytes: &[u8],
    bx: BoxSize,
    options: &FitOptions,
    metrics: &dyn MetricsProvider,
) -> Result<LayoutResult> {
    let seq = parser.parse_bytes(bytes)?;
    fit_sequence(&seq, bx, options, metrics)
}
