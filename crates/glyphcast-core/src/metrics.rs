use crate::segment::{Segment, Sequence};
use std::fmt;
use std::sync::Arc;
use unicode_width::UnicodeWidthStr;

/// Width measurement for one rendering surface.
///
/// The layout core never measures pixels itself; it asks a provider. The interactive preview and
/// the offline renderer each bring their own provider, and a [`crate::LayoutResult`] is only
/// meaningful against the provider that produced it.
///
/// Emoji advance exactly `font_size` on every surface regardless of the image aspect ratio, so
/// the two surfaces agree on where emoji sit.
pub trait MetricsProvider: Send + Sync {
    fn measure(&self, text: &str, font_size: f64) -> f64;

    fn emoji_advance(&self, font_size: f64) -> f64 {
        font_size
    }

    fn font_family(&self) -> &str;

    fn segment_width(&self, segment: &Segment, font_size: f64) -> f64 {
        match segment {
            Segment::Text(text) => self.measure(text, font_size),
            Segment::Emoji(_) => self.emoji_advance(font_size),
        }
    }

    fn sequence_width(&self, sequence: &Sequence, font_size: f64) -> f64 {
        sequence
            .iter()
            .map(|segment| self.segment_width(segment, font_size))
            .sum()
    }
}

/// Font-free provider: every terminal column advances `font_size * char_width_factor`.
#[derive(Debug, Clone)]
pub struct DeterministicMetrics {
    pub char_width_factor: f64,
    pub font_family: String,
}

impl Default for DeterministicMetrics {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
            font_family: "monospace".to_string(),
        }
    }
}

impl MetricsProvider for DeterministicMetrics {
    fn measure(&self, text: &str, font_size: f64) -> f64 {
        let factor = if self.char_width_factor > 0.0 {
            self.char_width_factor
        } else {
            0.6
        };
        text.width() as f64 * font_size.max(0.0) * factor
    }

    fn font_family(&self) -> &str {
        &self.font_family
    }
}

type MeasureFn = dyn Fn(&str, f64) -> f64 + Send + Sync;

/// Provider backed by the host surface's own text measurement (e.g. a canvas `measureText`
/// bridge in the preview UI).
#[derive(Clone)]
pub struct SurfaceMetrics {
    font_family: String,
    measure: Arc<MeasureFn>,
}

impl SurfaceMetrics {
    pub fn new(
        font_family: impl Into<String>,
        measure: impl Fn(&str, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            font_family: font_family.into(),
            measure: Arc::new(measure),
        }
    }
}

impl fmt::Debug for SurfaceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceMetrics")
            .field("font_family", &self.font_family)
            .finish_non_exhaustive()
    }
}

impl MetricsProvider for SurfaceMetrics {
    fn measure(&self, text: &str, font_size: f64) -> f64 {
        let w = (self.measure)(text, font_size);
        if w.is_finite() && w > 0.0 { w } else { 0.0 }
    }

    fn font_family(&self) -> &str {
        &self.font_family
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentParser;

    #[test]
    fn deterministic_metrics_scale_with_columns() {
        let m = DeterministicMetrics::default();
        assert_eq!(m.measure("abcd", 10.0), 24.0);
        assert_eq!(m.measure("", 10.0), 0.0);
        // CJK characters take two columns.
        assert_eq!(m.measure("日本", 10.0), 24.0);
    }

    #[test]
    fn sequence_width_uses_emoji_advance_for_emoji() {
        let m = DeterministicMetrics::default();
        let seq = SegmentParser::without_assets().parse("ab😂");
        assert_eq!(m.sequence_width(&seq, 20.0), 2.0 * 12.0 + 20.0);
    }

    #[test]
    fn surface_metrics_delegate_and_sanitize() {
        let m = SurfaceMetrics::new("Inter", |text: &str, size: f64| {
            if text == "nan" {
                f64::NAN
            } else {
                text.chars().count() as f64 * size * 0.5
            }
        });
        assert_eq!(m.font_family(), "Inter");
        assert_eq!(m.measure("abc", 10.0), 15.0);
        assert_eq!(m.measure("nan", 10.0), 0.0);
        assert_eq!(m.emoji_advance(33.0), 33.0);
    }
}
