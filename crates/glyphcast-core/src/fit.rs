//! Font-size search that fits a wrapped caption into a fixed box.

use crate::config::CaptionConfig;
use crate::error::{LayoutError, Result};
use crate::metrics::MetricsProvider;
use crate::segment::{SegmentParser, Sequence};
use crate::wrap::{WIDTH_EPSILON, wrap_sequence};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ELLIPSIS: &str = "\u{2026}";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitOptions {
    pub min_size: f64,
    pub max_size: f64,
    /// Decrement between candidate sizes.
    pub step: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
    pub ellipsis: String,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            min_size: 12.0,
            max_size: 60.0,
            step: 2.0,
            line_height: 1.2,
            ellipsis: DEFAULT_ELLIPSIS.to_string(),
        }
    }
}

impl FitOptions {
    pub fn from_config(config: &CaptionConfig) -> Self {
        let d = Self::default();
        Self {
            min_size: config.get_f64("font.minSize").unwrap_or(d.min_size),
            max_size: config.get_f64("font.maxSize").unwrap_or(d.max_size),
            step: config.get_f64("font.step").unwrap_or(d.step),
            line_height: config.get_f64("font.lineHeight").unwrap_or(d.line_height),
            ellipsis: config
                .get_str("text.ellipsis")
                .map(str::to_string)
                .unwrap_or(d.ellipsis),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(LayoutError::InvalidOptions { message });
        if !(self.min_size.is_finite() && self.min_size > 0.0) {
            return invalid(format!("min_size must be positive, got {}", self.min_size));
        }
        if !(self.max_size.is_finite() && self.max_size >= self.min_size) {
            return invalid(format!(
                "max_size must be >= min_size ({}), got {}",
                self.min_size, self.max_size
            ));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return invalid(format!("step must be positive, got {}", self.step));
        }
        if !(self.line_height.is_finite() && self.line_height > 0.0) {
            return invalid(format!(
                "line_height must be positive, got {}",
                self.line_height
            ));
        }
        Ok(())
    }

    /// Candidate sizes, largest first. `min_size` is always the last candidate.
    pub fn candidate_sizes(&self) -> Vec<f64> {
        let mut sizes = Vec::new();
        let mut i = 0u32;
        loop {
            let size = self.max_size - f64::from(i) * self.step;
            if size <= self.min_size + WIDTH_EPSILON {
                break;
            }
            sizes.push(size);
            i += 1;
        }
        sizes.push(self.min_size);
        sizes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub font_size: f64,
    /// Line advance in pixels (`font_size * line_height`).
    pub line_height: f64,
    pub lines: Vec<Sequence>,
    pub truncated: bool,
}

impl LayoutResult {
    pub fn block_height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }

    pub fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(Sequence::text).collect()
    }

    pub fn max_line_width(&self, metrics: &dyn MetricsProvider) -> f64 {
        self.lines
            .iter()
            .map(|line| metrics.sequence_width(line, self.font_size))
            .fold(0.0, f64::max)
    }
}

/// Picks the largest candidate size whose wrapped lines fit the box height; truncates with an
/// ellipsis at `min_size` when none does.
pub fn fit_sequence(
    seq: &Sequence,
    bx: BoxSize,
    options: &FitOptions,
    metrics: &dyn MetricsProvider,
) -> Result<LayoutResult> {
    options.validate()?;
    if !(bx.width.is_finite() && bx.width >= 0.0 && bx.height.is_finite() && bx.height >= 0.0) {
        return Err(LayoutError::InvalidOptions {
            message: format!("box must be finite and non-negative, got {bx:?}"),
        });
    }

    for size in options.candidate_sizes() {
        let line_px = size * options.line_height;
        let lines = wrap_sequence(seq, bx.width, size, metrics);
        if lines.len() as f64 * line_px <= bx.height + WIDTH_EPSILON {
            tracing::debug!(font_size = size, lines = lines.len(), "caption fits");
            return Ok(LayoutResult {
                font_size: size,
                line_height: line_px,
                lines,
                truncated: false,
            });
        }
    }

    let size = options.min_size;
    let line_px = size * options.line_height;
    let max_lines = ((bx.height + WIDTH_EPSILON) / line_px).floor() as usize;
    let mut lines = wrap_sequence(seq, bx.width, size, metrics);
    tracing::debug!(
        font_size = size,
        wrapped = lines.len(),
        kept = max_lines,
        "caption does not fit; truncating"
    );
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        append_ellipsis(last, &options.ellipsis, bx.width, size, metrics);
    }
    Ok(LayoutResult {
        font_size: size,
        line_height: line_px,
        lines,
        truncated: true,
    })
}

pub fn fit_text(
    parser: &SegmentParser,
    text: &str,
    bx: BoxSize,
    options: &FitOptions,
    metrics: &dyn MetricsProvider,
) -> Result<LayoutResult> {
    fit_sequence(&parser.parse(text), bx, options, metrics)
}

/// Rewrites `line` to end with `ellipsis`, dropping trailing clusters until it fits.
///
/// An ellipsis wider than `max_width` is still kept once the line is empty: like any other
/// single unit wider than the box, it is the only thing on its line and overflows.
fn append_ellipsis(
    line: &mut Sequence,
    ellipsis: &str,
    max_width: f64,
    font_size: f64,
    metrics: &dyn MetricsProvider,
) {
    line.trim_end();
    loop {
        let mut candidate = line.clone();
        candidate.push_str(ellipsis);
        if line.is_empty()
            || metrics.sequence_width(&candidate, font_size) <= max_width + WIDTH_EPSILON
        {
            *line = candidate;
            return;
        }
        line.pop_cluster();
        line.trim_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DeterministicMetrics;
    use serde_json::json;

    #[test]
    fn candidate_sizes_step_down_and_end_at_min() {
        let opts = FitOptions {
            min_size: 12.0,
            max_size: 19.0,
            step: 3.0,
            ..FitOptions::default()
        };
        assert_eq!(opts.candidate_sizes(), vec![19.0, 16.0, 13.0, 12.0]);

        let flat = FitOptions {
            min_size: 20.0,
            max_size: 20.0,
            ..FitOptions::default()
        };
        assert_eq!(flat.candidate_sizes(), vec![20.0]);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let metrics = DeterministicMetrics::default();
        let seq = SegmentParser::default().parse("hi");
        for opts in [
            FitOptions {
                min_size: 0.0,
                ..FitOptions::default()
            },
            FitOptions {
                max_size: 6.0,
                ..FitOptions::default()
            },
            FitOptions {
                step: 0.0,
                ..FitOptions::default()
            },
            FitOptions {
                line_height: f64::NAN,
                ..FitOptions::default()
            },
        ] {
            let err = fit_sequence(&seq, BoxSize::new(100.0, 100.0), &opts, &metrics);
            assert!(matches!(err, Err(LayoutError::InvalidOptions { .. })));
        }
        let err = fit_sequence(
            &seq,
            BoxSize::new(-1.0, 10.0),
            &FitOptions::default(),
            &metrics,
        );
        assert!(matches!(err, Err(LayoutError::InvalidOptions { .. })));
    }

    #[test]
    fn short_caption_uses_max_size() {
        let metrics = DeterministicMetrics::default();
        let out = fit_text(
            &SegmentParser::default(),
            "Hi 👋",
            BoxSize::new(1000.0, 500.0),
            &FitOptions::default(),
            &metrics,
        )
        .unwrap();
        assert_eq!(out.font_size, 60.0);
        assert_eq!(out.line_height, 72.0);
        assert!(!out.truncated);
        assert_eq!(out.line_texts(), vec!["Hi 👋"]);
    }

    #[test]
    fn empty_caption_fits_at_max_size_with_no_lines() {
        let out = fit_text(
            &SegmentParser::default(),
            "",
            BoxSize::new(100.0, 10.0),
            &FitOptions::default(),
            &DeterministicMetrics::default(),
        )
        .unwrap();
        assert_eq!(out.font_size, 60.0);
        assert!(out.lines.is_empty());
        assert!(!out.truncated);
    }

    #[test]
    fn ellipsis_drops_clusters_until_line_fits() {
        let metrics = DeterministicMetrics::default();
        // 6px per column at size 10; "…" is one column.
        let mut line = SegmentParser::default().parse("abcdef 😂");
        append_ellipsis(&mut line, "\u{2026}", 48.0, 10.0, &metrics);
        assert_eq!(line.text(), "abcdef\u{2026}");
        assert!(metrics.sequence_width(&line, 10.0) <= 48.0);

        let mut line = SegmentParser::default().parse("abc");
        append_ellipsis(&mut line, "\u{2026}", 100.0, 10.0, &metrics);
        assert_eq!(line.text(), "abc\u{2026}");
    }

    #[test]
    fn ellipsis_wider_than_the_box_stands_alone() {
        let metrics = DeterministicMetrics::default();
        // At size 12 the ellipsis alone is 7.2px wide, wider than the 5px box.
        let out = fit_text(
            &SegmentParser::default(),
            "abc def",
            BoxSize::new(5.0, 15.0),
            &FitOptions::default(),
            &metrics,
        )
        .unwrap();
        assert!(out.truncated);
        assert_eq!(out.font_size, 12.0);
        assert_eq!(out.line_texts(), vec!["\u{2026}"]);
        assert!(metrics.sequence_width(&out.lines[0], 12.0) > 5.0);
    }

    #[test]
    fn options_read_from_config_with_fallbacks() {
        let cfg = CaptionConfig::from_value(json!({
            "font": { "maxSize": 48, "step": "big" },
            "text": { "ellipsis": "..." }
        }));
        let opts = FitOptions::from_config(&cfg);
        assert_eq!(opts.max_size, 48.0);
        assert_eq!(opts.step, 2.0);
        assert_eq!(opts.min_size, 12.0);
        assert_eq!(opts.ellipsis, "...");
    }
}
