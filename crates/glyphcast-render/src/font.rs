//! Font faces for the offline renderer.
//!
//! Widths come from `hmtx` advances and glyphs are painted from their outlines, so a
//! [`FontMetrics`] measurement and a painted run always agree to the pixel. No kerning or shaping
//! is applied.

use crate::error::FontError;
use glyphcast_core::MetricsProvider;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tiny_skia::{Path, PathBuilder};
use ttf_parser::{Face, GlyphId};
use usvg::fontdb;

/// Vertical metrics in pixels for one font size. `descent` is negative (below the baseline).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub cap_height: f64,
}

/// Installed families tried, in order, for the generic keywords.
const SANS_SERIF_FALLBACKS: &[&str] = &[
    "Arial",
    "Helvetica",
    "Helvetica Neue",
    "Verdana",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "FreeSans",
    "Roboto",
];
const SERIF_FALLBACKS: &[&str] = &[
    "Times New Roman",
    "Times",
    "Georgia",
    "DejaVu Serif",
    "Liberation Serif",
    "Noto Serif",
    "FreeSerif",
];
const MONOSPACE_FALLBACKS: &[&str] = &[
    "Courier New",
    "Courier",
    "Consolas",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "FreeMono",
];

/// A parsed font face plus the raw bytes it borrows from.
///
/// Horizontal advances for every mapped character are read once at load time, so measuring
/// inside the wrap and fit loops never re-parses the font.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    index: u32,
    family: String,
    units_per_em: f64,
    ascender: f64,
    descender: f64,
    cap_height: f64,
    advances: Arc<HashMap<char, u16>>,
    notdef_advance: u16,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("family", &self.family)
            .field("index", &self.index)
            .field("bytes", &self.data.len())
            .field("mapped_chars", &self.advances.len())
            .finish()
    }
}

impl FontFace {
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self, FontError> {
        let (family, units_per_em, ascender, descender, cap_height, advances, notdef_advance) = {
            let face = Face::parse(&data, index).map_err(|e| FontError::Parse(e.to_string()))?;
            let upem = f64::from(face.units_per_em());
            if upem <= 0.0 {
                return Err(FontError::Parse("units_per_em is zero".to_string()));
            }
            let family = face
                .names()
                .into_iter()
                .filter(|n| n.name_id == ttf_parser::name_id::FAMILY)
                .find_map(|n| n.to_string())
                .unwrap_or_else(|| "sans-serif".to_string());
            let cap = face
                .capital_height()
                .map(f64::from)
                .filter(|c| *c > 0.0)
                .unwrap_or(upem * 0.7);
            (
                family,
                upem,
                f64::from(face.ascender()),
                f64::from(face.descender()),
                cap,
                advance_table(&face),
                face.glyph_hor_advance(GlyphId(0)).unwrap_or(0),
            )
        };
        Ok(Self {
            data: Arc::new(data),
            index,
            family,
            units_per_em,
            ascender,
            descender,
            cap_height,
            advances: Arc::new(advances),
            notdef_advance,
        })
    }

    /// Loads the best installed match for `family`: a concrete name, or one of the generic
    /// `sans-serif` / `serif` / `monospace` keywords resolved through a list of common families.
    /// Concrete names that are not installed fall back to the sans-serif list.
    pub fn from_system(family: &str, bold: bool) -> Result<Self, FontError> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let weight = if bold {
            fontdb::Weight::BOLD
        } else {
            fontdb::Weight::NORMAL
        };
        let id = family_candidates(family)
            .into_iter()
            .find_map(|name| {
                db.query(&fontdb::Query {
                    families: &[name],
                    weight,
                    ..Default::default()
                })
            })
            .ok_or_else(|| FontError::NotFound {
                family: family.to_string(),
            })?;
        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| FontError::NotFound {
                family: family.to_string(),
            })?;
        let face = Self::from_bytes(data, index)?;
        tracing::debug!(requested = family, resolved = %face.family, bold, "loaded system font");
        Ok(face)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn vertical_metrics(&self, font_size: f64) -> VerticalMetrics {
        let scale = font_size / self.units_per_em;
        VerticalMetrics {
            ascent: self.ascender * scale,
            descent: self.descender * scale,
            cap_height: self.cap_height * scale,
        }
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }

    fn advance(&self, ch: char) -> u16 {
        self.advances
            .get(&ch)
            .copied()
            .unwrap_or(self.notdef_advance)
    }

    /// Sum of glyph advances for `text` at `font_size`.
    pub fn advance_width(&self, text: &str, font_size: f64) -> f64 {
        let units: f64 = text.chars().map(|ch| f64::from(self.advance(ch))).sum();
        units * font_size.max(0.0) / self.units_per_em
    }

    /// Outlines for `text` laid out from the origin, baseline at `y = 0`, y growing downwards.
    ///
    /// Returns `None` when the run has no visible contours (e.g. only spaces).
    pub fn text_path(&self, text: &str, font_size: f64) -> Option<Path> {
        let face = self.face()?;
        let scale = (font_size.max(0.0) / self.units_per_em) as f32;
        let mut sink = OutlineSink {
            builder: PathBuilder::new(),
            scale,
            origin_x: 0.0,
        };
        let mut pen = 0.0f64;
        for ch in text.chars() {
            let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
            sink.origin_x = pen as f32;
            face.outline_glyph(gid, &mut sink);
            pen += f64::from(self.advance(ch)) * f64::from(scale);
        }
        sink.builder.finish()
    }
}

fn advance_table(face: &Face<'_>) -> HashMap<char, u16> {
    let mut table = HashMap::new();
    let Some(cmap) = face.tables().cmap else {
        return table;
    };
    for subtable in cmap.subtables {
        if !subtable.is_unicode() {
            continue;
        }
        subtable.codepoints(|cp| {
            let Some(ch) = char::from_u32(cp) else {
                return;
            };
            if table.contains_key(&ch) {
                return;
            }
            if let Some(gid) = subtable.glyph_index(cp) {
                table.insert(ch, face.glyph_hor_advance(gid).unwrap_or(0));
            }
        });
    }
    table
}

fn family_candidates(name: &str) -> Vec<fontdb::Family<'_>> {
    let trimmed = name.trim();
    let (named, generic): (Option<&str>, _) = match trimmed.to_ascii_lowercase().as_str() {
        "sans-serif" | "sans" => (None, fontdb::Family::SansSerif),
        "serif" => (None, fontdb::Family::Serif),
        "monospace" => (None, fontdb::Family::Monospace),
        _ => (Some(trimmed), fontdb::Family::SansSerif),
    };
    let fallbacks = match generic {
        fontdb::Family::Serif => SERIF_FALLBACKS,
        fontdb::Family::Monospace => MONOSPACE_FALLBACKS,
        _ => SANS_SERIF_FALLBACKS,
    };
    named
        .into_iter()
        .chain(fallbacks.iter().copied())
        .map(fontdb::Family::Name)
        .chain(std::iter::once(generic))
        .collect()
}

struct OutlineSink {
    builder: PathBuilder,
    scale: f32,
    origin_x: f32,
}

impl OutlineSink {
    fn pt(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, -y * self.scale)
    }
}

impl ttf_parser::OutlineBuilder for OutlineSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.pt(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.pt(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.pt(x1, y1);
        let (x, y) = self.pt(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.pt(x1, y1);
        let (x2, y2) = self.pt(x2, y2);
        let (x, y) = self.pt(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// [`MetricsProvider`] backed by a real font face; the offline counterpart of the preview's
/// surface measurement.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    face: Arc<FontFace>,
}

impl FontMetrics {
    pub fn new(face: Arc<FontFace>) -> Self {
        Self { face }
    }

    pub fn face(&self) -> &Arc<FontFace> {
        &self.face
    }
}

impl MetricsProvider for FontMetrics {
    fn measure(&self, text: &str, font_size: f64) -> f64 {
        self.face.advance_width(text, font_size)
    }

    fn font_family(&self) -> &str {
        self.face.family()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let err = FontFace::from_bytes(b"not a font".to_vec(), 0).unwrap_err();
        assert!(matches!(err, FontError::Parse(_)));
    }

    #[test]
    fn generic_names_expand_to_installed_candidates() {
        let sans = family_candidates("Sans-Serif");
        assert_eq!(sans[0], fontdb::Family::Name("Arial"));
        assert!(sans.contains(&fontdb::Family::Name("DejaVu Sans")));
        assert_eq!(sans.last(), Some(&fontdb::Family::SansSerif));

        let mono = family_candidates("monospace");
        assert!(mono.contains(&fontdb::Family::Name("DejaVu Sans Mono")));
        assert_eq!(mono.last(), Some(&fontdb::Family::Monospace));

        let named = family_candidates(" Inter ");
        assert_eq!(named[0], fontdb::Family::Name("Inter"));
        assert_eq!(named[1], fontdb::Family::Name("Arial"));
    }

    #[test]
    fn system_sans_serif_resolves_and_measures_from_the_advance_table() {
        let face = FontFace::from_system("sans-serif", false)
            .expect("a sans-serif face must be installed (e.g. DejaVu Sans or Liberation Sans)");
        assert!(face.advances.len() > 90, "{face:?}");
        let metrics = FontMetrics::new(Arc::new(face));
        let one = metrics.measure("a", 20.0);
        assert!(one > 0.0);
        assert!((metrics.measure("aaaa", 20.0) - 4.0 * one).abs() < 1e-9);
        assert!((metrics.measure("a", 40.0) - 2.0 * one).abs() < 1e-9);
    }
}
