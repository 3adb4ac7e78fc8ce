//! Paints a [`LayoutResult`] onto a raster surface and exports it.
//!
//! Geometry mirrors the layout exactly: text runs advance by their font advances and every emoji
//! advances by `font_size`, whether its image resolved or the literal glyphs were drawn instead.

use crate::cache::{EmojiAssetCache, EmojiImage};
use crate::color::parse_color;
use crate::decode;
use crate::error::{RenderError, Result};
use crate::font::{FontFace, FontMetrics};
use glyphcast_core::{BoxSize, CaptionConfig, LayoutResult, MetricsProvider, Segment};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Color, FillRule, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform};
use url::Url;

/// Where the caption block sits on the surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TextBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The box the layout engine should fit into.
    pub fn size(&self) -> BoxSize {
        BoxSize::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Translucent band spanning the full surface width behind the caption block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scrim {
    pub color: Color,
    pub padding: f64,
}

impl Default for Scrim {
    fn default() -> Self {
        Self {
            color: Color::from_rgba8(0, 0, 0, 128),
            padding: 5.0,
        }
    }
}

impl Scrim {
    /// `scrim.color` and `scrim.padding`; an unparsable color is an error.
    pub fn from_config(config: &CaptionConfig) -> Result<Self> {
        let d = Self::default();
        let color = match config.get_str("scrim.color") {
            Some(raw) => parse_color(raw)?,
            None => d.color,
        };
        let padding = config
            .get_f64("scrim.padding")
            .filter(|p| *p >= 0.0)
            .unwrap_or(d.padding);
        Ok(Self { color, padding })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintOptions {
    pub text_box: TextBox,
    pub align: Align,
    pub vertical: VerticalAlign,
    pub color: Color,
    pub scrim: Option<Scrim>,
}

impl PaintOptions {
    /// Centered white text over the default scrim.
    pub fn new(text_box: TextBox) -> Self {
        Self {
            text_box,
            align: Align::default(),
            vertical: VerticalAlign::default(),
            color: Color::WHITE,
            scrim: Some(Scrim::default()),
        }
    }
}

/// What a paint call actually drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintReport {
    pub text_runs: usize,
    pub emoji_images: usize,
    /// Emoji drawn as font glyphs because their asset was missing or failed.
    pub emoji_fallbacks: usize,
}

#[derive(Debug, Clone)]
pub enum Background {
    Transparent,
    Solid(Color),
    /// Scaled to cover the whole surface, centered, cropping the overflow.
    Image(Arc<Pixmap>),
}

impl Background {
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let pixmap = decode::decode_image(bytes, 1080)?;
        Ok(Self::Image(Arc::new(pixmap)))
    }

    fn is_opaque(&self) -> bool {
        match self {
            Self::Transparent => false,
            Self::Solid(color) => color.is_opaque(),
            Self::Image(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg {
        quality: u8,
    },
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub background: Background,
    pub paint: PaintOptions,
    pub format: ExportFormat,
}

/// Encoded output plus the layout it was painted from.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ExportFormat,
    pub layout: LayoutResult,
    pub report: PaintReport,
}

#[derive(Debug, Clone)]
pub struct Compositor {
    font: Arc<FontFace>,
    metrics: FontMetrics,
    cache: Arc<EmojiAssetCache>,
}

impl Compositor {
    pub fn new(font: Arc<FontFace>, cache: Arc<EmojiAssetCache>) -> Self {
        let metrics = FontMetrics::new(Arc::clone(&font));
        Self {
            font,
            metrics,
            cache,
        }
    }

    /// The provider layouts must be computed with for this compositor to reproduce them.
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn font(&self) -> &Arc<FontFace> {
        &self.font
    }

    pub fn cache(&self) -> &Arc<EmojiAssetCache> {
        &self.cache
    }

    /// Draws `layout` into `surface`. Missing emoji never fail the paint; they fall back to
    /// glyphs and are counted in the report.
    ///
    /// Emoji nobody has requested yet are fetched before painting. An emoji another caller is
    /// still fetching is drawn as glyphs rather than waited for.
    pub fn paint(
        &self,
        layout: &LayoutResult,
        surface: &mut Pixmap,
        options: &PaintOptions,
    ) -> PaintReport {
        let mut report = PaintReport::default();
        if layout.lines.is_empty() {
            return report;
        }

        let images = self.resolve_images(layout);
        let size = layout.font_size;
        let bx = options.text_box;
        let block_h = layout.block_height();
        let top = match options.vertical {
            VerticalAlign::Top => bx.y,
            VerticalAlign::Center => bx.y + (bx.height - block_h) / 2.0,
            VerticalAlign::Bottom => bx.y + bx.height - block_h,
        };

        let line_starts: Vec<f64> = layout
            .lines
            .iter()
            .map(|line| {
                let w = self.metrics.sequence_width(line, size);
                match options.align {
                    Align::Left => bx.x,
                    Align::Center => bx.x + (bx.width - w) / 2.0,
                    Align::Right => bx.x + bx.width - w,
                }
            })
            .collect();

        if let Some(scrim) = options.scrim {
            let rect = Rect::from_xywh(
                0.0,
                (top - scrim.padding) as f32,
                surface.width() as f32,
                (block_h + 2.0 * scrim.padding) as f32,
            );
            if let Some(rect) = rect {
                surface.fill_rect(rect, &solid_paint(scrim.color), Transform::identity(), None);
            }
        }

        let vm = self.font.vertical_metrics(size);
        let text_paint = solid_paint(options.color);
        for (i, (line, x0)) in layout.lines.iter().zip(&line_starts).enumerate() {
            // Lines are drawn with a "middle" baseline: `center_y` is the em-box center.
            let center_y = top + (i as f64 + 0.5) * layout.line_height;
            let baseline = center_y + (vm.ascent + vm.descent) / 2.0;
            let mut x = *x0;
            for segment in line {
                match segment {
                    Segment::Text(text) => {
                        self.fill_text(surface, text, size, x, baseline, &text_paint);
                        report.text_runs += 1;
                        x += self.metrics.measure(text, size);
                    }
                    Segment::Emoji(emoji) => {
                        let image = emoji.asset_ref.as_ref().and_then(|u| images.get(u));
                        match image {
                            Some(image) => {
                                let emoji_center = baseline - vm.cap_height / 2.0;
                                draw_emoji(surface, image, x, emoji_center - size / 2.0, size);
                                report.emoji_images += 1;
                            }
                            None => {
                                let glyphs = emoji.display.as_str();
                                self.fill_text(surface, glyphs, size, x, baseline, &text_paint);
                                report.emoji_fallbacks += 1;
                            }
                        }
                        x += self.metrics.emoji_advance(size);
                    }
                }
            }
        }
        tracing::debug!(
            lines = layout.lines.len(),
            text_runs = report.text_runs,
            emoji = report.emoji_images,
            fallbacks = report.emoji_fallbacks,
            "caption painted"
        );
        report
    }

    /// Paints onto a fresh surface and encodes it.
    pub fn render(&self, layout: &LayoutResult, options: &RenderOptions) -> Result<Rendered> {
        if matches!(options.format, ExportFormat::Jpeg { .. }) && !options.background.is_opaque()
        {
            return Err(RenderError::JpegOpaqueBackgroundRequired);
        }
        let mut surface =
            Pixmap::new(options.width, options.height).ok_or(RenderError::PixmapAlloc)?;
        fill_background(&mut surface, &options.background);
        let report = self.paint(layout, &mut surface, &options.paint);
        let bytes = encode(&surface, options.format)?;
        Ok(Rendered {
            bytes,
            width: options.width,
            height: options.height,
            format: options.format,
            layout: layout.clone(),
            report,
        })
    }

    fn resolve_images(&self, layout: &LayoutResult) -> HashMap<Url, Arc<EmojiImage>> {
        let mut images = HashMap::new();
        let urls = layout
            .lines
            .iter()
            .flat_map(|line| line.iter())
            .filter_map(Segment::asset_ref);
        for url in urls {
            if images.contains_key(url) {
                continue;
            }
            match self.cache.resolve_unless_pending(url) {
                Some(Ok(image)) => {
                    images.insert(url.clone(), image);
                }
                Some(Err(err)) => {
                    tracing::warn!(url = %url, error = %err, "emoji unavailable; drawing glyphs");
                }
                None => {
                    tracing::debug!(url = %url, "emoji still being fetched elsewhere; drawing glyphs");
                }
            }
        }
        images
    }

    fn fill_text(
        &self,
        surface: &mut Pixmap,
        text: &str,
        size: f64,
        x: f64,
        baseline: f64,
        paint: &Paint<'_>,
    ) {
        if let Some(path) = self.font.text_path(text, size) {
            let transform = Transform::from_translate(x as f32, baseline as f32);
            surface.fill_path(&path, paint, FillRule::Winding, transform, None);
        }
    }
}

pub(crate) fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn draw_emoji(surface: &mut Pixmap, image: &EmojiImage, x: f64, y: f64, size: f64) {
    let sx = size as f32 / image.width() as f32;
    let sy = size as f32 / image.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    surface.draw_pixmap(
        0,
        0,
        image.pixmap().as_ref(),
        &paint,
        Transform::from_row(sx, 0.0, 0.0, sy, x as f32, y as f32),
        None,
    );
}

fn fill_background(surface: &mut Pixmap, background: &Background) {
    match background {
        Background::Transparent => {}
        Background::Solid(color) => surface.fill(*color),
        Background::Image(image) => {
            let image: &Pixmap = image;
            surface.fill(Color::WHITE);
            let (w, h) = (surface.width() as f32, surface.height() as f32);
            let (iw, ih) = (image.width() as f32, image.height() as f32);
            let scale = (w / iw).max(h / ih);
            let dx = (w - iw * scale) / 2.0;
            let dy = (h - ih * scale) / 2.0;
            let paint = PixmapPaint {
                quality: FilterQuality::Bicubic,
                ..PixmapPaint::default()
            };
            surface.draw_pixmap(
                0,
                0,
                image.as_ref(),
                &paint,
                Transform::from_row(scale, 0.0, 0.0, scale, dx, dy),
                None,
            );
        }
    }
}

/// Encodes a finished surface. JPEG drops the alpha channel, so the surface must be opaque.
pub fn encode(surface: &Pixmap, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Png => surface.encode_png().map_err(|_| RenderError::PngEncode),
        ExportFormat::Jpeg { quality } => {
            let (w, h) = (surface.width(), surface.height());
            // Opaque premultiplied pixels equal their straight values.
            let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
            for (src, dst) in surface.data().chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
                dst.copy_from_slice(&src[..3]);
            }
            let mut out = Vec::new();
            let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut out,
                quality.clamp(1, 100),
            );
            enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
                .map_err(|_| RenderError::JpegEncode)?;
            Ok(out)
        }
    }
}
