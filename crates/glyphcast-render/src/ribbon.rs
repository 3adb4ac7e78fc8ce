//! Corner ribbon badges: a colored right triangle with a rotated label, exported as a standalone
//! transparent PNG.

use crate::compose::solid_paint;
use crate::error::{RenderError, Result, StoreError};
use crate::font::FontFace;
use std::fmt;
use tiny_skia::{Color, FillRule, PathBuilder, Pixmap, Transform};

pub const RIBBON_CANVAS: u32 = 200;
const LEG: f32 = 150.0;
const LABEL_SIZE: f64 = 24.0;
/// Distance of the label center from both edges of its corner.
const LABEL_INSET: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RibbonColor {
    Red,
    Yellow,
}

impl RibbonColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }

    pub fn fill(self) -> Color {
        match self {
            Self::Red => Color::from_rgba8(0xFF, 0x00, 0x00, 0xFF),
            Self::Yellow => Color::from_rgba8(0xFF, 0xC1, 0x07, 0xFF),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RibbonCorner {
    NorthWest,
    NorthEast,
}

impl RibbonCorner {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NorthWest => "north_west",
            Self::NorthEast => "north_east",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RibbonSpec {
    pub label: String,
    pub color: RibbonColor,
    pub corner: RibbonCorner,
}

impl RibbonSpec {
    pub fn new(label: impl Into<String>, color: RibbonColor, corner: RibbonCorner) -> Self {
        Self {
            label: label.into(),
            color,
            corner,
        }
    }

    /// Stable identifier for the remote asset store.
    pub fn asset_id(&self) -> String {
        format!(
            "ribbon_{}_{}_{}",
            self.label,
            self.color.as_str(),
            self.corner.as_str()
        )
    }
}

impl fmt::Display for RibbonSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.asset_id())
    }
}

/// Remote store the encoded badges are published to. Returns the store's public identifier.
pub trait RibbonStore {
    fn upload(&self, png: &[u8], asset_id: &str) -> std::result::Result<String, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Renders `spec` as a transparent PNG. Pure: identical inputs give identical bytes.
pub fn render_ribbon(spec: &RibbonSpec, font: &FontFace) -> Result<Vec<u8>> {
    let size = RIBBON_CANVAS as f32;
    let mut pixmap = Pixmap::new(RIBBON_CANVAS, RIBBON_CANVAS).ok_or(RenderError::PixmapAlloc)?;

    let mut pb = PathBuilder::new();
    let (center, angle) = match spec.corner {
        RibbonCorner::NorthWest => {
            pb.move_to(0.0, 0.0);
            pb.line_to(LEG, 0.0);
            pb.line_to(0.0, LEG);
            ((LABEL_INSET, LABEL_INSET), -45.0)
        }
        RibbonCorner::NorthEast => {
            pb.move_to(size, 0.0);
            pb.line_to(size - LEG, 0.0);
            pb.line_to(size, LEG);
            ((size - LABEL_INSET, LABEL_INSET), 45.0)
        }
    };
    pb.close();
    if let Some(triangle) = pb.finish() {
        pixmap.fill_path(
            &triangle,
            &solid_paint(spec.color.fill()),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    if let Some(label) = font.text_path(&spec.label, LABEL_SIZE) {
        // Centered horizontally and on the em-box middle vertically, then rotated about the
        // label center.
        let width = font.advance_width(&spec.label, LABEL_SIZE) as f32;
        let vm = font.vertical_metrics(LABEL_SIZE);
        let baseline = ((vm.ascent + vm.descent) / 2.0) as f32;
        let transform = Transform::from_translate(center.0, center.1)
            .pre_concat(Transform::from_rotate(angle))
            .pre_translate(-width / 2.0, baseline);
        pixmap.fill_path(
            &label,
            &solid_paint(Color::WHITE),
            FillRule::Winding,
            transform,
            None,
        );
    }

    tracing::debug!(ribbon = %spec, "ribbon rendered");
    pixmap.encode_png().map_err(|_| RenderError::PngEncode)
}

/// Renders `spec` and uploads it under [`RibbonSpec::asset_id`].
pub fn publish_ribbon(
    spec: &RibbonSpec,
    font: &FontFace,
    store: &dyn RibbonStore,
) -> std::result::Result<String, PublishError> {
    let png = render_ribbon(spec, font)?;
    let id = store.upload(&png, &spec.asset_id())?;
    tracing::debug!(ribbon = %spec, public_id = %id, "ribbon published");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_ids_name_label_color_and_corner() {
        let spec = RibbonSpec::new("NEW", RibbonColor::Red, RibbonCorner::NorthWest);
        assert_eq!(spec.asset_id(), "ribbon_NEW_red_north_west");
        let spec = RibbonSpec::new("PROMO", RibbonColor::Yellow, RibbonCorner::NorthEast);
        assert_eq!(spec.asset_id(), "ribbon_PROMO_yellow_north_east");
    }

    #[test]
    fn palette_matches_badge_colors() {
        assert_eq!(
            RibbonColor::Yellow.fill(),
            Color::from_rgba8(0xFF, 0xC1, 0x07, 0xFF)
        );
        assert_eq!(RibbonColor::Red.fill(), Color::from_rgba8(255, 0, 0, 255));
    }
}
