use glyphcast_render::tiny_skia::Color;
use glyphcast_render::{
    Align, Background, ExportFormat, PaintOptions, RenderOptions, Scrim, TextBox, VerticalAlign,
};

/// Distance kept between the caption box and the canvas edges in the presets.
pub const PRESET_MARGIN: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanvasFormat {
    /// Square feed post, 1080x1080.
    Feed,
    /// Vertical 9:16 story, 1080x1920.
    Story,
}

impl CanvasFormat {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Feed => (1080, 1080),
            Self::Story => (1080, 1920),
        }
    }
}

/// Everything the publish path needs to know about the target surface.
#[derive(Debug, Clone)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub text_box: TextBox,
    pub align: Align,
    pub vertical: VerticalAlign,
    pub color: Color,
    /// Paint the engine's configured scrim behind the caption.
    pub scrim: bool,
    pub background: Background,
    pub format: ExportFormat,
}

impl CanvasSpec {
    /// Feed captions use the whole canvas inside the margin. Story captions sit in the middle
    /// third over a scrim.
    pub fn preset(format: CanvasFormat) -> Self {
        let (width, height) = format.dimensions();
        let (w, h) = (f64::from(width), f64::from(height));
        let inner_w = w - 2.0 * PRESET_MARGIN;
        let (text_box, scrim) = match format {
            CanvasFormat::Feed => (
                TextBox::new(PRESET_MARGIN, PRESET_MARGIN, inner_w, h - 2.0 * PRESET_MARGIN),
                false,
            ),
            CanvasFormat::Story => (TextBox::new(PRESET_MARGIN, h / 3.0, inner_w, h / 3.0), true),
        };
        Self {
            width,
            height,
            text_box,
            align: Align::Center,
            vertical: VerticalAlign::Center,
            color: Color::WHITE,
            scrim,
            background: Background::Transparent,
            format: ExportFormat::Png,
        }
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn paint_options(&self, scrim: Scrim) -> PaintOptions {
        PaintOptions {
            text_box: self.text_box,
            align: self.align,
            vertical: self.vertical,
            color: self.color,
            scrim: self.scrim.then_some(scrim),
        }
    }

    pub fn render_options(&self, scrim: Scrim) -> RenderOptions {
        RenderOptions {
            width: self.width,
            height: self.height,
            background: self.background.clone(),
            paint: self.paint_options(scrim),
            format: self.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_platform_sizes() {
        assert_eq!(CanvasFormat::Feed.dimensions(), (1080, 1080));
        let story = CanvasSpec::preset(CanvasFormat::Story);
        assert_eq!((story.width, story.height), (1080, 1920));
        assert_eq!(story.width * 16, story.height * 9);
        assert!(story.scrim);
        assert_eq!(story.text_box, TextBox::new(80.0, 640.0, 920.0, 640.0));

        let feed = CanvasSpec::preset(CanvasFormat::Feed);
        assert!(!feed.scrim);
        assert_eq!(feed.text_box.size().width, 920.0);
    }

    #[test]
    fn scrim_is_only_applied_when_requested() {
        let feed = CanvasSpec::preset(CanvasFormat::Feed);
        assert_eq!(feed.paint_options(Scrim::default()).scrim, None);
        let story = CanvasSpec::preset(CanvasFormat::Story).with_format(ExportFormat::Jpeg {
            quality: 90,
        });
        let opts = story.render_options(Scrim::default());
        assert_eq!(opts.paint.scrim, Some(Scrim::default()));
        assert_eq!(opts.format, ExportFormat::Jpeg { quality: 90 });
    }
}
