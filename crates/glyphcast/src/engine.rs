use crate::canvas::CanvasSpec;
use crate::Result;
use glyphcast_core::{
    BoxSize, CaptionConfig, FitOptions, LayoutError, LayoutResult, MetricsProvider, SegmentParser,
    Sequence, fit_sequence, strip_hashtags,
};
use glyphcast_render::{
    AssetSource, CacheOptions, Compositor, EmojiAssetCache, FontFace, RibbonSpec, RibbonStore,
    Rendered, Scrim,
};
use std::sync::Arc;

/// Parser, fit options, font and emoji cache bundled behind the two caption paths.
///
/// The preview path ([`CaptionEngine::preview_layout`]) takes the interactive surface's
/// [`MetricsProvider`] and never touches pixels. The publish path
/// ([`CaptionEngine::publish_sync`]) measures with the engine's own font and always exports.
#[derive(Debug, Clone)]
pub struct CaptionEngine {
    config: CaptionConfig,
    parser: SegmentParser,
    fit: FitOptions,
    scrim: Scrim,
    strip_hashtags: bool,
    compositor: Compositor,
    ribbon_font: Arc<FontFace>,
}

impl CaptionEngine {
    pub fn new(
        config: CaptionConfig,
        font: Arc<FontFace>,
        source: Arc<dyn AssetSource>,
    ) -> Result<Self> {
        let cache = EmojiAssetCache::with_options(source, CacheOptions::from_config(&config));
        Self::with_cache(config, font, Arc::new(cache))
    }

    /// Shares an existing cache, e.g. one process-wide cache across several engines.
    pub fn with_cache(
        config: CaptionConfig,
        font: Arc<FontFace>,
        cache: Arc<EmojiAssetCache>,
    ) -> Result<Self> {
        let fit = FitOptions::from_config(&config);
        fit.validate()?;
        let scrim = Scrim::from_config(&config)?;
        Ok(Self {
            parser: SegmentParser::from_config(&config),
            fit,
            scrim,
            strip_hashtags: config.get_bool("text.stripHashtags").unwrap_or(false),
            ribbon_font: Arc::clone(&font),
            compositor: Compositor::new(font, cache),
            config,
        })
    }

    /// Fetches emoji over HTTP with the default retry policy.
    #[cfg(feature = "http")]
    pub fn with_http(config: CaptionConfig, font: Arc<FontFace>) -> Result<Self> {
        let http = glyphcast_render::HttpAssetSource::new()?;
        let source = glyphcast_render::RetryingSource::new(http);
        Self::new(config, font, Arc::new(source))
    }

    /// Ribbons are drawn with their own (usually bold) face.
    pub fn with_ribbon_font(mut self, font: Arc<FontFace>) -> Self {
        self.ribbon_font = font;
        self
    }

    pub fn config(&self) -> &CaptionConfig {
        &self.config
    }

    pub fn parser(&self) -> &SegmentParser {
        &self.parser
    }

    pub fn fit_options(&self) -> &FitOptions {
        &self.fit
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn cache(&self) -> &Arc<EmojiAssetCache> {
        self.compositor.cache()
    }

    fn sequence(&self, text: &str) -> Sequence {
        if self.strip_hashtags {
            self.parser.parse(&strip_hashtags(text))
        } else {
            self.parser.parse(text)
        }
    }

    /// Layout for the interactive preview, measured by the surface's own provider.
    pub fn preview_layout(
        &self,
        text: &str,
        bx: BoxSize,
        metrics: &dyn MetricsProvider,
    ) -> Result<LayoutResult> {
        Ok(fit_sequence(&self.sequence(text), bx, &self.fit, metrics)?)
    }

    /// Layout measured with the engine's font; what [`CaptionEngine::publish_sync`] paints.
    pub fn layout_sync(&self, text: &str, bx: BoxSize) -> Result<LayoutResult> {
        self.preview_layout(text, bx, self.compositor.metrics())
    }

    /// Like [`CaptionEngine::layout_sync`] for raw bytes; malformed UTF-8 is rejected.
    pub fn layout_bytes_sync(&self, bytes: &[u8], bx: BoxSize) -> Result<LayoutResult> {
        let text = std::str::from_utf8(bytes).map_err(|e| LayoutError::Encoding(e.into()))?;
        self.layout_sync(text, bx)
    }

    /// Lays out `text` for `canvas` and exports the composited image.
    pub fn publish_sync(&self, text: &str, canvas: &CanvasSpec) -> Result<Rendered> {
        let layout = self.layout_sync(text, canvas.text_box.size())?;
        if layout.truncated {
            tracing::warn!(
                font_size = layout.font_size,
                lines = layout.lines.len(),
                "caption truncated to fit the canvas"
            );
        }
        let rendered = self
            .compositor
            .render(&layout, &canvas.render_options(self.scrim))?;
        tracing::debug!(
            width = rendered.width,
            height = rendered.height,
            bytes = rendered.bytes.len(),
            "caption published"
        );
        Ok(rendered)
    }

    pub fn ribbon_png(&self, spec: &RibbonSpec) -> Result<Vec<u8>> {
        Ok(glyphcast_render::render_ribbon(spec, &self.ribbon_font)?)
    }

    pub fn publish_ribbon(&self, spec: &RibbonSpec, store: &dyn RibbonStore) -> Result<String> {
        Ok(glyphcast_render::publish_ribbon(
            spec,
            &self.ribbon_font,
            store,
        )?)
    }
}
