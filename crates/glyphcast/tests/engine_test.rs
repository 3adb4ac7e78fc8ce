use glyphcast::render::{
    ExportFormat, FontFace, RenderError, RibbonColor, RibbonCorner, RibbonSpec, StaticAssetSource,
};
use glyphcast::{
    BoxSize, CanvasFormat, CanvasSpec, CaptionConfig, CaptionEngine, Error, LayoutError,
    MetricsProvider, SurfaceMetrics,
};
use serde_json::json;
use std::sync::Arc;
use url::Url;

const CAPTION: &str = "Nouvelle collection 🌸 disponible dès aujourd'hui 🛍️ #printemps #mode";

fn system_font() -> Arc<FontFace> {
    let face = FontFace::from_system("sans-serif", false)
        .expect("a sans-serif system font is required (e.g. DejaVu Sans or Liberation Sans)");
    Arc::new(face)
}

fn red_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(72, 72, image::Rgba([255, 0, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn engine_with(config: CaptionConfig, font: Arc<FontFace>) -> glyphcast::Result<CaptionEngine> {
    let base = Url::parse("https://cdn.example.com/72x72/").unwrap();
    let source = StaticAssetSource::new().with(&base.join("1f338.png").unwrap(), red_png());
    let config = {
        let mut merged = CaptionConfig::from_value(json!({
            "emoji": { "assetBase": base.as_str() }
        }));
        merged.merge(&config);
        merged
    };
    CaptionEngine::new(config, font, Arc::new(source))
}

#[test]
fn preview_and_publish_agree_when_the_surface_measures_like_the_font() {
    let font = system_font();
    let engine = engine_with(CaptionConfig::empty_object(), font).unwrap();
    let offline = engine.compositor().metrics().clone();
    let surface = SurfaceMetrics::new(offline.font_family().to_string(), move |text, size| {
        offline.measure(text, size)
    });

    let bx = BoxSize::new(500.0, 240.0);
    let preview = engine.preview_layout(CAPTION, bx, &surface).unwrap();
    let publish = engine.layout_sync(CAPTION, bx).unwrap();
    assert_eq!(preview, publish);
}

#[test]
fn story_publish_exports_a_full_canvas_png() {
    let font = system_font();
    let engine = engine_with(CaptionConfig::empty_object(), font).unwrap();
    let canvas = CanvasSpec::preset(CanvasFormat::Story);

    let out = engine.publish_sync(CAPTION, &canvas).unwrap();
    assert!(out.bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert_eq!((out.width, out.height), (1080, 1920));
    assert_eq!(out.layout, engine.layout_sync(CAPTION, canvas.text_box.size()).unwrap());
    // 🌸 resolves from the static source; 🛍️ has no asset and falls back to glyphs.
    assert_eq!(out.report.emoji_images, 1);
    assert_eq!(out.report.emoji_fallbacks, 1);
    assert_eq!(engine.cache().fetch_count(), 2);

    let img = image::load_from_memory(&out.bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (1080, 1920));
    // Story captions sit on the scrim band across the full width.
    assert!(img.get_pixel(2, 960).0[3] > 0);
    assert_eq!(img.get_pixel(2, 10).0[3], 0);
}

#[test]
fn jpeg_publish_requires_a_background() {
    let font = system_font();
    let engine = engine_with(CaptionConfig::empty_object(), font).unwrap();
    let canvas =
        CanvasSpec::preset(CanvasFormat::Feed).with_format(ExportFormat::Jpeg { quality: 90 });
    let err = engine.publish_sync("hello", &canvas).unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::JpegOpaqueBackgroundRequired)
    ));
}

#[test]
fn config_overrides_fit_and_text_handling() {
    let font = system_font();
    let config = CaptionConfig::from_value(json!({
        "font": { "maxSize": 30, "minSize": 10 },
        "text": { "stripHashtags": true, "ellipsis": "..." }
    }));
    let engine = engine_with(config, font).unwrap();
    assert_eq!(engine.fit_options().max_size, 30.0);

    let out = engine.layout_sync(CAPTION, BoxSize::new(2000.0, 500.0)).unwrap();
    assert_eq!(out.font_size, 30.0);
    let text = out.line_texts().join(" ");
    assert!(!text.contains('#'), "{text}");
    assert!(text.ends_with("🛍️"), "{text}");
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let font = system_font();
    let bad_fit = CaptionConfig::from_value(json!({ "font": { "minSize": 0 } }));
    assert!(matches!(
        engine_with(bad_fit, Arc::clone(&font)),
        Err(Error::Layout(LayoutError::InvalidOptions { .. }))
    ));

    let bad_scrim = CaptionConfig::from_value(json!({ "scrim": { "color": "nope" } }));
    assert!(matches!(
        engine_with(bad_scrim, font),
        Err(Error::Render(RenderError::InvalidColor { .. }))
    ));
}

#[test]
fn malformed_caption_bytes_report_the_offset() {
    let font = system_font();
    let engine = engine_with(CaptionConfig::empty_object(), font).unwrap();
    let err = engine
        .layout_bytes_sync(b"caf\xC3", BoxSize::new(300.0, 300.0))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Layout(LayoutError::Encoding(e)) if e.valid_up_to == 3
    ));
}

#[test]
fn ribbon_png_is_stable() {
    let font = system_font();
    let engine = engine_with(CaptionConfig::empty_object(), font).unwrap();
    let spec = RibbonSpec::new("PROMO", RibbonColor::Red, RibbonCorner::NorthWest);
    let a = engine.ribbon_png(&spec).unwrap();
    let b = engine.ribbon_png(&spec).unwrap();
    assert_eq!(a, b);
    assert!(a.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn core_error_module_and_facade_error_are_both_public() {
    let layout: glyphcast::error::LayoutError =
        glyphcast::error::EncodingError { valid_up_to: 2 }.into();
    let facade: Error = layout.clone().into();
    assert!(matches!(facade, Error::Layout(ref e) if *e == layout));
    let result: glyphcast::Result<()> = Err(facade);
    assert!(result.is_err());
}
