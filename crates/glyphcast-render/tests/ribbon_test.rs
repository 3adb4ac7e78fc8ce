use glyphcast_render::{
    FontFace, PublishError, RIBBON_CANVAS, RibbonColor, RibbonCorner, RibbonSpec, RibbonStore,
    StoreError, publish_ribbon, render_ribbon,
};
use std::sync::Mutex;

/// Arial when installed, otherwise the first bold sans-serif face found.
fn bold_font() -> FontFace {
    FontFace::from_system("Arial", true)
        .expect("a bold sans-serif system font is required (e.g. DejaVu Sans Bold)")
}

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

fn is_near_white(px: [u8; 4]) -> bool {
    px[3] == 255 && px[0] > 230 && px[1] > 230 && px[2] > 230
}

#[test]
fn promo_badge_is_deterministic_and_anchored_north_west() {
    let font = bold_font();
    let spec = RibbonSpec::new("PROMO", RibbonColor::Red, RibbonCorner::NorthWest);

    let first = render_ribbon(&spec, &font).unwrap();
    let second = render_ribbon(&spec, &font).unwrap();
    assert_eq!(first, second);

    let img = decode(&first);
    assert_eq!(img.dimensions(), (RIBBON_CANVAS, RIBBON_CANVAS));
    assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(140, 2).0[..3], [255, 0, 0]);
    assert_eq!(img.get_pixel(195, 5).0[3], 0);
    assert_eq!(img.get_pixel(100, 100).0[3], 0);
    assert_eq!(img.get_pixel(195, 195).0[3], 0);

    // The label is painted in white somewhere along the diagonal.
    assert!(img.pixels().any(|p| is_near_white(p.0)));
}

#[test]
fn north_east_badge_mirrors_the_wedge() {
    let font = bold_font();
    let spec = RibbonSpec::new("NEW", RibbonColor::Yellow, RibbonCorner::NorthEast);
    let img = decode(&render_ribbon(&spec, &font).unwrap());

    assert_eq!(img.get_pixel(194, 5).0, [0xFF, 0xC1, 0x07, 0xFF]);
    assert_eq!(img.get_pixel(5, 5).0[3], 0);
    assert_eq!(img.get_pixel(5, 195).0[3], 0);
}

#[test]
fn empty_label_still_renders_the_wedge() {
    let font = bold_font();
    let spec = RibbonSpec::new("", RibbonColor::Red, RibbonCorner::NorthWest);
    let img = decode(&render_ribbon(&spec, &font).unwrap());
    assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0, 255]);
    assert!(!img.pixels().any(|p| is_near_white(p.0)));
}

#[derive(Default)]
struct RecordingStore {
    uploads: Mutex<Vec<(String, usize)>>,
    reject: bool,
}

impl RibbonStore for RecordingStore {
    fn upload(&self, png: &[u8], asset_id: &str) -> Result<String, StoreError> {
        if self.reject {
            return Err(StoreError::Rejected {
                asset_id: asset_id.to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .push((asset_id.to_string(), png.len()));
        Ok(format!("ribbon-overlays/{asset_id}"))
    }
}

#[test]
fn publishing_uploads_the_png_under_its_asset_id() {
    let font = bold_font();
    let spec = RibbonSpec::new("PROMO", RibbonColor::Red, RibbonCorner::NorthWest);
    let store = RecordingStore::default();

    let id = publish_ribbon(&spec, &font, &store).unwrap();
    assert_eq!(id, "ribbon-overlays/ribbon_PROMO_red_north_west");
    let uploads = store.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "ribbon_PROMO_red_north_west");
    assert!(uploads[0].1 > 0);

    let rejecting = RecordingStore {
        reject: true,
        ..RecordingStore::default()
    };
    assert!(matches!(
        publish_ribbon(&spec, &font, &rejecting),
        Err(PublishError::Store(StoreError::Rejected { .. }))
    ));
}
