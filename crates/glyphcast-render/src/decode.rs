//! Bytes -> premultiplied [`Pixmap`] for emoji assets and background photos.

use crate::error::DecodeError;
use tiny_skia::{ColorU8, IntSize, Pixmap, Transform};

/// Cheap sniff for SVG documents (optionally behind an XML prolog or BOM).
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head = &bytes[start..bytes.len().min(start + 512)];
    head.starts_with(b"<svg") || (head.starts_with(b"<?xml") && contains(head, b"<svg"))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Decodes an asset. SVG is rasterized into a `vector_size` square; raster formats keep their
/// intrinsic size.
pub fn decode_image(bytes: &[u8], vector_size: u32) -> Result<Pixmap, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if looks_like_svg(bytes) {
        rasterize_svg(bytes, vector_size)
    } else {
        decode_raster(bytes)
    }
}

pub fn rasterize_svg(bytes: &[u8], size: u32) -> Result<Pixmap, DecodeError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| DecodeError::Svg(e.to_string()))?;
    let mut pixmap = Pixmap::new(size, size).ok_or(DecodeError::Dimensions {
        width: size,
        height: size,
    })?;
    let natural = tree.size();
    let transform = Transform::from_scale(
        size as f32 / natural.width(),
        size as f32 / natural.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}

pub fn decode_raster(bytes: &[u8]) -> Result<Pixmap, DecodeError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| DecodeError::Raster(e.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let bad_size = DecodeError::Dimensions { width, height };
    let size = IntSize::from_wh(width, height).ok_or_else(|| bad_size.clone())?;

    // tiny-skia stores premultiplied RGBA.
    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        px[0] = c.red();
        px[1] = c.green();
        px[2] = c.blue();
    }
    Pixmap::from_vec(data, size).ok_or(bad_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn sniffs_svg() {
        assert!(looks_like_svg(b"  <svg xmlns='http://www.w3.org/2000/svg'/>"));
        assert!(looks_like_svg(
            b"<?xml version=\"1.0\"?>\n<svg xmlns='http://www.w3.org/2000/svg'/>"
        ));
        assert!(!looks_like_svg(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn svg_is_rasterized_at_requested_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 36 36"><rect width="36" height="36" fill="#ff0000"/></svg>"##;
        let pixmap = decode_image(svg, 72).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (72, 72));
        let px = pixmap.pixel(36, 36).unwrap();
        assert_eq!((px.red(), px.alpha()), (255, 255));
    }

    #[test]
    fn raster_keeps_intrinsic_size_and_premultiplies() {
        let bytes = png_bytes(4, 3, [200, 100, 0, 128]);
        let pixmap = decode_image(&bytes, 72).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (4, 3));
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() <= 101, "not premultiplied: {}", px.red());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(decode_image(b"", 72), Err(DecodeError::Empty)));
        assert!(matches!(
            decode_image(b"definitely not an image", 72),
            Err(DecodeError::Raster(_))
        ));
    }
}
