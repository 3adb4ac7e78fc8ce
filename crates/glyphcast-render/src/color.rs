use crate::error::{RenderError, Result};
use tiny_skia::Color;

/// Parses the color notations accepted in caption configs.
///
/// Supported: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)` with
/// `a` in `0..=1`, plus `white`, `black` and `transparent`.
pub fn parse_color(text: &str) -> Result<Color> {
    parse_color_opt(text).ok_or_else(|| RenderError::InvalidColor {
        value: text.to_string(),
    })
}

fn parse_color_opt(text: &str) -> Option<Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    if let Some(body) = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(body);
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => Some(Color::from_rgba8(
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            255,
        )),
        4 => Some(Color::from_rgba8(
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            hex1(bytes[3])?,
        )),
        6 => Some(Color::from_rgba8(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            255,
        )),
        8 => Some(Color::from_rgba8(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            hex2(&bytes[6..8])?,
        )),
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Color> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<u8>().ok();
    match parts.as_slice() {
        [r, g, b] => Some(Color::from_rgba8(channel(r)?, channel(g)?, channel(b)?, 255)),
        [r, g, b, a] => {
            let a = a.parse::<f32>().ok().filter(|a| (0.0..=1.0).contains(a))?;
            Color::from_rgba(
                f32::from(channel(r)?) / 255.0,
                f32::from(channel(g)?) / 255.0,
                f32::from(channel(b)?) / 255.0,
                a,
            )
        }
        _ => None,
    }
}
