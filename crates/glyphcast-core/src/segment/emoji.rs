//! Emoji classification of grapheme clusters.
//!
//! A cluster is an emoji when the Twemoji set ships an asset for it, which covers presentation
//! sequences, keycaps, modifiers, ZWJ sequences and flags. Text-default Latin symbols (`©`, `#`,
//! digits) stay text unless a presentation selector or keycap promotes them, and VS15 always
//! forces text.

use twemoji_assets::svg::SvgTwemojiAsset;

const ZWJ: char = '\u{200D}';
const VS15: char = '\u{FE0E}';
const VS16: char = '\u{FE0F}';
const KEYCAP: char = '\u{20E3}';

fn has_twemoji_asset(cluster: &str) -> bool {
    if SvgTwemojiAsset::from_emoji(cluster).is_some() {
        return true;
    }
    // Sequences published without VS16 in the asset set.
    cluster.contains(VS16)
        && SvgTwemojiAsset::from_emoji(&cluster.replace(VS16, "")).is_some()
}

/// Returns `true` when the grapheme cluster should be drawn as an emoji image.
pub fn is_emoji_cluster(cluster: &str) -> bool {
    let mut chars = cluster.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if cluster.contains(VS15) {
        return false;
    }
    if u32::from(first) < 0x2000 && !(cluster.contains(VS16) || cluster.contains(KEYCAP)) {
        return false;
    }
    has_twemoji_asset(cluster)
}

/// Twemoji asset name for an emoji cluster: lowercase hex code points joined with `-`.
///
/// U+FE0F is dropped unless the sequence contains a ZWJ, matching the file names published in
/// the Twemoji asset tree (`2764.png`, but `1f469-200d-2764-fe0f-200d-1f468.png`).
pub fn twemoji_asset_name(cluster: &str) -> String {
    let keep_vs16 = cluster.contains(ZWJ);
    let mut out = String::with_capacity(cluster.len() * 3);
    for ch in cluster.chars() {
        if ch == VS16 && !keep_vs16 {
            continue;
        }
        if !out.is_empty() {
            out.push('-');
        }
        out.push_str(&format!("{:x}", ch as u32));
    }
    out
}
