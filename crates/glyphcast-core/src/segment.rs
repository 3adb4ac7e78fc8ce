//! Caption segmentation into text runs and emoji.

pub mod emoji;

use crate::config::CaptionConfig;
use crate::error::EncodingError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

pub const DEFAULT_EMOJI_ASSET_BASE: &str =
    "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/72x72/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    Text,
    Emoji,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emoji {
    /// The literal emoji sequence as it appeared in the caption.
    pub display: String,
    /// Remote image for the emoji, if the parser was configured with an asset base.
    pub asset_ref: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Segment {
    Text(String),
    Emoji(Emoji),
}

impl Segment {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn emoji(display: impl Into<String>, asset_ref: Option<Url>) -> Self {
        Self::Emoji(Emoji {
            display: display.into(),
            asset_ref,
        })
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Text(_) => SegmentKind::Text,
            Self::Emoji(_) => SegmentKind::Emoji,
        }
    }

    pub fn display(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Emoji(e) => &e.display,
        }
    }

    pub fn asset_ref(&self) -> Option<&Url> {
        match self {
            Self::Text(_) => None,
            Self::Emoji(e) => e.asset_ref.as_ref(),
        }
    }
}

/// An ordered run of segments: a whole caption, or one wrapped line of it.
///
/// Building through [`Sequence::push`] keeps the sequence canonical: empty text is skipped and
/// adjacent text segments are merged, so two `Text` segments are never neighbours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(Vec<Segment>);

impl Sequence {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, segment: Segment) {
        match segment {
            Segment::Text(s) => self.push_str(&s),
            emoji @ Segment::Emoji(_) => self.0.push(emoji),
        }
    }

    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = self.0.last_mut() {
            last.push_str(text);
        } else {
            self.0.push(Segment::Text(text.to_string()));
        }
    }

    pub fn extend_from(&mut self, other: &Sequence) {
        for segment in other.iter() {
            self.push(segment.clone());
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenated `display` text of every segment.
    pub fn text(&self) -> String {
        self.0.iter().map(Segment::display).collect()
    }

    pub fn emoji_count(&self) -> usize {
        self.0
            .iter()
            .filter(|s| s.kind() == SegmentKind::Emoji)
            .count()
    }

    /// Removes trailing whitespace from the final text segment (dropping it if it empties).
    pub fn trim_end(&mut self) {
        while let Some(Segment::Text(last)) = self.0.last_mut() {
            let trimmed_len = last.trim_end().len();
            if trimmed_len == last.len() {
                return;
            }
            last.truncate(trimmed_len);
            if last.is_empty() {
                self.0.pop();
            } else {
                return;
            }
        }
    }

    /// Removes the last grapheme cluster (a whole emoji counts as one). Returns `false` when the
    /// sequence was already empty.
    pub fn pop_cluster(&mut self) -> bool {
        let Some(last) = self.0.last_mut() else {
            return false;
        };
        match last {
            Segment::Emoji(_) => {
                self.0.pop();
            }
            Segment::Text(s) => {
                let cut = s
                    .grapheme_indices(true)
                    .next_back()
                    .map(|(idx, _)| idx)
                    .unwrap_or(0);
                s.truncate(cut);
                if s.is_empty() {
                    self.0.pop();
                }
            }
        }
        true
    }
}

impl FromIterator<Segment> for Sequence {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut out = Sequence::new();
        for segment in iter {
            out.push(segment);
        }
        out
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Sequence {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Normalizes `\r\n` and lone `\r` to `\n`. Borrowed when there is nothing to rewrite.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Splits captions into [`Sequence`]s of text runs and emoji.
#[derive(Debug, Clone)]
pub struct SegmentParser {
    asset_base: Option<Url>,
}

impl Default for SegmentParser {
    fn default() -> Self {
        Self {
            asset_base: Url::parse(DEFAULT_EMOJI_ASSET_BASE).ok(),
        }
    }
}

impl SegmentParser {
    pub fn new(asset_base: Url) -> Self {
        Self {
            asset_base: Some(with_trailing_slash(asset_base)),
        }
    }

    /// A parser that detects emoji but attaches no asset references.
    pub fn without_assets() -> Self {
        Self { asset_base: None }
    }

    /// Reads `emoji.assetBase`; an unparsable base falls back to the default CDN.
    pub fn from_config(config: &CaptionConfig) -> Self {
        match config.get_str("emoji.assetBase").map(Url::parse) {
            Some(Ok(base)) => Self::new(base),
            Some(Err(err)) => {
                tracing::warn!(%err, "invalid emoji.assetBase; using the default asset CDN");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn asset_base(&self) -> Option<&Url> {
        self.asset_base.as_ref()
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Sequence, EncodingError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(self.parse(text))
    }

    pub fn parse(&self, text: &str) -> Sequence {
        let text = normalize_line_endings(text);
        let mut out = Sequence::new();
        for cluster in text.graphemes(true) {
            if emoji::is_emoji_cluster(cluster) {
                out.push(Segment::emoji(cluster, self.asset_url(cluster)));
            } else {
                out.push_str(cluster);
            }
        }
        if out.emoji_count() > 0 {
            tracing::debug!(emoji = out.emoji_count(), "caption contains emoji");
        }
        out
    }

    pub fn asset_url(&self, cluster: &str) -> Option<Url> {
        let base = self.asset_base.as_ref()?;
        let name = emoji::twemoji_asset_name(cluster);
        match base.join(&format!("{name}.png")) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(%err, name = %name, "failed to build emoji asset URL");
                None
            }
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Removes `#hashtag` words, collapses whitespace and trims. Emoji and other text are kept.
pub fn strip_hashtags(text: &str) -> String {
    fn is_tag_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || ('\u{00C0}'..='\u{017F}').contains(&c)
    }

    let mut stripped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '#' && chars.peek().is_some_and(|n| is_tag_char(*n)) {
            while chars.peek().is_some_and(|n| is_tag_char(*n)) {
                chars.next();
            }
            continue;
        }
        stripped.push(c);
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
