//! Greedy, grapheme-safe line breaking over segment sequences.
//!
//! Words are maximal runs of non-whitespace segments (emoji included) and are never split unless
//! a single word is wider than the line on its own. Such words are hard split at grapheme cluster
//! boundaries; an emoji segment is always one indivisible unit.

use crate::metrics::MetricsProvider;
use crate::segment::{Segment, Sequence};
use unicode_segmentation::UnicodeSegmentation;

/// Tolerance applied to every width and height comparison in the layout core.
pub const WIDTH_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Space(String),
    Word(Sequence),
}

/// Splits a sequence into paragraphs (on `\n`) of alternating whitespace/word tokens.
fn tokenize(seq: &Sequence) -> Vec<Vec<Token>> {
    let mut paragraphs: Vec<Vec<Token>> = Vec::new();
    let mut tokens: Vec<Token> = Vec::new();

    for segment in seq {
        match segment {
            Segment::Emoji(_) => push_word_piece(&mut tokens, segment.clone()),
            Segment::Text(text) => {
                for (piece, is_space) in split_whitespace_runs(text) {
                    if !is_space {
                        push_word_piece(&mut tokens, Segment::text(piece));
                        continue;
                    }
                    let mut rest = piece;
                    while let Some(nl) = rest.find('\n') {
                        push_space(&mut tokens, &rest[..nl]);
                        paragraphs.push(std::mem::take(&mut tokens));
                        rest = &rest[nl + 1..];
                    }
                    push_space(&mut tokens, rest);
                }
            }
        }
    }
    paragraphs.push(tokens);
    paragraphs
}

fn push_word_piece(tokens: &mut Vec<Token>, piece: Segment) {
    if let Some(Token::Word(word)) = tokens.last_mut() {
        word.push(piece);
    } else {
        tokens.push(Token::Word(Sequence::from_iter([piece])));
    }
}

fn push_space(tokens: &mut Vec<Token>, space: &str) {
    if space.is_empty() {
        return;
    }
    match tokens.last_mut() {
        Some(Token::Space(s)) => s.push_str(space),
        _ => tokens.push(Token::Space(space.to_string())),
    }
}

/// Splits text into alternating whitespace / non-whitespace runs.
fn split_whitespace_runs(text: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                out.push((&text[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if let Some(prev) = in_space {
        out.push((&text[start..], prev));
    }
    out
}

/// Indivisible units of a word: grapheme clusters of its text, whole emoji segments.
fn word_units(word: &Sequence) -> Vec<Segment> {
    let mut units = Vec::new();
    for segment in word {
        match segment {
            Segment::Text(text) => {
                units.extend(text.graphemes(true).map(Segment::text));
            }
            Segment::Emoji(_) => units.push(segment.clone()),
        }
    }
    units
}

struct LineBuilder<'a> {
    metrics: &'a dyn MetricsProvider,
    max_width: f64,
    font_size: f64,
    lines: Vec<Sequence>,
    cur: Sequence,
}

impl LineBuilder<'_> {
    fn fits(&self, seq: &Sequence) -> bool {
        self.metrics.sequence_width(seq, self.font_size) <= self.max_width + WIDTH_EPSILON
    }

    fn flush(&mut self) {
        let mut line = std::mem::take(&mut self.cur);
        line.trim_end();
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    fn place_word(&mut self, word: Sequence) {
        debug_assert!(self.cur.is_empty());
        if self.fits(&word) {
            self.cur = word;
            return;
        }

        // The word is wider than a whole line: emit grapheme-safe chunks, keep the remainder
        // as the open line so following words can join it.
        let mut chunk = Sequence::new();
        for unit in word_units(&word) {
            let mut candidate = chunk.clone();
            candidate.push(unit.clone());
            if !chunk.is_empty() && !self.fits(&candidate) {
                self.lines.push(std::mem::take(&mut chunk));
                chunk.push(unit);
            } else {
                chunk = candidate;
            }
        }
        tracing::trace!(
            word = %word.text(),
            lines = self.lines.len(),
            "hard split overlong word"
        );
        self.cur = chunk;
    }

    fn push_word(&mut self, pending_space: &str, word: Sequence) {
        if self.cur.is_empty() {
            self.place_word(word);
            return;
        }

        let mut candidate = self.cur.clone();
        candidate.push_str(pending_space);
        candidate.extend_from(&word);
        if self.fits(&candidate) {
            self.cur = candidate;
        } else {
            self.flush();
            self.place_word(word);
        }
    }
}

/// Wraps `seq` into lines no wider than `max_width` at `font_size`.
///
/// - whitespace between words on one line is kept verbatim, whitespace at a break is dropped
/// - `\n` forces a break; empty paragraphs between content become empty lines
/// - the only line allowed to exceed `max_width` is one holding a single indivisible unit
/// - a zero `max_width` puts every unit on its own line; NaN, infinite or negative widths disable
///   wrapping
pub fn wrap_sequence(
    seq: &Sequence,
    max_width: f64,
    font_size: f64,
    metrics: &dyn MetricsProvider,
) -> Vec<Sequence> {
    let wrap = max_width.is_finite() && max_width >= 0.0;
    let mut lines: Vec<Sequence> = Vec::new();

    for paragraph in tokenize(seq) {
        let mut builder = LineBuilder {
            metrics,
            max_width: if wrap { max_width } else { f64::INFINITY },
            font_size,
            lines: Vec::new(),
            cur: Sequence::new(),
        };
        let mut pending_space = String::new();
        for token in paragraph {
            match token {
                Token::Space(space) => {
                    if !builder.cur.is_empty() {
                        pending_space.push_str(&space);
                    }
                }
                Token::Word(word) => {
                    builder.push_word(&pending_space, word);
                    pending_space.clear();
                }
            }
        }
        builder.flush();

        if builder.lines.is_empty() {
            lines.push(Sequence::new());
        } else {
            lines.extend(builder.lines);
        }
    }

    while lines.last().is_some_and(Sequence::is_empty) {
        lines.pop();
    }
    let leading_empty = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading_empty);

    tracing::trace!(lines = lines.len(), max_width, font_size, "wrapped caption");
    lines
}
