//! Paragraph-aware text chunking.
//!
//! [`chunk`] splits raw text into segments of roughly `target_tokens` each,
//! estimating tokens at [`CHARS_PER_TOKEN`] characters apiece. Paragraphs are
//! packed greedily; each new chunk is seeded with the tail of the previous one
//! (see [`overlap_tail`]). A paragraph too large on its own is split by
//! sentence, then by word, then by a hard character cut.
//!
//! Every chunk is a contiguous slice of the input, so with zero overlap the
//! chunks concatenate back to the original text. A seeded chunk may exceed
//! the target by at most the overlap.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("valid paragraph regex"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]["')\]]*\s+"#).expect("valid sentence regex"));

static WORD_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid word regex"));

/// Rough token count: characters / 4, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Split `text` into owned chunks. Empty or whitespace-only input yields none.
pub fn chunk(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    chunk_slices(text, target_tokens, overlap_tokens)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Same as [`chunk`], borrowing from the input.
pub fn chunk_slices(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let target = target_tokens.max(1);

    let mut chunks = Vec::new();
    let mut buffer: Option<Range<usize>> = None;

    for span in paragraph_spans(text) {
        let paragraph = &text[span.clone()];

        if estimate_tokens(paragraph.trim_end()) > target {
            if let Some(b) = buffer.take() {
                chunks.push(&text[b]);
            }
            chunks.extend(split_oversized(paragraph, target, Level::Sentence));
            continue;
        }

        buffer = Some(match buffer {
            None => span,
            Some(b) if estimate_tokens(text[b.start..span.end].trim_end()) <= target => {
                b.start..span.end
            }
            Some(b) => {
                let emitted = &text[b.clone()];
                chunks.push(emitted);
                let seed = overlap_tail(emitted, overlap_tokens);
                (b.end - seed.len())..span.end
            }
        });
    }

    if let Some(b) = buffer {
        chunks.push(&text[b]);
    }
    chunks
}

/// The trailing slice of `chunk` carried into the next chunk.
///
/// Takes the last `overlap_tokens * 4` characters, moves forward to the first
/// word boundary if one falls in the first half of that window, and drops
/// leading whitespace. A chunk shorter than the window is used whole. The
/// result is always a suffix of `chunk`.
pub fn overlap_tail(chunk: &str, overlap_tokens: usize) -> &str {
    if overlap_tokens == 0 {
        return &chunk[chunk.len()..];
    }
    let window = overlap_tokens * CHARS_PER_TOKEN;
    let char_count = chunk.chars().count();
    if char_count <= window {
        return chunk.trim_start();
    }

    let start = chunk
        .char_indices()
        .nth(char_count - window)
        .map_or(0, |(i, _)| i);
    let mut tail = &chunk[start..];
    if let Some(pos) = tail.find(char::is_whitespace) {
        if pos < tail.len() / 2 {
            tail = &tail[pos..];
        }
    }
    tail.trim_start()
}

/// Paragraph ranges, each including its trailing blank-line separator.
/// Whitespace-only leading ranges are folded into the next paragraph.
fn paragraph_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;

    for m in PARAGRAPH_BREAK.find_iter(text) {
        if text[start..m.start()].trim().is_empty() {
            continue;
        }
        spans.push(start..m.end());
        start = m.end();
    }
    if start < text.len() {
        if text[start..].trim().is_empty() {
            if let Some(last) = spans.last_mut() {
                last.end = text.len();
            }
        } else {
            spans.push(start..text.len());
        }
    }
    spans
}

#[derive(Clone, Copy)]
enum Level {
    Sentence,
    Word,
    Char,
}

impl Level {
    fn finer(self) -> Self {
        match self {
            Self::Sentence => Self::Word,
            Self::Word | Self::Char => Self::Char,
        }
    }
}

fn split_oversized(text: &str, target: usize, level: Level) -> Vec<&str> {
    let segments = match level {
        Level::Sentence => split_after(text, &SENTENCE_END),
        Level::Word => split_after(text, &WORD_BREAK),
        Level::Char => return hard_split(text, target * CHARS_PER_TOKEN),
    };

    let mut out = Vec::new();
    let mut current: Option<Range<usize>> = None;
    let mut offset = 0;

    for segment in segments {
        let seg = offset..offset + segment.len();
        offset = seg.end;

        if estimate_tokens(segment.trim_end()) > target {
            if let Some(c) = current.take() {
                out.push(&text[c]);
            }
            out.extend(split_oversized(segment, target, level.finer()));
            continue;
        }

        current = Some(match current {
            None => seg,
            Some(c) if estimate_tokens(text[c.start..seg.end].trim_end()) <= target => {
                c.start..seg.end
            }
            Some(c) => {
                out.push(&text[c]);
                seg
            }
        });
    }

    if let Some(c) = current {
        out.push(&text[c]);
    }
    out
}

/// Segments ending right after each match of `re`, plus the remainder.
fn split_after<'a>(text: &'a str, re: &Regex) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for m in re.find_iter(text) {
        if m.end() > start {
            segments.push(&text[start..m.end()]);
            start = m.end();
        }
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

fn hard_split(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == max_chars {
            pieces.push(&text[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(n: usize, words: usize) -> String {
        (0..n)
            .map(|p| {
                (0..words)
                    .map(|w| format!("word{p}x{w}"))
                    .collect::<Vec<_>>()
                    .join(" ")
                    + "."
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", 100, 10).is_empty());
        assert!(chunk("  \n\n\t \n", 100, 10).is_empty());
    }

    #[test]
    fn small_input_is_one_chunk() {
        let text = "Embabel is a JVM agent framework.";
        assert_eq!(chunk(text, 512, 64), vec![text.to_string()]);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn zero_overlap_reconstructs_input() {
        let text = paragraphs(12, 30);
        let chunks = chunk_slices(&text, 60, 0);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
        for c in &chunks {
            assert!(estimate_tokens(c.trim_end()) <= 60, "chunk too large: {c:?}");
        }
    }

    #[test]
    fn overlap_tail_prefixes_next_chunk() {
        let text = paragraphs(10, 20);
        let chunks = chunk_slices(&text, 50, 8);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail = overlap_tail(pair[0], 8);
            assert!(!tail.is_empty());
            assert!(
                pair[1].starts_with(tail),
                "{:?} does not start with {:?}",
                pair[1],
                tail
            );
        }
    }

    #[test]
    fn overlap_tail_snaps_to_word_boundary() {
        let chunk = "alpha beta gamma delta";
        // window is the last 8 chars: "ma delta"; the space at index 2 is in the first half
        assert_eq!(overlap_tail(chunk, 2), "delta");
        assert_eq!(overlap_tail("tiny", 5), "tiny");
        assert_eq!(overlap_tail(chunk, 0), "");
    }

    #[test]
    fn oversized_paragraph_splits_by_sentence() {
        let sentence = "This sentence has exactly enough words to matter. ";
        let text = sentence.repeat(20);
        let chunks = chunk_slices(&text, 30, 0);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
        for c in &chunks {
            assert!(estimate_tokens(c.trim_end()) <= 30);
            assert!(c.trim_end().ends_with('.'), "split mid-sentence: {c:?}");
        }
    }

    #[test]
    fn unbroken_text_is_hard_split() {
        let text = "x".repeat(1000);
        let chunks = chunk_slices(&text, 10, 0);
        assert_eq!(chunks.len(), 25);
        assert!(chunks.iter().all(|c| c.len() == 40));
    }

    #[test]
    fn multibyte_text_stays_on_char_boundaries() {
        let text = "é".repeat(301);
        let chunks = chunk_slices(&text, 25, 0);
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn leading_blank_lines_are_kept_with_first_paragraph() {
        let text = "\n\n\nFirst paragraph.\n\nSecond paragraph.";
        let chunks = chunk_slices(text, 512, 0);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn more_input_never_means_fewer_chunks() {
        let mut last = 0;
        for n in 1..15 {
            let count = chunk(&paragraphs(n, 25), 80, 10).len();
            assert!(count >= last);
            last = count;
        }
    }
}
