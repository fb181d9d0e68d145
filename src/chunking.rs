//! Chunking utilities for splitting long documents into overlapping segments.
//!
//! Windows of `chunk_size` characters are cut from the text, snapping each
//! boundary backward to the nearest natural break (paragraph break, newline,
//! or sentence end) when one exists late enough in the window. Consecutive
//! chunks share `overlap` characters of context so that sentences straddling
//! a boundary stay retrievable.
//!
//! All window arithmetic happens in char coordinates and is mapped to byte
//! offsets only for slicing, so multi-byte UTF-8 input is safe.

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A bounded substring of a source document.
///
/// Offsets are char positions into the trimmed source text, start inclusive
/// and end exclusive, recorded for provenance before the chunk content is
/// itself trimmed.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    /// Zero-based chunk index within the document.
    pub chunk_index: usize,
    pub char_start: usize,
    pub char_end: usize,
}

/// Split text into overlapping chunks with natural-break detection.
///
/// For a window that does not reach the end of the document, the boundary is
/// snapped backward to the nearest break strictly after `start + overlap`,
/// preferring a blank-line paragraph break, then a single newline, then
/// sentence-ending punctuation (`. `, `? `, `! `); if none qualifies the hard
/// `chunk_size` boundary is used. The next window starts `overlap` characters
/// before the previous end, so progress is always monotonic. Empty or
/// whitespace-only chunks are discarded.
///
/// `overlap` is clamped below `chunk_size`; text shorter than `chunk_size`
/// yields a single chunk equal to the trimmed input.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size - 1);

    // Char index -> byte index, with one trailing entry for the text end.
    let char_to_byte: Vec<usize> = text
        .char_indices()
        .map(|(byte_idx, _)| byte_idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = char_to_byte.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chunk_index = 0;

    while start < char_count {
        let mut end = (start + chunk_size).min(char_count);

        if end < char_count
            && let Some(break_point) =
                find_break(text, &char_to_byte, start + overlap, end)
        {
            end = break_point;
        }

        let content = text[char_to_byte[start]..char_to_byte[end]].trim();
        if !content.is_empty() {
            chunks.push(Chunk {
                content: content.to_string(),
                chunk_index,
                char_start: start,
                char_end: end,
            });
            chunk_index += 1;
        }

        start = if end < char_count { end - overlap } else { char_count };
    }

    chunks
}

/// Find the best natural break in `(floor, end]`, as a char index to cut at.
///
/// Breaks at or before `floor` are rejected so the next window always moves
/// forward past the overlap region.
fn find_break(
    text: &str,
    char_to_byte: &[usize],
    floor: usize,
    end: usize,
) -> Option<usize> {
    let region_start = char_to_byte[floor];
    let region = &text[region_start..char_to_byte[end]];
    let to_char = |byte_in_region: usize| {
        let byte = region_start + byte_in_region;
        char_to_byte.partition_point(|&b| b < byte)
    };

    // Paragraph break: cut before the blank line.
    if let Some(pos) = region.rfind("\n\n") {
        let break_point = to_char(pos);
        if break_point > floor {
            return Some(break_point);
        }
    }

    // Single newline.
    if let Some(pos) = region.rfind('\n') {
        let break_point = to_char(pos);
        if break_point > floor {
            return Some(break_point);
        }
    }

    // Sentence end: cut after the punctuation mark.
    for punct in [". ", "? ", "! "] {
        if let Some(pos) = region.rfind(punct) {
            let punct_char = to_char(pos);
            if punct_char > floor {
                return Some(punct_char + 1);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_single_chunk() {
        let chunks =
            chunk_text("  Hello, world!  ", DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].char_start, 0);
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   \n\t  ", 1000, 200).is_empty());
    }

    #[test]
    fn no_breaks_matches_count_formula() {
        // L=2500, C=1000, O=200 with no natural breaks:
        // ceil((L-O)/(C-O)) = ceil(2300/800) = 3 chunks.
        let text = "a".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks.last().unwrap().char_end, 2500);

        for pair in chunks.windows(2) {
            let shared = pair[0].char_end - pair[1].char_start;
            assert!(shared >= 200, "adjacent chunks must overlap");
        }
    }

    #[test]
    fn sentence_text_snaps_at_sentence_ends() {
        // 25 sentences of 100 chars each ('.' at offset 98 of every
        // sentence, final sentence unpadded). With C=1000, O=200 each
        // boundary snaps back to a sentence end and the 2500-char document
        // yields 4 chunks with exactly 200 chars shared.
        let sentence = format!("{}. ", "a".repeat(98));
        let text = format!("{}{}.", sentence.repeat(24), "a".repeat(99));
        assert_eq!(text.len(), 2500);
        let chunks = chunk_text(&text, 1000, 200);

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!(chunk.content.ends_with('.'));
        }
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].char_end - pair[1].char_start, 200);
        }
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks.last().unwrap().char_end, 2500);
    }

    #[test]
    fn prefers_paragraph_break_over_newline() {
        let mut text = "a".repeat(400);
        text.push_str("\n\n");
        text.push_str(&"b".repeat(300));
        text.push('\n');
        text.push_str(&"c".repeat(600));

        let chunks = chunk_text(&text, 1000, 100);
        // First boundary snaps to the paragraph break at 400, not the
        // later single newline.
        assert_eq!(chunks[0].char_end, 400);
        assert_eq!(chunks[0].content, "a".repeat(400));
    }

    #[test]
    fn breaks_inside_overlap_region_are_rejected() {
        // The only newline sits before start+overlap, so the hard boundary
        // is used instead.
        let mut text = "a".repeat(50);
        text.push('\n');
        text.push_str(&"b".repeat(1500));

        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks[0].char_end, 1000);
    }

    #[test]
    fn progress_is_monotonic() {
        let mut text = String::new();
        for _ in 0..60 {
            text.push_str(&"x".repeat(40));
            text.push('\n');
        }

        let chunks = chunk_text(&text, 200, 50);
        assert!(!chunks.is_empty());
        for pair in chunks.windows(2) {
            assert!(pair[1].char_start > pair[0].char_start);
            assert!(pair[1].char_end > pair[0].char_end);
        }
        assert_eq!(chunks.last().unwrap().char_end, text.trim().chars().count());
    }

    #[test]
    fn handles_multibyte_chars() {
        let text = "café ☕ naïve 日本語 🎉 ".repeat(60);
        let chunks = chunk_text(&text, 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.content.is_empty());
            assert!(chunk.content.chars().count() <= 100);
        }
    }

    #[test]
    fn oversized_overlap_is_clamped() {
        let text = "a".repeat(500);
        let chunks = chunk_text(&text, 100, 100);
        assert!(!chunks.is_empty());
        for pair in chunks.windows(2) {
            assert!(pair[1].char_start > pair[0].char_start);
        }
    }
}
