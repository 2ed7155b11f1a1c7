// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Overlapping windowed text splitter.
//!
//! Pure function over characters (not bytes), so multi-byte text never
//! splits inside a code point. Emitted chunks are trimmed, blank windows
//! are dropped, and ordinals densely number the emitted chunks from 0.

/// Splitter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters.
    pub chunk_overlap: usize,
    /// Upper bound on emitted chunks; 0 means unlimited.
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 700,
            chunk_overlap: 80,
            max_chunks: 0,
        }
    }
}

/// One emitted window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// Dense index of the emitted chunk, starting at 0.
    pub ordinal: usize,
}

/// Splits `text` into overlapping windows.
///
/// Windows start at `0, step, 2*step, ...` with
/// `step = chunk_size - chunk_overlap` (falling back to `chunk_size`
/// when the overlap is not smaller than the window). The last window is
/// truncated at end of text.
pub fn split_text(cfg: &ChunkerConfig, text: &str) -> Vec<TextChunk> {
    if cfg.chunk_size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = if cfg.chunk_overlap >= cfg.chunk_size {
        cfg.chunk_size
    } else {
        cfg.chunk_size - cfg.chunk_overlap
    };

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + cfg.chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();

        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                ordinal: chunks.len(),
            });
            if cfg.max_chunks > 0 && chunks.len() >= cfg.max_chunks {
                break;
            }
        }

        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(size: usize, overlap: usize, max: usize) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            max_chunks: max,
        }
    }

    #[test]
    fn alphabet_with_overlap() {
        let chunks = split_text(&cfg(10, 2, 0), "abcdefghijklmnopqrstuvwxyz");
        let expected = [("abcdefghij", 0), ("ijklmnopqr", 1), ("qrstuvwxyz", 2)];
        assert_eq!(chunks.len(), expected.len());
        for (chunk, (text, ordinal)) in chunks.iter().zip(expected) {
            assert_eq!(chunk.text, text);
            assert_eq!(chunk.ordinal, ordinal);
        }
    }

    #[test]
    fn is_deterministic() {
        let config = cfg(10, 2, 0);
        let a = split_text(&config, "abcdefghijklmnopqrstuvwxyz");
        let b = split_text(&config, "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(a, b);
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(split_text(&cfg(5, 0, 0), "").is_empty());
        assert!(split_text(&cfg(5, 0, 0), "   \n\t  ").is_empty());
    }

    #[test]
    fn zero_chunk_size_yields_nothing() {
        assert!(split_text(&cfg(0, 0, 0), "some text").is_empty());
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let chunks = split_text(&cfg(100, 10, 0), "  short  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short");
        assert_eq!(chunks[0].ordinal, 0);
    }

    #[test]
    fn overlap_ge_size_falls_back_to_full_step() {
        // step would be <= 0; falls back to chunk_size so the loop advances.
        let chunks = split_text(&cfg(4, 4, 0), "abcdefgh");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[1].text, "efgh");
    }

    #[test]
    fn max_chunks_stops_early() {
        let chunks = split_text(&cfg(3, 0, 2), "abcdefghij");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "abc");
        assert_eq!(chunks[1].text, "def");
    }

    #[test]
    fn ordinals_are_dense_when_blank_windows_are_skipped() {
        // Middle window is all whitespace and is dropped; ordinals still
        // pack densely over emitted chunks.
        let text = "aaaa        bbbb";
        let chunks = split_text(&cfg(4, 0, 0), text);
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..chunks.len()).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
    }

    #[test]
    fn multibyte_text_splits_on_characters() {
        let text = "привет мир это тест";
        let chunks = split_text(&cfg(6, 2, 0), text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            // Each chunk is a substring of the trimmed input.
            assert!(text.contains(chunk.text.trim()));
            assert!(chunk.text.chars().count() <= 6);
        }
    }

    #[test]
    fn chunks_are_substrings_of_input() {
        let text = "The quick brown fox jumps over the lazy dog and keeps going.";
        for chunk in split_text(&cfg(12, 4, 0), text) {
            assert!(text.contains(&chunk.text), "not a substring: {:?}", chunk.text);
        }
    }

    #[test]
    fn non_overlapping_windows_reconstruct_input() {
        // With zero overlap and no window trimming losses, concatenating
        // the windows rebuilds the trimmed input.
        let text = "abcdefghijklmnop";
        let chunks = split_text(&cfg(4, 0, 0), text);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }
}
