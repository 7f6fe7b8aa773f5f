//! Sliding-window corpus chunker.
//!
//! Splits the corpus document into fixed-size character windows with a fixed
//! overlap between neighbors, preferring to cut at a whitespace boundary near
//! the end of each window. Chunks cover the corpus with no gaps; the overlap
//! is validated to be smaller than the chunk size at config load.

/// A contiguous span of corpus text used as a retrieval unit.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the chunk sequence, contiguous from 0.
    pub index: usize,
    /// Character offset of the span's start within the corpus.
    pub offset: usize,
    pub text: String,
}

/// Split corpus text into overlapping chunks of at most `chunk_size`
/// characters, each sharing `overlap` characters with its predecessor.
///
/// Returns an empty vector for empty or whitespace-only input; the
/// orchestrator treats zero chunks as an initialization failure.
pub fn split_corpus(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    debug_assert!(overlap < chunk_size);

    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = 0;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        // Cut at whitespace within the last fifth of the window when
        // possible, so words are not split mid-token.
        if end < len {
            let floor = end - (chunk_size / 5).min(end - start - 1);
            if let Some(pos) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = pos + 1;
            }
        }

        chunks.push(Chunk {
            index,
            offset: start,
            text: chars[start..end].iter().collect(),
        });

        if end >= len {
            break;
        }
        index += 1;
        // Step back by the overlap; always make forward progress.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}
