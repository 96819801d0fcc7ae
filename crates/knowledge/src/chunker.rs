//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping segments of at most `chunk_size` bytes.
///
/// Chunk ends prefer the last whitespace inside the window, and the next chunk
/// starts `overlap` bytes before the previous end, moved forward to a word
/// start. All cuts fall on UTF-8 character boundaries.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.trim().is_empty() || chunk_size == 0 {
        return vec![];
    }

    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let len = text.len();
    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < len {
        let mut end = floor_char_boundary(text, (start + chunk_size).min(len));

        if end < len {
            // Prefer to cut between words
            if let Some(ws) = text[start..end].rfind(char::is_whitespace) {
                if ws > 0 {
                    end = start + ws;
                }
            }
        }

        if end <= start {
            end = ceil_char_boundary(text, start + 1);
        }

        let chunk = text[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position,
                text: chunk.to_string(),
                metadata: serde_json::json!({
                    "start": start,
                    "end": end,
                }),
            });
            position += 1;
        }

        if end >= len {
            break;
        }

        let mut next = ceil_char_boundary(text, end.saturating_sub(overlap).max(start + 1));
        if next < end && !text[..next].ends_with(char::is_whitespace) {
            next = match text[next..end]
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
            {
                Some((i, ws)) => next + i + ws.len_utf8(),
                None => end,
            };
        }
        start = next;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}
