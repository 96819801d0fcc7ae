//! Context assembly for answer generation.

use crate::types::RetrievedPassage;

/// Separator placed between passages.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Concatenate passage contents in ranking order, separated by a blank line.
///
/// No deduplication and no truncation.
pub fn assemble_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}
