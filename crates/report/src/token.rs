//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! This approximation is accurate within ~10% for BPE tokenizers on
//! English text and markup, which is enough for cost accounting.

use folio_core::SectionOperation;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for the content carried by a set of operations.
pub fn estimate_operations_tokens(operations: &[SectionOperation]) -> usize {
    operations.iter().map(|op| estimate_tokens(&op.content)).sum()
}

/// Estimated cost of one enhancement: the prompt plus everything it generated.
pub fn estimate_enhancement_cost(prompt: &str, operations: &[SectionOperation]) -> u64 {
    (estimate_tokens(prompt) + estimate_operations_tokens(operations)) as u64
}
