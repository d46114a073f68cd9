//! Longest aligned span between a generated line and its reference quote.
//!
//! Two characters match when they are equal ignoring case, or when neither
//! is alphanumeric. The second rule lets a span run across differing
//! punctuation and spacing while letters and digits must still agree.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Half-open byte range into the generated text. Both ends fall on char
/// boundaries.
pub struct AlignmentSpan {
    pub start: usize,
    pub end: usize,
}

impl AlignmentSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

pub fn chars_match(left: char, right: char) -> bool {
    if !left.is_alphanumeric() && !right.is_alphanumeric() {
        return true;
    }
    left == right || left.to_lowercase().eq(right.to_lowercase())
}

/// Longest-common-substring of `generated` and `reference` under
/// [`chars_match`], reported as a span of `generated`.
///
/// Ties go to the match that ends earliest in `generated` (then in
/// `reference`). Returns `None` when no character pair matches. Runs in
/// O(n * m) time and O(m) memory over the char counts.
pub fn compute_alignment(generated: &str, reference: &str) -> Option<AlignmentSpan> {
    let generated_chars: Vec<(usize, char)> = generated.char_indices().collect();
    let reference_chars: Vec<char> = reference.chars().collect();
    if generated_chars.is_empty() || reference_chars.is_empty() {
        return None;
    }

    let mut previous = vec![0usize; reference_chars.len() + 1];
    let mut current = vec![0usize; reference_chars.len() + 1];
    let mut best_len = 0usize;
    let mut best_end = 0usize;

    for (row, &(_, left)) in generated_chars.iter().enumerate() {
        for (column, &right) in reference_chars.iter().enumerate() {
            current[column + 1] = if chars_match(left, right) {
                previous[column] + 1
            } else {
                0
            };
            if current[column + 1] > best_len {
                best_len = current[column + 1];
                best_end = row + 1;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    if best_len == 0 {
        return None;
    }

    let start = generated_chars[best_end - best_len].0;
    let end = generated_chars
        .get(best_end)
        .map_or(generated.len(), |&(offset, _)| offset);
    Some(AlignmentSpan { start, end })
}
