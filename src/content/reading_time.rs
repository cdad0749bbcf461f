//! Reading-time estimation

use super::ContentBlock;
use crate::richtext;

/// Assumed reading speed
pub const WORDS_PER_MINUTE: f64 = 200.0;

/// Count whitespace-delimited words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes
///
/// The running total is rounded up after every block, so each block with
/// any words adds at least one minute. Rendered pages depend on this exact
/// accumulation; do not replace it with a single division at the end.
pub fn estimate(content: &[ContentBlock]) -> u32 {
    let minutes = content.iter().fold(0.0_f64, |acc, block| {
        let heading = count_words(&block.heading) as f64 / WORDS_PER_MINUTE;
        let body = count_words(&richtext::as_text(&block.body)) as f64 / WORDS_PER_MINUTE;
        (acc + heading + body).ceil()
    });
    minutes.ceil() as u32
}
