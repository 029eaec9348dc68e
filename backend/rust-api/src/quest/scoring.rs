//! Percentage scoring for the two quest kinds.
//!
//! Both scorers are pure and total. An exercise with nothing to match
//! (empty snippet, template without blanks) scores 100.

/// Number of leading characters of `typed` that match `target` exactly.
pub fn correct_prefix_len(target: &str, typed: &str) -> usize {
    target
        .chars()
        .zip(typed.chars())
        .take_while(|(expected, actual)| expected == actual)
        .count()
}

/// Typing score: `floor(100 * correct_prefix / len(target))`.
///
/// Characters typed after the first mismatch never earn credit, even if
/// they happen to line up with the target again.
pub fn score_typing(target: &str, typed: &str) -> u8 {
    let total = target.chars().count();
    if total == 0 {
        return 100;
    }
    percentage(correct_prefix_len(target, typed), total)
}

/// Fill-in-the-blank score: `floor(100 * matches / slots)`.
///
/// Slot `i` matches when `provided[i]`, trimmed of surrounding whitespace,
/// equals `expected[i]`. Missing answers count as wrong; surplus answers are
/// ignored.
pub fn score_fill_blank<E, P>(expected: &[E], provided: &[P]) -> u8
where
    E: AsRef<str>,
    P: AsRef<str>,
{
    if expected.is_empty() {
        return 100;
    }
    let matches = expected
        .iter()
        .enumerate()
        .filter(|(slot, want)| {
            provided
                .get(*slot)
                .is_some_and(|got| got.as_ref().trim() == want.as_ref())
        })
        .count();
    percentage(matches, expected.len())
}

fn percentage(part: usize, total: usize) -> u8 {
    let pct = (part.min(total) * 100) / total;
    pct as u8
}
