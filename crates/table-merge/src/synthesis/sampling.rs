//! Bounded samples of large identifier sets for proposer input.

const SMALL_SET: usize = 100;
const MEDIUM_SET: usize = 1000;
const BASE_SAMPLE: usize = 20;
const MAX_SAMPLE: usize = 50;

const PLACEHOLDER_PREFIX: &str = "... other ";
const PLACEHOLDER_SUFFIX: &str = " element ...";

/// Number of identifiers to show a proposer for a set of `total` items.
///
/// Grows by one item per hundred beyond the first hundred, capped at 50.
pub fn sample_size(total: usize) -> usize {
    match total {
        n if n <= SMALL_SET => BASE_SAMPLE.min(n),
        n if n <= MEDIUM_SET => (BASE_SAMPLE + (n - SMALL_SET) / 100).min(MAX_SAMPLE),
        _ => MAX_SAMPLE,
    }
}

/// Take a prefix and a suffix of `items` around a placeholder noting how many
/// middle elements were left out. Returns `items` unchanged when it fits.
pub fn sample(items: &[String], size: usize) -> Vec<String> {
    if items.len() <= size {
        return items.to_vec();
    }

    let half = size / 2;
    let omitted = items.len() - 2 * half;

    let mut out = Vec::with_capacity(2 * half + 1);
    out.extend_from_slice(&items[..half]);
    out.push(format!("{}{}{}", PLACEHOLDER_PREFIX, omitted, PLACEHOLDER_SUFFIX));
    out.extend_from_slice(&items[items.len() - half..]);
    out
}

/// Check if a sample entry is the omitted-elements placeholder.
pub fn is_placeholder(entry: &str) -> bool {
    entry
        .strip_prefix(PLACEHOLDER_PREFIX)
        .and_then(|rest| rest.strip_suffix(PLACEHOLDER_SUFFIX))
        .map(|count| !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}
