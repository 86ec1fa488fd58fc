use crate::domain::{SENTINEL_TOKEN, SplitOutput};

/// Splits captured output at the first literal sentinel. Without a sentinel
/// the whole text is primary and the trailing segment is empty.
pub fn split_output(raw: &str) -> SplitOutput {
    match raw.split_once(SENTINEL_TOKEN) {
        Some((primary, trailing)) => SplitOutput {
            primary: primary.to_string(),
            trailing: trailing.to_string(),
        },
        None => SplitOutput {
            primary: raw.to_string(),
            trailing: String::new(),
        },
    }
}
