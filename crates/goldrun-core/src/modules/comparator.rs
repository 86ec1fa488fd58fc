//! Positional line diff between expected output and the primary segment.
//!
//! Line `i` of one side is compared with line `i` of the other; there is no
//! alignment, so an inserted or dropped line shows up as a discrepancy on
//! every following line. Only trailing whitespace is ignored.

use crate::domain::Discrepancy;

pub fn diff_lines(expected: &str, actual: &str) -> Vec<Discrepancy> {
    let expected_lines = split_lines(expected);
    let actual_lines = split_lines(actual);
    let line_count = expected_lines.len().max(actual_lines.len());

    let mut discrepancies = Vec::new();
    for index in 0..line_count {
        let expected_line = expected_lines.get(index).copied().unwrap_or("");
        let actual_line = actual_lines.get(index).copied().unwrap_or("");
        if expected_line.trim_end() == actual_line.trim_end() {
            continue;
        }
        discrepancies.push(Discrepancy::new(index + 1, expected_line, actual_line));
    }
    discrepancies
}

/// Splits on `\n`, `\r\n` and lone `\r`. A final unterminated line counts;
/// a final terminator does not start an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\n' => {
                lines.push(&text[start..index]);
                index += 1;
                start = index;
            }
            b'\r' => {
                lines.push(&text[start..index]);
                index += 1;
                if bytes.get(index) == Some(&b'\n') {
                    index += 1;
                }
                start = index;
            }
            _ => index += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Plain-text rendering used in failure reports: a `Line` header followed by
/// the expected (`-`) and actual (`+`) lines.
pub fn render_discrepancies(discrepancies: &[Discrepancy]) -> Vec<String> {
    discrepancies
        .iter()
        .flat_map(|discrepancy| {
            [
                format!("Line {:>4}", discrepancy.line_number),
                format!("- {}", discrepancy.expected),
                format!("+ {}", discrepancy.actual),
            ]
        })
        .collect()
}
