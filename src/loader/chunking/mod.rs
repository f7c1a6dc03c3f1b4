//! Per-source splitting policy.
//!
//! Each source kind has a fixed granularity: one unit per tabular record, one
//! per extracted page, one per blank-line separated paragraph.


use itertools::Itertools;

/// Join the fields of one record into a single unit.
///
/// Returns `None` when every field is blank.
#[inline]
pub fn record_to_unit<'a, I>(fields: I, separator: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let fields: Vec<&str> = fields.into_iter().collect();
    if fields.iter().all(|field| field.trim().is_empty()) {
        return None;
    }
    Some(fields.iter().join(separator))
}

/// Keep a page only when extraction produced visible text
#[inline]
pub fn page_to_unit(page: &str) -> Option<String> {
    let trimmed = page.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(page.to_string())
    }
}

/// Split plain text on blank lines, dropping empty paragraphs
#[inline]
pub fn split_paragraphs(content: &str) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter(|paragraph| !paragraph.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Bounded display prefix: the first `max_chars` characters plus `...`
#[inline]
pub fn snippet(text: &str, max_chars: usize) -> String {
    let mut prefix: String = text.chars().take(max_chars).collect();
    prefix.push_str("...");
    prefix
}
