//! Field-name normalization
//!
//! Template field names and answer identifiers come from different sources
//! and disagree on spelling: parenthesized PDF names, mixed case, "checkbox"
//! vs "check box", and bare digits standing in for "Text Field N". Both
//! sides of a comparison are pushed through [`normalize`] before matching.

/// Canonicalize a raw field label into a comparison key.
///
/// Rules, in order: strip surrounding parentheses and whitespace, lowercase,
/// rewrite "checkbox" to "check box", and — only when the caller flags the
/// field as a digit-named text field — prefix bare digits with "text field ".
/// Idempotent for a fixed flag value.
pub fn normalize(raw: &str, is_numeric_text_field: bool) -> String {
    // Whitespace and parentheses are stripped as one class; stripping them
    // in separate passes would leave inputs like "a) )" unstable.
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '(' || c == ')');
    let mut key = trimmed.to_lowercase().replace("checkbox", "check box");

    if is_numeric_text_field && !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        key = format!("text field {}", key);
    }

    key
}
