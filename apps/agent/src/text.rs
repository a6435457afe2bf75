// Small string helpers shared by the tools.

/// True when `term` occurs in `text` with no letter or digit directly
/// before or after it. Both sides are expected to be lower-cased already.
pub fn contains_term(text: &str, term: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric();
    text.match_indices(term).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + term.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Cuts `s` to `max` characters and appends `...` when anything was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
