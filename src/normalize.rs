use unicode_normalization::UnicodeNormalization;

/// Lowercases and strips diacritics.
pub fn normalize_text(input: &str) -> String {
    // NFD splits accented letters into base + combining mark; drop the marks.
    input
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Folded name tokens: punctuation other than `&` splits words, empty
/// tokens are dropped. `&` is kept since "J & M" and "J M" are different names.
pub fn name_tokens(name: &str) -> Vec<String> {
    normalize_text(name)
        .split(|c: char| !c.is_alphanumeric() && c != '&')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical form of a business identifier: whitespace and hyphens removed.
/// Both sides of an identifier comparison go through this.
pub fn normalize_identifier(id: &str) -> String {
    id.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

/// Like [`normalize_identifier`], but an empty result means "no identifier".
pub fn identifier_key(id: Option<&str>) -> Option<String> {
    id.map(normalize_identifier).filter(|s| !s.is_empty())
}

pub fn normalize_postcode(postcode: &str) -> &str {
    postcode.trim()
}
