//! Canonical forms of free-text answers.
//!
//! `normalize` is the stored form (`ExpectedAnswer::answer_normalized`) and the
//! form submissions are compared in. `fold` is a stricter comparison key that is
//! only ever computed on the fly.

/// Characters stripped from both ends of a normalized answer
pub const EDGE_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\'', '-'];

/// Articles dropped by `fold` (English and German)
const ARTICLES: &[&str] = &[
    "the", "a", "an", "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem",
    "eines", "einer",
];

/// Normalize an answer: lowercase, trim, collapse whitespace, strip edge punctuation.
///
/// Stripping punctuation can expose new edge whitespace (`"paris !"`), so the
/// trim/strip pair runs until the text is stable. That keeps the function
/// idempotent for every input.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut current = collapse_whitespace(&lowered);

    loop {
        let stripped = current
            .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c))
            .to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Collapse runs of whitespace to a single ASCII space and trim the ends
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stricter comparison key: no punctuation, umlauts transliterated, articles
/// removed, words joined without spaces.
///
/// `"Der Übermensch!"` and `"uebermensch"` share the key `uebermensch`.
pub fn fold(text: &str) -> String {
    let normalized = normalize(text);

    let mut transliterated = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        match c {
            'ä' => transliterated.push_str("ae"),
            'ö' => transliterated.push_str("oe"),
            'ü' => transliterated.push_str("ue"),
            'ß' => transliterated.push_str("ss"),
            c if c.is_ascii_punctuation() => {}
            c => transliterated.push(c),
        }
    }

    transliterated
        .split_whitespace()
        .filter(|word| !ARTICLES.contains(word))
        .collect()
}
