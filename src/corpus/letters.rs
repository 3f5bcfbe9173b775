//! First-letter query normalization
//!
//! Lines carry a `first_letters` column: the first letter of every word, in
//! the ASCII Gurmukhi transliteration the corpus uses (`hhggm`) or in Gurmukhi
//! script. Queries are always normalized. The in-memory corpus normalizes the
//! stored letters too; SQLite compares the stored column as it is, so a
//! database is expected to hold plain first letters. Normalization:
//!
//! - nukta letters collapse to their base letter (`S` -> `s`, `ਸ਼` -> `ਸ`)
//! - the combining nukta sign is dropped
//! - ASCII letters are lower-cased
//!
//! `*` in a query stands for exactly one letter.

/// Single-letter wildcard token accepted in first-letter queries
pub const WILDCARD: char = '*';

/// Escape character used in generated `LIKE` patterns
pub const LIKE_ESCAPE: char = '\\';

const NUKTA: char = '\u{0A3C}';

/// Strip accents and case from a first-letter query or column value.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != NUKTA && !c.is_whitespace())
        .map(strip_accent)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn strip_accent(c: char) -> char {
    match c {
        // ASCII transliteration
        'S' => 's',
        '^' => 'K',
        'Z' => 'g',
        'z' => 'j',
        '&' => 'P',
        'L' => 'l',
        // Gurmukhi script, precomposed nukta forms
        '\u{0A36}' => '\u{0A38}',
        '\u{0A59}' => '\u{0A16}',
        '\u{0A5A}' => '\u{0A17}',
        '\u{0A5B}' => '\u{0A1C}',
        '\u{0A5E}' => '\u{0A2B}',
        '\u{0A33}' => '\u{0A32}',
        other => other,
    }
}

/// Escape `LIKE` metacharacters in user input.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `LIKE` pattern matching `letters` anywhere in a first-letters column.
///
/// `letters` must already be normalized. The wildcard becomes `_`, every
/// other metacharacter is escaped.
pub fn first_letter_pattern(letters: &str) -> String {
    let body: String = letters
        .split(WILDCARD)
        .map(escape_like)
        .collect::<Vec<_>>()
        .join("_");
    format!("%{}%", body)
}

/// `LIKE` pattern for a substring match on the line text.
pub fn full_word_pattern(words: &str) -> String {
    format!("%{}%", escape_like(words.trim()))
}

/// Whether the normalized `letters` (with wildcards) occur in `haystack`.
///
/// Used by in-memory corpora. Both sides are normalized here.
pub fn matches_first_letters(letters: &str, haystack: &str) -> bool {
    let needle: Vec<char> = normalize(letters).chars().collect();
    let hay: Vec<char> = normalize(haystack).chars().collect();

    if needle.is_empty() {
        return false;
    }
    if needle.len() > hay.len() {
        return false;
    }

    hay.windows(needle.len()).any(|window| {
        window
            .iter()
            .zip(&needle)
            .all(|(h, n)| *n == WILDCARD || h == n)
    })
}

/// Position of the match, used for ranking. Matches at the start of a line
/// rank before matches further in.
pub fn first_letter_offset(letters: &str, haystack: &str) -> Option<usize> {
    let needle: Vec<char> = normalize(letters).chars().collect();
    let hay: Vec<char> = normalize(haystack).chars().collect();

    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }

    hay.windows(needle.len()).position(|window| {
        window
            .iter()
            .zip(&needle)
            .all(|(h, n)| *n == WILDCARD || h == n)
    })
}
