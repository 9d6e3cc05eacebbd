//! Accent- and case-insensitive name keys.
//!
//! Source datasets spell the same place in several ways ("Cataluña",
//! "CATALUNA", "Comunidad (ES51) Cataluña"). Everything that compares names
//! goes through `normalize` first so those comparisons are pure codepoint
//! operations, with no locale-specific collation.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lowercase, decompose (NFD) and drop combining marks.
///
/// `None` yields an empty string, which the resolver treats as "no match".
/// Idempotent: `normalize(Some(&normalize(x))) == normalize(x)`.
pub fn normalize(text: Option<&str>) -> String {
    text.map(normalize_str).unwrap_or_default()
}

/// `normalize` for a present string.
pub fn normalize_str(text: &str) -> String {
    // Lowercasing first: some lowercase mappings emit combining marks
    // (U+0130 -> "i\u{307}"), which the mark filter then removes.
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Normalized key with punctuation folded to single spaces.
///
/// "Castilla-La Mancha", "Castilla La Mancha" and " castilla  la mancha "
/// all map to `"castilla la mancha"`. Used for alias-table keys.
pub fn squash(text: &str) -> String {
    let normalized = normalize_str(text);
    let mut out = String::with_capacity(normalized.len());
    let mut pending_space = false;
    for ch in normalized.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Codes written in parentheses, e.g. `"Comunidad (ES51) Cataluña"` -> `["ES51"]`.
///
/// Only alphanumeric/underscore tokens of 2..=10 characters qualify, so
/// ordinary parenthetical words like "(Comunidad de)" are ignored unless
/// they look like a code (contain a digit or are all uppercase).
pub fn parenthetical_codes(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else { break };
        let token = after[..close].trim();
        let len = token.chars().count();
        let code_like = (2..=10).contains(&len)
            && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && (token.chars().any(|c| c.is_ascii_digit()) || token.chars().all(|c| !c.is_ascii_lowercase()));
        if code_like {
            out.push(token.to_ascii_uppercase());
        }
        rest = &after[close + 1..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accents_and_case_fold_together() {
        assert_eq!(normalize(Some("Cataluña")), normalize(Some("CATALUNA")));
        assert_eq!(normalize(Some("Castilla y León")), "castilla y leon");
        assert_eq!(normalize(Some("Región de Murcia")), "region de murcia");
    }

    #[test]
    fn absent_input_is_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
    }

    #[test]
    fn dotted_capital_i_is_stable() {
        let once = normalize(Some("İstanbul"));
        assert_eq!(once, "istanbul");
        assert_eq!(normalize(Some(&once)), once);
    }

    #[test]
    fn squash_folds_punctuation() {
        assert_eq!(squash("Castilla-La Mancha"), "castilla la mancha");
        assert_eq!(squash("  Madrid, Comunidad de "), "madrid comunidad de");
    }

    #[test]
    fn parenthetical_codes_picks_code_like_tokens() {
        assert_eq!(parenthetical_codes("Comunidad (ES51) Cataluña"), vec!["ES51"]);
        assert_eq!(parenthetical_codes("Madrid (Comunidad de)"), Vec::<String>::new());
        assert_eq!(parenthetical_codes("Euro area (EA20)"), vec!["EA20"]);
        assert!(parenthetical_codes("unbalanced (ES51").is_empty());
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,24}") {
            let once = normalize_str(&s);
            prop_assert_eq!(normalize_str(&once), once);
        }

        #[test]
        fn squash_is_idempotent(s in "\\PC{0,24}") {
            let once = squash(&s);
            prop_assert_eq!(squash(&once), once);
        }
    }
}
