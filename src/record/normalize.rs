//! Text normalization used for comparison.
//!
//! Two forms exist:
//! - [`normalize_text`]: lowercased, punctuation stripped, whitespace
//!   collapsed. Diacritics are kept. Used for duplicate detection.
//! - [`fold_tokens`]: additionally folds IAST diacritics to ASCII and
//!   collapses the `sh`/`ch` digraphs, so `Śani`, `Shani` and `sani` all
//!   produce the token `sani`. Used for lexicon lookups only.
//!
//! Neither form is ever written back to a record.

/// Lowercases, strips punctuation and collapses whitespace.
///
/// Punctuation is removed without inserting a space (`don't` becomes
/// `dont`), matching how the generators' own dedup normalized text.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if !is_word_char(ch) {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }

    out
}

/// Counts whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits text into diacritic-folded lowercase tokens for lexicon matching.
pub fn fold_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars().flat_map(char::to_lowercase) {
        if is_combining_mark(ch) {
            continue;
        }
        if !is_word_char(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        let folded = fold_char(ch);
        // sh -> s, ch -> c
        if folded == 'h' && (current.ends_with('s') || current.ends_with('c')) {
            continue;
        }
        current.push(folded);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || is_combining_mark(ch) || is_devanagari_letter(ch)
}

fn is_combining_mark(ch: char) -> bool {
    matches!(
        ch,
        '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' | '\u{1DC0}'..='\u{1DFF}'
    )
}

// Devanagari signs (virama, matras) are not all alphanumeric; dandas are
// sentence punctuation and stay excluded.
fn is_devanagari_letter(ch: char) -> bool {
    matches!(ch, '\u{0900}'..='\u{0963}' | '\u{0966}'..='\u{097F}')
}

fn fold_char(ch: char) -> char {
    match ch {
        'ā' | 'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'ī' | 'í' | 'ì' | 'î' | 'ï' => 'i',
        'ū' | 'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ē' | 'é' | 'è' | 'ê' | 'ë' => 'e',
        'ō' | 'ó' | 'ò' | 'ô' | 'ö' => 'o',
        'ṛ' | 'ṝ' | 'ṟ' => 'r',
        'ḷ' | 'ḹ' => 'l',
        'ṃ' | 'ṁ' => 'm',
        'ḥ' => 'h',
        'ṅ' | 'ñ' | 'ṇ' => 'n',
        'ṭ' => 't',
        'ḍ' => 'd',
        'ś' | 'ṣ' => 's',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips_punctuation() {
        assert_eq!(
            normalize_text("  What is   the Lagna?!  "),
            "what is the lagna"
        );
        assert_eq!(normalize_text("don't"), "dont");
        assert_eq!(normalize_text("a - b"), "a b");
    }

    #[test]
    fn test_normalize_keeps_diacritics() {
        assert_eq!(normalize_text("Śani in the 7th Bhāva."), "śani in the 7th bhāva");
    }

    #[test]
    fn test_normalize_keeps_decomposed_marks() {
        // "a" followed by combining macron
        let decomposed = "Ra\u{0304}hu";
        assert_eq!(normalize_text(decomposed), "ra\u{0304}hu");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("?!..."), "");
    }

    #[test]
    fn test_fold_tokens_equates_transliterations() {
        assert_eq!(fold_tokens("Śani"), vec!["sani"]);
        assert_eq!(fold_tokens("Shani"), vec!["sani"]);
        assert_eq!(fold_tokens("sani"), vec!["sani"]);
        assert_eq!(fold_tokens("Chandra"), fold_tokens("Candra"));
    }

    #[test]
    fn test_fold_tokens_splits_on_punctuation() {
        assert_eq!(
            fold_tokens("Rāhu, Ketu; daśā."),
            vec!["rahu", "ketu", "dasa"]
        );
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one two  three\nfour"), 4);
        assert_eq!(word_count("   "), 0);
    }
}
