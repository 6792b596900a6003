//! Domain vocabulary used for relevance checks.
//!
//! A [`Lexicon`] maps surface forms (`Śani`, `Shani`, `Saturn`) to a
//! canonical term (`shani`). Lookups run on diacritic-folded tokens, so a
//! text matches a term regardless of case or transliteration style. Simple
//! English plurals (`houses`, `grahas`) match their singular entries.
//!
//! The lexicon is built once and never mutated while the engine runs; it is
//! `Send + Sync` and can be shared between evaluators.

mod builtin;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::LexiconError;
use crate::record::fold_tokens;

/// One canonical term with its accepted surface forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    /// Canonical name reported for matches.
    pub canonical: String,
    /// Surface forms, including the canonical spelling.
    pub forms: Vec<String>,
}

/// Lexicon file item: either a bare term or a term with its variants.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LexiconItem {
    Term(String),
    Entry {
        canonical: String,
        #[serde(default)]
        forms: Vec<String>,
    },
}

/// Read-only domain vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
    /// Folded single-token form -> index into `entries`.
    single: HashMap<String, usize>,
    /// Folded multi-token forms, matched as contiguous token windows.
    phrases: Vec<(Vec<String>, usize)>,
}

impl Lexicon {
    /// Creates an empty lexicon.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the built-in Vedic astrology vocabulary.
    pub fn builtin() -> Self {
        let mut lexicon = Self::new();
        for (canonical, forms) in builtin::TERMS {
            lexicon
                .add_term(canonical, forms.iter().copied())
                .expect("Invalid built-in lexicon term");
        }
        lexicon
    }

    /// Adds a canonical term with its surface forms.
    ///
    /// The canonical spelling is always registered as a form of itself.
    /// When two entries claim the same folded form, the first one wins.
    ///
    /// # Errors
    ///
    /// Returns `LexiconError::EmptyTerm` if the canonical term or any form
    /// folds to nothing.
    pub fn add_term<'a>(
        &mut self,
        canonical: &str,
        forms: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), LexiconError> {
        let canonical = canonical.trim();
        if fold_tokens(canonical).is_empty() {
            return Err(LexiconError::EmptyTerm(canonical.to_string()));
        }

        let index = self.entries.len();
        let mut entry = LexiconEntry {
            canonical: canonical.to_lowercase(),
            forms: vec![canonical.to_string()],
        };

        for form in forms {
            let form = form.trim();
            if fold_tokens(form).is_empty() {
                return Err(LexiconError::EmptyTerm(form.to_string()));
            }
            if !entry.forms.iter().any(|f| f == form) {
                entry.forms.push(form.to_string());
            }
        }

        for form in &entry.forms {
            let tokens = fold_tokens(form);
            if tokens.len() == 1 {
                self.single
                    .entry(tokens.into_iter().next().unwrap_or_default())
                    .or_insert(index);
            } else if !self.phrases.iter().any(|(existing, _)| *existing == tokens) {
                self.phrases.push((tokens, index));
            }
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Builder-style variant of [`Lexicon::add_term`].
    pub fn with_term<'a>(
        mut self,
        canonical: &str,
        forms: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, LexiconError> {
        self.add_term(canonical, forms)?;
        Ok(self)
    }

    /// Parses a lexicon from YAML: a list of bare terms or
    /// `{canonical, forms}` entries.
    pub fn from_yaml_str(input: &str) -> Result<Self, LexiconError> {
        let items: Vec<LexiconItem> = serde_yaml::from_str(input)?;
        Self::from_items(items)
    }

    /// Parses a lexicon from JSON with the same shape as the YAML format.
    pub fn from_json_str(input: &str) -> Result<Self, LexiconError> {
        let items: Vec<LexiconItem> = serde_json::from_str(input)?;
        Self::from_items(items)
    }

    /// Loads a lexicon file, choosing the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let content = std::fs::read_to_string(path)?;

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            other => Err(LexiconError::UnsupportedFormat(other.to_string())),
        }
    }

    fn from_items(items: Vec<LexiconItem>) -> Result<Self, LexiconError> {
        let mut lexicon = Self::new();
        for item in items {
            match item {
                LexiconItem::Term(term) => lexicon.add_term(&term, std::iter::empty())?,
                LexiconItem::Entry { canonical, forms } => {
                    lexicon.add_term(&canonical, forms.iter().map(String::as_str))?
                }
            }
        }
        Ok(lexicon)
    }

    /// Number of canonical terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the lexicon has no terms.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all entries in insertion order.
    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Resolves a single surface form to its canonical term.
    pub fn canonical_of(&self, surface: &str) -> Option<&str> {
        let tokens = fold_tokens(surface);
        match tokens.as_slice() {
            [token] => self
                .lookup_token(token)
                .map(|index| self.entries[index].canonical.as_str()),
            [] => None,
            _ => self
                .phrases
                .iter()
                .find(|(phrase, _)| *phrase == tokens)
                .map(|(_, index)| self.entries[*index].canonical.as_str()),
        }
    }

    /// Returns the canonical term of every occurrence found in `text`, in
    /// reading order. Repeated occurrences are reported repeatedly.
    pub fn find_terms(&self, text: &str) -> Vec<&str> {
        let tokens = fold_tokens(text);
        let mut found = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if let Some((len, index)) = self.match_at(&tokens, i) {
                found.push(self.entries[index].canonical.as_str());
                i += len;
            } else {
                i += 1;
            }
        }

        found
    }

    /// Returns true if `text` mentions at least one lexicon term.
    pub fn contains_term(&self, text: &str) -> bool {
        let tokens = fold_tokens(text);
        (0..tokens.len()).any(|i| self.match_at(&tokens, i).is_some())
    }

    /// Longest match starting at `start`: (tokens consumed, entry index).
    fn match_at(&self, tokens: &[String], start: usize) -> Option<(usize, usize)> {
        let phrase = self
            .phrases
            .iter()
            .filter(|(phrase, _)| {
                let end = start + phrase.len();
                end <= tokens.len()
                    && phrase[..phrase.len() - 1] == tokens[start..end - 1]
                    && token_matches(&tokens[end - 1], &phrase[phrase.len() - 1])
            })
            .max_by_key(|(phrase, _)| phrase.len())
            .map(|(phrase, index)| (phrase.len(), *index));

        phrase.or_else(|| self.lookup_token(&tokens[start]).map(|index| (1, index)))
    }

    fn lookup_token(&self, token: &str) -> Option<usize> {
        if let Some(index) = self.single.get(token) {
            return Some(*index);
        }
        plural_stems(token).find_map(|stem| self.single.get(stem).copied())
    }
}

fn token_matches(token: &str, key: &str) -> bool {
    token == key || plural_stems(token).any(|stem| stem == key)
}

/// Candidate singular stems of a token: `-s` and `-es` stripped.
fn plural_stems(token: &str) -> impl Iterator<Item = &str> {
    let s = token
        .strip_suffix('s')
        .filter(|stem| stem.chars().count() >= 3);
    let es = token
        .strip_suffix("es")
        .filter(|stem| stem.chars().count() >= 3);
    s.into_iter().chain(es)
}
