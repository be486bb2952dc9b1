//! Multilingual lexical database backing synonym substitution.
//!
//! The database is a JSON document keyed by language code, then by lowercase
//! surface form, holding a list of synsets; each synset is a list of lemma
//! names. Multi-word lemmas use underscores (`ice_cream`).
//!
//! ```json
//! { "eng": { "car": [["car", "auto", "automobile"], ["car", "railcar"]] } }
//! ```

use crate::error::HumorError;
use std::collections::HashMap;
use std::path::Path;

type Synsets = Vec<Vec<String>>;

/// In-memory lexical database.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    languages: HashMap<String, HashMap<String, Synsets>>,
}

impl Lexicon {
    /// Load a lexicon from a JSON file.
    pub fn load(path: &Path) -> Result<Self, HumorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HumorError::lexicon(format!("Failed to read {}: {e}", path.display()))
        })?;
        let lexicon = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            languages = lexicon.languages.len(),
            "Loaded lexical database"
        );
        Ok(lexicon)
    }

    /// Load a lexicon from a JSON file, returning `None` when it is missing or
    /// unreadable so that synonym substitution degrades to a no-op.
    pub fn try_load(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(lexicon) => Some(lexicon),
            Err(e) => {
                tracing::warn!(error = %e, "Lexical database unavailable, synonyms disabled");
                None
            }
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, HumorError> {
        let raw: HashMap<String, HashMap<String, Synsets>> = serde_json::from_str(content)
            .map_err(|e| HumorError::lexicon(format!("Malformed lexicon: {e}")))?;
        let languages = raw
            .into_iter()
            .map(|(lang, words)| {
                let words = words
                    .into_iter()
                    .map(|(word, synsets)| (word.to_lowercase(), synsets))
                    .collect();
                (lang, words)
            })
            .collect();
        Ok(Self { languages })
    }

    /// Add a synset for `word` in `lang`.
    pub fn insert_synset(&mut self, lang: &str, word: &str, lemmas: &[&str]) {
        self.languages
            .entry(lang.to_string())
            .or_default()
            .entry(word.to_lowercase())
            .or_default()
            .push(lemmas.iter().map(|l| l.to_string()).collect());
    }

    /// Whether any entries exist for `lang`.
    pub fn supports(&self, lang: &str) -> bool {
        self.languages.get(lang).is_some_and(|words| !words.is_empty())
    }

    /// Synsets for `word` in `lang`, case-insensitively. Empty when unknown.
    pub fn synsets(&self, lang: &str, word: &str) -> &[Vec<String>] {
        self.languages
            .get(lang)
            .and_then(|words| words.get(&word.to_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_lowercases_keys() {
        let lex = Lexicon::from_json_str(r#"{"eng": {"Car": [["car", "auto"]]}}"#).unwrap();
        assert!(lex.supports("eng"));
        assert!(!lex.supports("spa"));
        assert_eq!(lex.synsets("eng", "CAR").len(), 1);
        assert!(lex.synsets("eng", "bike").is_empty());
    }

    #[test]
    fn test_malformed_json_is_lexicon_error() {
        let err = Lexicon::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, HumorError::Lexicon(_)));
    }

    #[test]
    fn test_try_load_missing_file() {
        assert!(Lexicon::try_load(Path::new("/nonexistent/lexicon.json")).is_none());
    }

    #[test]
    fn test_insert_synset() {
        let mut lex = Lexicon::default();
        lex.insert_synset("spa", "coche", &["coche", "auto", "carro"]);
        assert_eq!(lex.synsets("spa", "Coche")[0], vec!["coche", "auto", "carro"]);
    }
}
