//! Regional vocabulary swaps (US to UK terms by default).

use crate::tokenize::{detokenize, tokenize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_CULTURAL_MAP: &[(&str, &str)] = &[
    ("soccer", "football"),
    ("fries", "chips"),
    ("chips", "crisps"),
    ("apartment", "flat"),
    ("truck", "lorry"),
    ("elevator", "lift"),
    ("candy", "sweets"),
    ("costco", "tesco"),
    ("walmart", "asda"),
    ("starbucks", "costa"),
];

/// Whole-token, case-insensitive vocabulary substitution. Deterministic.
#[derive(Debug, Clone)]
pub struct CulturalShiftPerturbation {
    pub name: String,
    mapping: HashMap<String, String>,
}

impl Default for CulturalShiftPerturbation {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_CULTURAL_MAP.iter().copied())
    }
}

impl CulturalShiftPerturbation {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mapping = pairs
            .into_iter()
            .map(|(from, to)| (from.to_lowercase(), to.to_string()))
            .collect();
        Self {
            name: "cultural_shift".to_string(),
            mapping,
        }
    }

    pub fn from_table(table: &BTreeMap<String, String>) -> Self {
        Self::from_pairs(table.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn apply(&self, text: &str) -> String {
        if self.mapping.is_empty() {
            return text.to_string();
        }
        let tokens = tokenize(text);
        let mut changed = false;
        let new_tokens: Vec<String> = tokens
            .iter()
            .map(|tok| match self.mapping.get(&tok.to_lowercase()) {
                Some(repl) => {
                    changed = true;
                    if tok.chars().next().is_some_and(char::is_uppercase) {
                        capitalize(repl)
                    } else {
                        repl.clone()
                    }
                }
                None => tok.clone(),
            })
            .collect();
        if !changed {
            return text.to_string();
        }
        detokenize(&new_tokens)
    }
}

/// Uppercase the first character and lowercase the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
