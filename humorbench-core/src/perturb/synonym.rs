//! Lexical-database synonym substitution.

use crate::perturb::chance;
use crate::perturb::lexicon::Lexicon;
use crate::tokenize::{detokenize, is_alpha_token, tokenize};
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Replaces alphabetic tokens with a synonym drawn from a [`Lexicon`].
///
/// Whether the lexicon can serve `lang` is decided once at construction. A
/// disabled instance is the identity transform and draws nothing from the
/// generator.
#[derive(Debug, Clone)]
pub struct SynonymPerturbation {
    pub name: String,
    pub prob: f64,
    pub lang: String,
    lexicon: Option<Arc<Lexicon>>,
}

impl SynonymPerturbation {
    pub fn new(prob: f64, lang: impl Into<String>, lexicon: Option<Arc<Lexicon>>) -> Self {
        let lang = lang.into();
        let lexicon = lexicon.filter(|lex| {
            let supported = lex.supports(&lang);
            if !supported {
                tracing::warn!(lang = %lang, "Lexicon has no entries for language, synonyms disabled");
            }
            supported
        });
        Self {
            name: "synonyms".to_string(),
            prob,
            lang,
            lexicon,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lexicon.is_some()
    }

    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let Some(lexicon) = &self.lexicon else {
            return text.to_string();
        };
        let tokens = tokenize(text);
        let new_tokens: Vec<String> = tokens
            .iter()
            .map(|tok| {
                if is_alpha_token(tok) && chance(rng, self.prob) {
                    self.synonym_for(lexicon, tok, rng)
                } else {
                    tok.clone()
                }
            })
            .collect();
        if new_tokens == tokens {
            return text.to_string();
        }
        detokenize(&new_tokens)
    }

    /// Pick a random synset, then a random lemma that differs from `word`.
    fn synonym_for<R: Rng + ?Sized>(&self, lexicon: &Lexicon, word: &str, rng: &mut R) -> String {
        let Some(synset) = lexicon.synsets(&self.lang, word).choose(rng) else {
            return word.to_string();
        };
        let lowered = word.to_lowercase();
        let candidates: Vec<String> = synset
            .iter()
            .map(|lemma| lemma.replace('_', " "))
            .filter(|cand| cand.to_lowercase() != lowered)
            .collect();
        candidates
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| word.to_string())
    }
}
