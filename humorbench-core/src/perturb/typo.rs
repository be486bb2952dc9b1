//! Character-level typo injection driven by a keyboard adjacency table.

use crate::perturb::chance;
use crate::tokenize::{detokenize, is_alpha_token, tokenize};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap};

/// Adjacent keys for a handful of frequent letters.
pub const DEFAULT_KEYBOARD_NEIGHBORS: &[(char, &str)] = &[
    ('a', "qws"),
    ('s', "awed"),
    ('d', "sfe"),
    ('e', "wsr"),
    ('o', "ip"),
    ('i', "uok"),
    ('n', "bhm"),
];

/// Keyboard adjacency table keyed by lowercase letter.
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    neighbors: HashMap<char, Vec<char>>,
}

impl Default for KeyboardMap {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_KEYBOARD_NEIGHBORS.iter().copied())
    }
}

impl KeyboardMap {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (char, &'a str)>) -> Self {
        let neighbors = pairs
            .into_iter()
            .map(|(key, keys)| (key, keys.chars().collect()))
            .collect();
        Self { neighbors }
    }

    /// Build from a config table such as `{ "a" = "qws" }`. Keys that are not
    /// exactly one character are ignored.
    pub fn from_table(table: &BTreeMap<String, String>) -> Self {
        let neighbors = table
            .iter()
            .filter_map(|(key, keys)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, keys.chars().collect())),
                    _ => None,
                }
            })
            .collect();
        Self { neighbors }
    }

    fn neighbors_of(&self, c: char) -> &[char] {
        c.to_lowercase()
            .next()
            .and_then(|lower| self.neighbors.get(&lower))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy)]
enum TypoOp {
    Delete,
    Substitute,
    Insert,
}

const TYPO_OPS: [TypoOp; 3] = [TypoOp::Delete, TypoOp::Substitute, TypoOp::Insert];

/// Corrupts alphabetic tokens with probability `word_prob`; inside a corrupted
/// token each character is hit with probability `char_prob`.
#[derive(Debug, Clone)]
pub struct TypoPerturbation {
    pub name: String,
    pub word_prob: f64,
    pub char_prob: f64,
    pub keyboard: KeyboardMap,
}

impl TypoPerturbation {
    pub fn new(word_prob: f64, char_prob: f64) -> Self {
        Self {
            name: "typos".to_string(),
            word_prob,
            char_prob,
            keyboard: KeyboardMap::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_keyboard(mut self, keyboard: KeyboardMap) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let tokens = tokenize(text);
        let new_tokens: Vec<String> = tokens
            .iter()
            .map(|tok| {
                if is_alpha_token(tok) && chance(rng, self.word_prob) {
                    self.corrupt(tok, rng)
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

    fn corrupt<R: Rng + ?Sized>(&self, word: &str, rng: &mut R) -> String {
        let mut out = String::with_capacity(word.len() + 2);
        for c in word.chars() {
            if !chance(rng, self.char_prob) {
                out.push(c);
                continue;
            }
            let op = TYPO_OPS[rng.gen_range(0..TYPO_OPS.len())];
            match op {
                TypoOp::Delete => {}
                TypoOp::Substitute => {
                    let replacement = self.keyboard.neighbors_of(c).choose(rng).copied();
                    out.push(replacement.unwrap_or(c));
                }
                TypoOp::Insert => {
                    out.push(c);
                    if let Some(extra) = self.keyboard.neighbors_of(c).choose(rng) {
                        out.push(*extra);
                    }
                }
            }
        }
        out
    }
}
