//! Local word-order transpositions.

use crate::perturb::chance;
use crate::tokenize::{detokenize, is_alpha_token, tokenize};
use rand::Rng;

/// Swaps adjacent alphabetic tokens with probability `prob`.
///
/// The scan advances past both tokens after a swap, so no token takes part in
/// two swaps.
#[derive(Debug, Clone)]
pub struct SwapOrderPerturbation {
    pub name: String,
    pub prob: f64,
}

impl SwapOrderPerturbation {
    pub fn new(prob: f64) -> Self {
        Self {
            name: "swap_word_order".to_string(),
            prob,
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let original = tokenize(text);
        let mut tokens = original.clone();
        let mut i = 0;
        while i + 1 < tokens.len() {
            if is_alpha_token(&tokens[i]) && is_alpha_token(&tokens[i + 1]) && chance(rng, self.prob)
            {
                tokens.swap(i, i + 1);
                i += 2;
            } else {
                i += 1;
            }
        }
        if tokens == original {
            return text.to_string();
        }
        detokenize(&tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_certain_swap_pairs_without_overlap() {
        let p = SwapOrderPerturbation::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(p.apply("one two three four five", &mut rng), "two one four three five");
    }

    #[test]
    fn test_punctuation_blocks_swaps() {
        let p = SwapOrderPerturbation::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(p.apply("yes, no", &mut rng), "yes, no");
        assert_eq!(p.apply("a b, c d", &mut rng), "b a, d c");
    }

    #[test]
    fn test_numbers_are_not_swapped() {
        let p = SwapOrderPerturbation::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(p.apply("route 66 west", &mut rng), "route 66 west");
    }

    #[test]
    fn test_zero_probability_and_empty() {
        let p = SwapOrderPerturbation::new(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(p.apply("keep  this order", &mut rng), "keep  this order");
        assert_eq!(p.apply("", &mut rng), "");
    }
}
