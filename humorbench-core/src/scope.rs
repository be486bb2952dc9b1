//! Line-scoped application of perturbations.

use crate::dataset::{LINE_SEP, split_lines};
use crate::perturb::Perturbation;
use rand::Rng;

/// Role whose lines are perturbed by default.
pub const DEFAULT_TARGET_ROLE: &str = "punchline";

/// Applies an inner perturbation only to the joke lines whose aligned task 2
/// label equals `target_role`.
///
/// Joke lines beyond the last label pass through untouched; labels beyond the
/// last joke line are ignored. The output always has as many lines as the
/// input joke.
#[derive(Debug, Clone)]
pub struct PunchlineOnly<'a> {
    inner: &'a Perturbation,
    target_role: String,
}

impl<'a> PunchlineOnly<'a> {
    pub fn new(inner: &'a Perturbation) -> Self {
        Self::for_role(inner, DEFAULT_TARGET_ROLE)
    }

    pub fn for_role(inner: &'a Perturbation, target_role: impl Into<String>) -> Self {
        Self {
            inner,
            target_role: target_role.into(),
        }
    }

    pub fn apply_to_joke<R: Rng + ?Sized>(
        &self,
        full_joke_text: &str,
        task2_label_text: &str,
        rng: &mut R,
    ) -> String {
        let joke_lines = split_lines(full_joke_text);
        let label_lines = split_lines(task2_label_text);

        let out: Vec<String> = joke_lines
            .iter()
            .enumerate()
            .map(|(i, line)| match label_lines.get(i) {
                Some(label) if label.trim() == self.target_role => self.inner.apply(line, rng),
                _ => line.to_string(),
            })
            .collect();

        out.join(LINE_SEP)
    }
}
