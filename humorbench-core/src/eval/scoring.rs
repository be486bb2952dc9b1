//! Pass@k scoring.
//!
//! A scoring unit is one joke for task 1 and one joke line for task 2. A unit
//! is correct at k when any of its first k normalized predictions equals the
//! normalized truth. Slots beyond the available completions count as `NA`.

use crate::dataset::split_lines;
use crate::eval::confusion::ConfusionMatrix;
use crate::eval::labels::{LabelNormalizer, NA_LABEL, Task};
use crate::eval::metrics::{ObservationMode, TaskMetrics, accuracy, macro_auc_ovr, macro_f1};
use crate::eval::transcript::Answer;

/// One truth and the raw prediction of every run, in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringUnit {
    pub truth: String,
    pub predictions: Vec<Option<String>>,
}

/// Expand questions into scoring units.
///
/// `truths[q]` is the raw ground-truth cell of question `q` (a category for
/// task 1, `\n`-joined roles for task 2) and `answers[q]` its per-run answers.
/// Task 2 units follow the truth's lines; surplus predicted lines are ignored
/// and missing ones are `None`.
pub fn build_units<S: AsRef<str>>(task: Task, truths: &[S], answers: &[Vec<Answer>]) -> Vec<ScoringUnit> {
    let mut units = Vec::new();
    for (q, truth) in truths.iter().enumerate() {
        let runs = answers.get(q).map(Vec::as_slice).unwrap_or(&[]);
        let lines = match task {
            Task::Classification => vec![truth.as_ref()],
            Task::LineRoles => split_lines(truth.as_ref()),
        };
        for (line, truth_line) in lines.into_iter().enumerate() {
            units.push(ScoringUnit {
                truth: truth_line.to_string(),
                predictions: runs
                    .iter()
                    .map(|a| a.prediction(task, line).map(str::to_string))
                    .collect(),
            });
        }
    }
    units
}

/// Outcome of scoring every unit at one k.
#[derive(Debug, Clone)]
pub struct PassAtK {
    pub k: usize,
    pub correct: usize,
    pub total: usize,
    /// (truth, prediction) pairs feeding F1 and AUC.
    pub observations: Vec<(String, String)>,
    pub confusion: ConfusionMatrix,
}

impl PassAtK {
    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct, self.total)
    }

    pub fn metrics(&self) -> TaskMetrics {
        TaskMetrics {
            k: self.k,
            correct: self.correct,
            total: self.total,
            accuracy: self.accuracy(),
            macro_f1: macro_f1(&self.observations),
            macro_auc: macro_auc_ovr(&self.observations),
        }
    }
}

/// Score units at `k`. The confusion matrix always receives every examined
/// slot; `mode` only decides which pairs feed F1 and AUC.
pub fn score_pass_at_k(
    units: &[ScoringUnit],
    k: usize,
    normalizer: &LabelNormalizer,
    mode: ObservationMode,
) -> PassAtK {
    let mut confusion = ConfusionMatrix::new(normalizer.task().vocabulary());
    let mut observations = Vec::with_capacity(units.len() * k.max(1));
    let mut correct = 0;

    for unit in units {
        let truth = normalizer.normalize(&unit.truth);
        let slots: Vec<String> = (0..k)
            .map(|slot| match unit.predictions.get(slot) {
                Some(Some(raw)) => normalizer.normalize(raw),
                _ => NA_LABEL.to_string(),
            })
            .collect();

        for pred in &slots {
            confusion.record(&truth, pred);
        }
        let hit = slots.iter().position(|pred| *pred == truth);
        if hit.is_some() {
            correct += 1;
        }

        match mode {
            ObservationMode::PerSlot => {
                observations.extend(slots.iter().map(|pred| (truth.clone(), pred.clone())));
            }
            ObservationMode::PerUnit => {
                if let Some(pred) = slots.get(hit.unwrap_or(0)) {
                    observations.push((truth.clone(), pred.clone()));
                }
            }
        }
    }

    PassAtK {
        k,
        correct,
        total: units.len(),
        observations,
        confusion,
    }
}
