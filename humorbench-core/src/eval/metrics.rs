//! Aggregate classification metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which (truth, prediction) pairs feed F1 and AUC at a given k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// Every examined slot of every unit: k observations per unit.
    #[default]
    PerSlot,
    /// One observation per unit: the first correct slot, else slot 0.
    PerUnit,
}

/// Metrics for one (task, k) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub k: usize,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub macro_auc: f64,
}

pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64
}

fn classes(observations: &[(String, String)]) -> BTreeSet<&str> {
    observations
        .iter()
        .flat_map(|(t, p)| [t.as_str(), p.as_str()])
        .collect()
}

/// Unweighted mean of per-class F1 over every label seen as truth or
/// prediction. A class with no true or predicted members scores 0.
pub fn macro_f1(observations: &[(String, String)]) -> f64 {
    let classes = classes(observations);
    if classes.is_empty() {
        return 0.0;
    }
    let total: f64 = classes
        .iter()
        .map(|&class| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (t, p) in observations {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                (2 * tp) as f64 / denom as f64
            }
        })
        .sum();
    total / classes.len() as f64
}

/// One-vs-rest macro ROC AUC with binarized predictions.
///
/// For hard 0/1 scores a class's AUC is `(1 + TPR - FPR) / 2`. Classes with
/// no positive or no negative truths have no defined AUC and are left out of
/// the mean; when none remain the result is 0.
pub fn macro_auc_ovr(observations: &[(String, String)]) -> f64 {
    let n = observations.len();
    let aucs: Vec<f64> = classes(observations)
        .into_iter()
        .filter_map(|class| {
            let positives = observations.iter().filter(|(t, _)| t == class).count();
            let negatives = n - positives;
            if positives == 0 || negatives == 0 {
                return None;
            }
            let tp = observations
                .iter()
                .filter(|(t, p)| t == class && p == class)
                .count();
            let fp = observations
                .iter()
                .filter(|(t, p)| t != class && p == class)
                .count();
            let tpr = tp as f64 / positives as f64;
            let fpr = fp as f64 / negatives as f64;
            Some((1.0 + tpr - fpr) / 2.0)
        })
        .collect();
    if aucs.is_empty() {
        return 0.0;
    }
    aucs.iter().sum::<f64>() / aucs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(t, p)| (t.to_string(), p.to_string()))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_accuracy() {
        assert!(close(accuracy(3, 4), 0.75));
        assert_eq!(accuracy(0, 0), 0.0);
    }

    #[test]
    fn test_perfect_predictions() {
        let o = obs(&[("a", "a"), ("b", "b"), ("a", "a")]);
        assert!(close(macro_f1(&o), 1.0));
        assert!(close(macro_auc_ovr(&o), 1.0));
    }

    #[test]
    fn test_flattened_slots() {
        // satire answered satire then irony x4; irony answered irony x5
        let mut pairs = vec![("satire", "satire")];
        pairs.extend([("satire", "irony"); 4]);
        pairs.extend([("irony", "irony"); 5]);
        let o = obs(&pairs);
        assert!(close(macro_f1(&o), 11.0 / 21.0));
        assert!(close(macro_auc_ovr(&o), 0.6));
    }

    #[test]
    fn test_prediction_only_class_counts_for_f1_not_auc() {
        let o = obs(&[("a", "a"), ("b", "c")]);
        // a: 1.0, b: 0.0, c: 0.0
        assert!(close(macro_f1(&o), 1.0 / 3.0));
        // a: (1 + 1 - 0) / 2, b: (1 + 0 - 0) / 2
        assert!(close(macro_auc_ovr(&o), 0.75));
    }

    #[test]
    fn test_single_truth_class_has_no_auc() {
        let o = obs(&[("a", "a"), ("a", "b")]);
        assert_eq!(macro_auc_ovr(&o), 0.0);
        assert_eq!(macro_f1(&[]), 0.0);
    }
}
