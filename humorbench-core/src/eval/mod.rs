//! Scoring of model completions against ground truth.
//!
//! Transcripts are parsed into positional answers, repeated runs are aligned
//! per question, labels are folded onto each task's closed vocabulary and
//! every unit is scored with pass@k plus macro-F1, macro-AUC and a confusion
//! matrix.

pub mod batch;
pub mod confusion;
pub mod labels;
pub mod metrics;
pub mod runs;
pub mod scoring;
pub mod transcript;

pub use batch::{BatchEvaluator, BatchReport, EvalSource, ModelResult};
pub use confusion::ConfusionMatrix;
pub use labels::{LabelNormalizer, NA_LABEL, NormalizationMode, Task};
pub use metrics::{ObservationMode, TaskMetrics};
pub use runs::{AlignedRuns, RunSource, load_runs};
pub use scoring::{PassAtK, ScoringUnit, build_units, score_pass_at_k};
pub use transcript::{Answer, TranscriptParser};
