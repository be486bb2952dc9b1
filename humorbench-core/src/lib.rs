//! HumorBench core: seeded joke perturbations scoped to punchlines, and
//! pass@k evaluation of model transcripts on two humor tasks.

pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod perturb;
pub mod prompts;
pub mod runner;
pub mod scope;
pub mod segment;
pub mod tokenize;

pub use config::{EvalConfig, HumorConfig, PerturbConfig, load_config};
pub use dataset::{JokeRecord, LINE_SEP, Table};
pub use error::HumorError;
pub use perturb::{NamedPerturbation, Perturbation, Pipeline, default_pipelines};
pub use runner::{RunManifest, RunOptions, generate_outputs};
pub use scope::PunchlineOnly;
