//! Configuration for HumorBench.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace `.humorbench/config.toml` -> `HUMORBENCH_` environment variables
//! -> explicit overrides.

use crate::error::HumorError;
use crate::eval::labels::NormalizationMode;
use crate::eval::metrics::ObservationMode;
use crate::eval::runs::DEFAULT_MAX_RUNS;
use crate::eval::transcript::DEFAULT_DELIMITER;
use crate::perturb::{Lexicon, NamedPerturbation, PipelineSpec};
use crate::runner::RunOptions;
use crate::scope::DEFAULT_TARGET_ROLE;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumorConfig {
    #[serde(default)]
    pub perturb: PerturbConfig,
    #[serde(default)]
    pub eval: EvalConfig,
}

/// Settings for the perturbation runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbConfig {
    /// Fixed seed for reproducible runs; unseeded runs draw from OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_synonym_lang")]
    pub synonym_lang: String,
    #[serde(default = "default_true")]
    pub include_cultural: bool,
    #[serde(default = "default_target_role")]
    pub target_role: String,
    /// JSON lexical database for synonym substitution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexicon_path: Option<PathBuf>,
    /// Declarative pipelines replacing the built-in set when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipelines: Vec<PipelineSpec>,
}

impl Default for PerturbConfig {
    fn default() -> Self {
        Self {
            seed: None,
            synonym_lang: default_synonym_lang(),
            include_cultural: true,
            target_role: default_target_role(),
            lexicon_path: None,
            pipelines: Vec::new(),
        }
    }
}

impl PerturbConfig {
    /// Load the lexicon if configured. A missing or unreadable file disables
    /// synonym substitution rather than failing.
    pub fn lexicon(&self) -> Option<Arc<Lexicon>> {
        self.lexicon_path
            .as_deref()
            .and_then(Lexicon::try_load)
            .map(Arc::new)
    }

    pub fn run_options(&self, lexicon: Option<Arc<Lexicon>>) -> RunOptions {
        RunOptions {
            synonym_lang: self.synonym_lang.clone(),
            include_cultural: self.include_cultural,
            target_role: self.target_role.clone(),
            lexicon,
        }
    }

    /// Configured pipelines, or `None` to use the built-in defaults.
    pub fn build_pipelines(&self, lexicon: Option<&Arc<Lexicon>>) -> Option<Vec<NamedPerturbation>> {
        if self.pipelines.is_empty() {
            return None;
        }
        Some(
            self.pipelines
                .iter()
                .map(|spec| spec.build(&self.synonym_lang, lexicon))
                .collect(),
        )
    }
}

/// Settings for transcript parsing and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_max_runs")]
    pub max_runs: usize,
    #[serde(default = "default_ks")]
    pub ks: Vec<usize>,
    #[serde(default)]
    pub normalization: NormalizationMode,
    #[serde(default)]
    pub observation_mode: ObservationMode,
    /// Extra task 1 aliases, raw label -> vocabulary label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub task1_aliases: BTreeMap<String, String>,
    /// Extra task 2 aliases, raw label -> vocabulary label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub task2_aliases: BTreeMap<String, String>,
    /// Models evaluated when none are given on the command line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            max_runs: DEFAULT_MAX_RUNS,
            ks: default_ks(),
            normalization: NormalizationMode::default(),
            observation_mode: ObservationMode::default(),
            task1_aliases: BTreeMap::new(),
            task2_aliases: BTreeMap::new(),
            models: Vec::new(),
        }
    }
}

impl EvalConfig {
    /// Reject settings that cannot produce a meaningful evaluation.
    pub fn validate(&self) -> Result<(), HumorError> {
        if self.max_runs == 0 {
            return Err(HumorError::config("eval.max_runs must be at least 1"));
        }
        if self.ks.is_empty() {
            return Err(HumorError::config("eval.ks must list at least one k"));
        }
        if let Some(k) = self.ks.iter().find(|&&k| k == 0 || k > self.max_runs) {
            return Err(HumorError::config(format!(
                "eval.ks entry {k} must be between 1 and max_runs ({})",
                self.max_runs
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_synonym_lang() -> String {
    "eng".to_string()
}

fn default_target_role() -> String {
    DEFAULT_TARGET_ROLE.to_string()
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_max_runs() -> usize {
    DEFAULT_MAX_RUNS
}

fn default_ks() -> Vec<usize> {
    vec![1, 5]
}

/// Directory holding the user-level `config.toml`.
pub fn user_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "humorbench", "humorbench")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Workspace-level config file path.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".humorbench").join("config.toml")
}

/// Load configuration from all layers.
///
/// `overrides` maps dotted keys such as `perturb.seed` to values and is
/// merged last.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: &BTreeMap<String, serde_json::Value>,
) -> Result<HumorConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(HumorConfig::default()));

    if let Some(dir) = user_config_dir() {
        let user_config = dir.join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // HUMORBENCH_PERTURB__SEED, HUMORBENCH_EVAL__MAX_RUNS, ...
    figment = figment.merge(Env::prefixed("HUMORBENCH_").split("__"));

    for (key, value) in overrides {
        figment = figment.merge(Serialized::default(key, value));
    }

    figment.extract().map_err(Box::new)
}
