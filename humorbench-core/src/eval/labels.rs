//! Task label spaces and label normalization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Catch-all bucket for anything outside a task's vocabulary.
pub const NA_LABEL: &str = "NA";

pub const TASK1_LABELS: [&str; 13] = [
    "satire",
    "parody",
    "irony",
    "aggressive",
    "dry",
    "self-deprecating",
    "surreal/absurdism",
    "wordplay",
    "witty",
    "topical",
    "observational/anecdotal",
    "dark",
    NA_LABEL,
];

pub const TASK2_LABELS: [&str; 14] = [
    "establishing context",
    "escalation",
    "subversion",
    "callback",
    "misdirection",
    "timing",
    "meta-humor",
    "punchline",
    "redirection",
    "non-line",
    "wrap-up",
    "repetition",
    "setup",
    NA_LABEL,
];

const TASK1_ALIASES: &[(&str, &str)] = &[
    ("surreal", "surreal/absurdism"),
    ("absurdism", "surreal/absurdism"),
    ("absurd", "surreal/absurdism"),
    ("surreal/absurd", "surreal/absurdism"),
    ("observational", "observational/anecdotal"),
    ("anecdotal", "observational/anecdotal"),
    ("self deprecating", "self-deprecating"),
    ("selfdeprecating", "self-deprecating"),
];

const TASK2_ALIASES: &[(&str, &str)] = &[
    ("set up", "setup"),
    ("set-up", "setup"),
    ("wrap up", "wrap-up"),
    ("wrapup", "wrap-up"),
    ("meta humor", "meta-humor"),
    ("meta-humour", "meta-humor"),
    ("call back", "callback"),
    ("call-back", "callback"),
    ("punch line", "punchline"),
    ("non line", "non-line"),
    ("nonline", "non-line"),
];

/// Ordered containment rules for task 2. The first needle found in the label
/// wins, so a label mentioning two roles folds to whichever rule comes first.
const TASK2_SUBSTRING_RULES: &[(&str, &str)] = &[
    ("establishing", "establishing context"),
    ("context", "establishing context"),
    ("set up", "setup"),
    ("set-up", "setup"),
    ("wrap", "wrap-up"),
    ("meta", "meta-humor"),
    ("punch", "punchline"),
    ("call back", "callback"),
    ("not a line", "non-line"),
    ("non line", "non-line"),
];

/// The two classification tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Task 1: one humor category per joke.
    Classification,
    /// Task 2: one structural role per joke line.
    LineRoles,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::Classification, Task::LineRoles];

    pub fn number(self) -> u8 {
        match self {
            Self::Classification => 1,
            Self::LineRoles => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Classification),
            2 => Some(Self::LineRoles),
            _ => None,
        }
    }

    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::Classification => &TASK1_LABELS,
            Self::LineRoles => &TASK2_LABELS,
        }
    }

    /// JSON field holding the model's answer.
    pub fn answer_field(self) -> &'static str {
        match self {
            Self::Classification => "category",
            Self::LineRoles => "ANSWER",
        }
    }

    fn default_aliases(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Classification => TASK1_ALIASES,
            Self::LineRoles => TASK2_ALIASES,
        }
    }

    fn substring_rules(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Classification => &[],
            Self::LineRoles => TASK2_SUBSTRING_RULES,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task{}", self.number())
    }
}

/// How far label folding goes beyond exact vocabulary and alias matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Exact match, aliases, then the ordered substring rules.
    #[default]
    Compat,
    /// Exact match and aliases only.
    Strict,
}

/// Maps raw truth and prediction strings onto a task's closed vocabulary.
#[derive(Debug, Clone)]
pub struct LabelNormalizer {
    task: Task,
    mode: NormalizationMode,
    aliases: HashMap<String, String>,
}

impl LabelNormalizer {
    pub fn new(task: Task, mode: NormalizationMode) -> Self {
        let aliases = task
            .default_aliases()
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self { task, mode, aliases }
    }

    /// Add or override aliases. Keys are matched after trimming and
    /// lowercasing; targets that are not vocabulary labels resolve to `NA`.
    pub fn with_aliases(mut self, extra: &BTreeMap<String, String>) -> Self {
        for (from, to) in extra {
            self.aliases
                .insert(from.trim().to_lowercase(), to.trim().to_lowercase());
        }
        self
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn normalize(&self, raw: &str) -> String {
        let label = raw.trim().to_lowercase();
        if let Some(known) = self.in_vocabulary(&label) {
            return known.to_string();
        }
        if let Some(target) = self.aliases.get(&label) {
            return self.in_vocabulary(target).unwrap_or(NA_LABEL).to_string();
        }
        if self.mode == NormalizationMode::Compat {
            for (needle, target) in self.task.substring_rules() {
                if label.contains(needle) {
                    return (*target).to_string();
                }
            }
        }
        NA_LABEL.to_string()
    }

    fn in_vocabulary(&self, label: &str) -> Option<&'static str> {
        self.task
            .vocabulary()
            .iter()
            .copied()
            .find(|v| *v != NA_LABEL && *v == label)
    }
}
