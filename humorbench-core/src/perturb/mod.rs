//! Text perturbations and the pipelines that compose them.
//!
//! Every primitive draws its randomness from a generator handle passed by the
//! caller, so seeding that one handle makes a whole run reproducible.

pub mod cultural;
pub mod lexicon;
pub mod synonym;
pub mod swap;
pub mod typo;

pub use cultural::CulturalShiftPerturbation;
pub use lexicon::Lexicon;
pub use swap::SwapOrderPerturbation;
pub use synonym::SynonymPerturbation;
pub use typo::{KeyboardMap, TypoPerturbation};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column-name prefix shared by all perturbed joke columns.
pub const PERTURBED_COLUMN_PREFIX: &str = "perturbed_joke_";

/// `random() < p` over the half-open unit interval.
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.r#gen::<f64>() < p
}

/// The closed set of perturbations.
#[derive(Debug, Clone)]
pub enum Perturbation {
    Synonym(SynonymPerturbation),
    SwapOrder(SwapOrderPerturbation),
    Typo(TypoPerturbation),
    CulturalShift(CulturalShiftPerturbation),
    Pipeline(Pipeline),
}

impl Perturbation {
    pub fn name(&self) -> &str {
        match self {
            Self::Synonym(p) => &p.name,
            Self::SwapOrder(p) => &p.name,
            Self::Typo(p) => &p.name,
            Self::CulturalShift(p) => &p.name,
            Self::Pipeline(p) => &p.name,
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        match self {
            Self::Synonym(p) => p.apply(text, rng),
            Self::SwapOrder(p) => p.apply(text, rng),
            Self::Typo(p) => p.apply(text, rng),
            Self::CulturalShift(p) => p.apply(text),
            Self::Pipeline(p) => p.apply(text, rng),
        }
    }
}

impl From<Pipeline> for Perturbation {
    fn from(p: Pipeline) -> Self {
        Self::Pipeline(p)
    }
}

/// An ordered chain of perturbations applied left to right.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<Perturbation>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn add_step(mut self, step: Perturbation) -> Self {
        self.steps.push(step);
        self
    }

    /// Thread `text` through every step. An empty pipeline is the identity.
    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let mut text = text.to_string();
        for step in &self.steps {
            text = step.apply(&text, rng);
        }
        text
    }
}

/// A perturbation bound to the output column it fills.
#[derive(Debug, Clone)]
pub struct NamedPerturbation {
    pub column: String,
    pub perturbation: Perturbation,
}

impl NamedPerturbation {
    pub fn new(column: impl Into<String>, perturbation: impl Into<Perturbation>) -> Self {
        Self {
            column: column.into(),
            perturbation: perturbation.into(),
        }
    }
}

/// Build the default perturbation set.
///
/// `include_cultural` should be off for languages where the US/UK vocabulary
/// swap means nothing.
pub fn default_pipelines(
    synonym_lang: &str,
    include_cultural: bool,
    lexicon: Option<Arc<Lexicon>>,
) -> Vec<NamedPerturbation> {
    let semantic_preserving = Pipeline::new("semantic_preserving")
        .add_step(Perturbation::Synonym(SynonymPerturbation::new(
            0.1,
            synonym_lang,
            lexicon.clone(),
        )))
        .add_step(Perturbation::Typo(TypoPerturbation::new(0.05, 0.05)));

    let semantic_drift = Pipeline::new("semantic_drift")
        .add_step(Perturbation::Synonym(SynonymPerturbation::new(
            0.4,
            synonym_lang,
            lexicon,
        )))
        .add_step(Perturbation::SwapOrder(SwapOrderPerturbation::new(0.3)))
        .add_step(Perturbation::Typo(TypoPerturbation::new(0.3, 0.15)));

    let ortho_typo = TypoPerturbation::new(0.3, 0.2).named("ortho_typo");

    let mut pipelines = vec![
        NamedPerturbation::new(
            format!("{PERTURBED_COLUMN_PREFIX}semantic_preserving"),
            semantic_preserving,
        ),
        NamedPerturbation::new(format!("{PERTURBED_COLUMN_PREFIX}semantic_drift"), semantic_drift),
        NamedPerturbation::new(
            format!("{PERTURBED_COLUMN_PREFIX}ortho_typo"),
            Perturbation::Typo(ortho_typo),
        ),
    ];

    if include_cultural {
        pipelines.push(NamedPerturbation::new(
            format!("{PERTURBED_COLUMN_PREFIX}cultural_shift"),
            Perturbation::CulturalShift(CulturalShiftPerturbation::default()),
        ));
    }

    pipelines
}

/// A declarative perturbation step, as written in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepSpec {
    Synonym {
        prob: f64,
    },
    SwapOrder {
        prob: f64,
    },
    Typo {
        word_prob: f64,
        char_prob: f64,
        #[serde(default)]
        keyboard: Option<BTreeMap<String, String>>,
    },
    CulturalShift {
        #[serde(default)]
        mapping: Option<BTreeMap<String, String>>,
    },
}

/// A declarative pipeline bound to an output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub column: String,
    pub steps: Vec<StepSpec>,
}

impl StepSpec {
    pub fn build(&self, synonym_lang: &str, lexicon: Option<&Arc<Lexicon>>) -> Perturbation {
        match self {
            Self::Synonym { prob } => Perturbation::Synonym(SynonymPerturbation::new(
                *prob,
                synonym_lang,
                lexicon.cloned(),
            )),
            Self::SwapOrder { prob } => {
                Perturbation::SwapOrder(SwapOrderPerturbation::new(*prob))
            }
            Self::Typo {
                word_prob,
                char_prob,
                keyboard,
            } => {
                let mut typo = TypoPerturbation::new(*word_prob, *char_prob);
                if let Some(table) = keyboard {
                    typo = typo.with_keyboard(KeyboardMap::from_table(table));
                }
                Perturbation::Typo(typo)
            }
            Self::CulturalShift { mapping } => Perturbation::CulturalShift(match mapping {
                Some(table) => CulturalShiftPerturbation::from_table(table),
                None => CulturalShiftPerturbation::default(),
            }),
        }
    }
}

impl PipelineSpec {
    /// Build the runtime pipeline. The pipeline is named after its column
    /// with the `perturbed_joke_` prefix removed.
    pub fn build(&self, synonym_lang: &str, lexicon: Option<&Arc<Lexicon>>) -> NamedPerturbation {
        let name = self
            .column
            .strip_prefix(PERTURBED_COLUMN_PREFIX)
            .unwrap_or(&self.column);
        let pipeline = self
            .steps
            .iter()
            .fold(Pipeline::new(name), |pipeline, step| {
                pipeline.add_step(step.build(synonym_lang, lexicon))
            });
        NamedPerturbation::new(self.column.clone(), pipeline)
    }
}
