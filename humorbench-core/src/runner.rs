//! Batch perturbation runner: reads a labelled joke TSV, applies every
//! pipeline to the punchline lines of every row and writes one TSV per
//! pipeline plus a run manifest.

use crate::dataset::{
    JokeRecord, REQUIRED_COLUMNS, TASK1_COLUMN, TASK2_COLUMN, Table, parse_tsv, write_tsv,
};
use crate::error::HumorError;
use crate::perturb::{Lexicon, NamedPerturbation, PERTURBED_COLUMN_PREFIX, default_pipelines};
use crate::scope::{DEFAULT_TARGET_ROLE, PunchlineOnly};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// File name of the run manifest inside the output directory.
pub const MANIFEST_FILE: &str = "metadata.json";

/// Options shared by every pipeline of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub synonym_lang: String,
    pub include_cultural: bool,
    pub target_role: String,
    pub lexicon: Option<Arc<Lexicon>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            synonym_lang: "eng".to_string(),
            include_cultural: true,
            target_role: DEFAULT_TARGET_ROLE.to_string(),
            lexicon: None,
        }
    }
}

/// Record of one perturbation run, written once as `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub input_tsv: String,
    pub input_sha256: String,
    pub seed: Option<u64>,
    pub row_count: usize,
    pub synonym_lang: String,
    pub include_cultural: bool,
    pub target_role: String,
    /// Output column to written file path.
    pub outputs: BTreeMap<String, String>,
}

impl RunManifest {
    pub fn load(path: &Path) -> Result<Self, HumorError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `perturbed_joke_semantic_drift` -> `jokes_semantic_drift.tsv`; any other
/// column `c` -> `c.tsv`.
pub fn output_filename_for_column(column: &str) -> String {
    match column.strip_prefix(PERTURBED_COLUMN_PREFIX) {
        Some(rest) => format!("jokes_{rest}.tsv"),
        None => format!("{column}.tsv"),
    }
}

/// SHA-256 hex digest of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Run every pipeline over the input dataset.
///
/// With `seed` set, the outputs are byte-identical across runs. Without it the
/// generator is seeded from OS entropy and the manifest records `null`.
pub fn generate_outputs(
    input_tsv: &Path,
    out_dir: &Path,
    seed: Option<u64>,
    pipelines: Option<Vec<NamedPerturbation>>,
    options: &RunOptions,
) -> Result<RunManifest, HumorError> {
    let content = std::fs::read_to_string(input_tsv).map_err(|e| {
        HumorError::dataset(format!("Failed to read {}: {e}", input_tsv.display()))
    })?;
    let table = parse_tsv(&content)?;
    table.require_columns(&REQUIRED_COLUMNS)?;
    let records = table.joke_records()?;

    for (idx, record) in records.iter().enumerate() {
        if let Some((joke_lines, label_lines)) = record.line_mismatch() {
            tracing::warn!(
                row = idx,
                joke_lines,
                label_lines,
                "Joke and task 2 label line counts differ"
            );
        }
    }

    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };

    let pipelines = pipelines.unwrap_or_else(|| {
        default_pipelines(
            &options.synonym_lang,
            options.include_cultural,
            options.lexicon.clone(),
        )
    });

    std::fs::create_dir_all(out_dir)?;

    tracing::info!(
        rows = records.len(),
        pipelines = pipelines.len(),
        seed = ?seed,
        input = %input_tsv.display(),
        "Generating perturbed datasets"
    );

    let mut outputs = BTreeMap::new();
    for named in &pipelines {
        let scoped = PunchlineOnly::for_role(&named.perturbation, options.target_role.as_str());
        let table = perturbed_table(&named.column, &records, |record| {
            scoped.apply_to_joke(&record.joke, &record.task2_label, &mut rng)
        });
        let path = out_dir.join(output_filename_for_column(&named.column));
        write_tsv(&path, &table)?;
        tracing::info!(
            column = %named.column,
            pipeline = named.perturbation.name(),
            path = %path.display(),
            "Wrote perturbed dataset"
        );
        outputs.insert(named.column.clone(), path_string(&path));
    }

    let manifest = RunManifest {
        input_tsv: path_string(input_tsv),
        input_sha256: sha256_hex(content.as_bytes()),
        seed,
        row_count: records.len(),
        synonym_lang: options.synonym_lang.clone(),
        include_cultural: options.include_cultural,
        target_role: options.target_role.clone(),
        outputs,
    };
    let manifest_path = out_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    tracing::debug!(path = %manifest_path.display(), "Wrote run manifest");

    Ok(manifest)
}

fn perturbed_table(
    column: &str,
    records: &[JokeRecord],
    mut perturb: impl FnMut(&JokeRecord) -> String,
) -> Table {
    let mut table = Table::new(vec![
        column.to_string(),
        TASK1_COLUMN.to_string(),
        TASK2_COLUMN.to_string(),
    ]);
    for record in records {
        table.rows.push(vec![
            perturb(record),
            record.task1_label.clone(),
            record.task2_label.clone(),
        ]);
    }
    table
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}
