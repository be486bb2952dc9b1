//! Batch evaluation of several models on both tasks.
//!
//! Transcript layout per source: `<completions_dir>/<model>/<name>_task<n>_<model>_run<r>.txt`.
//! Several sources (for example an English and a Spanish split) are scored
//! as one concatenated question set.

use crate::config::EvalConfig;
use crate::dataset::{JOKE_COLUMN, JokeRecord, Table, read_tsv, render_delimited};
use crate::error::HumorError;
use crate::eval::labels::{LabelNormalizer, Task};
use crate::eval::metrics::TaskMetrics;
use crate::eval::runs::{RunSource, any_first_run_exists, load_runs};
use crate::eval::scoring::{build_units, score_pass_at_k};
use crate::eval::transcript::TranscriptParser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One ground-truth dataset and the directory holding its transcripts.
#[derive(Debug, Clone)]
pub struct EvalSource {
    pub name: String,
    pub records: Vec<JokeRecord>,
    pub completions_dir: PathBuf,
}

impl EvalSource {
    pub fn new(
        name: impl Into<String>,
        records: Vec<JokeRecord>,
        completions_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            records,
            completions_dir: completions_dir.into(),
        }
    }

    /// Load ground truth from a TSV. A `joke_column` other than `Joke` (such
    /// as `perturbed_joke_ortho_typo`) is renamed first.
    pub fn from_tsv(
        name: impl Into<String>,
        dataset: &Path,
        joke_column: Option<&str>,
        completions_dir: impl Into<PathBuf>,
    ) -> Result<Self, HumorError> {
        let mut table: Table = read_tsv(dataset)?;
        if let Some(column) = joke_column {
            table.rename_column(column, JOKE_COLUMN);
        }
        let records = table.joke_records()?;
        tracing::debug!(dataset = %dataset.display(), rows = records.len(), "Loaded ground truth");
        Ok(Self::new(name, records, completions_dir))
    }

    pub fn run_prefix(&self, model: &str, task: Task) -> PathBuf {
        self.completions_dir
            .join(model)
            .join(format!("{}_task{}_{model}", self.name, task.number()))
    }

    fn truths(&self, task: Task) -> impl Iterator<Item = &str> {
        self.records.iter().map(move |r| match task {
            Task::Classification => r.task1_label.as_str(),
            Task::LineRoles => r.task2_label.as_str(),
        })
    }
}

/// Metrics of one model on one task, one entry per k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: String,
    pub task: Task,
    pub metrics: Vec<TaskMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ModelResult>,
    /// (model, task) pairs skipped for lack of transcripts or on failure.
    pub skipped: Vec<(String, Task)>,
    pub written: Vec<PathBuf>,
}

impl BatchReport {
    pub fn for_task(&self, task: Task) -> impl Iterator<Item = &ModelResult> {
        self.results.iter().filter(move |r| r.task == task)
    }
}

/// Evaluates models against a fixed set of sources.
#[derive(Debug, Clone)]
pub struct BatchEvaluator {
    sources: Vec<EvalSource>,
    config: EvalConfig,
}

impl BatchEvaluator {
    pub fn new(sources: Vec<EvalSource>, config: EvalConfig) -> Result<Self, HumorError> {
        config.validate()?;
        if sources.is_empty() {
            return Err(HumorError::invalid_input("At least one evaluation source is required"));
        }
        Ok(Self { sources, config })
    }

    pub fn question_count(&self) -> usize {
        self.sources.iter().map(|s| s.records.len()).sum()
    }

    fn normalizer(&self, task: Task) -> LabelNormalizer {
        let aliases = match task {
            Task::Classification => &self.config.task1_aliases,
            Task::LineRoles => &self.config.task2_aliases,
        };
        LabelNormalizer::new(task, self.config.normalization).with_aliases(aliases)
    }

    fn run_sources(&self, model: &str, task: Task) -> Vec<RunSource> {
        self.sources
            .iter()
            .map(|s| RunSource::new(s.run_prefix(model, task), s.records.len()))
            .collect()
    }

    /// Score one model on one task. `Ok(None)` when no source has a first
    /// run transcript. Confusion matrices are written to `confusion_dir` when
    /// given.
    pub fn evaluate(
        &self,
        model: &str,
        task: Task,
        confusion_dir: Option<&Path>,
    ) -> Result<Option<(ModelResult, Vec<PathBuf>)>, HumorError> {
        let sources = self.run_sources(model, task);
        if !any_first_run_exists(&sources) {
            tracing::warn!(
                model,
                task = task.number(),
                "Run files not found for any source, skipping"
            );
            return Ok(None);
        }

        let parser = TranscriptParser::with_delimiter(task, &self.config.delimiter)?;
        let aligned = load_runs(&parser, &sources, self.config.max_runs)?;
        let truths: Vec<&str> = self.sources.iter().flat_map(|s| s.truths(task)).collect();
        let units = build_units(task, &truths, &aligned.questions);
        let normalizer = self.normalizer(task);

        let mut metrics = Vec::with_capacity(self.config.ks.len());
        let mut written = Vec::new();
        for &k in &self.config.ks {
            let scored = score_pass_at_k(&units, k, &normalizer, self.config.observation_mode);
            let m = scored.metrics();
            tracing::info!(
                model,
                task = task.number(),
                k,
                runs = aligned.runs_loaded,
                correct = m.correct,
                total = m.total,
                accuracy = m.accuracy,
                macro_f1 = m.macro_f1,
                macro_auc = m.macro_auc,
                "Scored"
            );
            if let Some(dir) = confusion_dir {
                let stem = format!("task{}_confusion_matrix_{model}_pass@{k}", task.number());
                let csv = dir.join(format!("{stem}.csv"));
                let json = dir.join(format!("{stem}.json"));
                scored.confusion.write_csv(&csv)?;
                scored.confusion.write_json(&json)?;
                written.push(csv);
                written.push(json);
            }
            metrics.push(m);
        }

        Ok(Some((
            ModelResult {
                model: model.to_string(),
                task,
                metrics,
            },
            written,
        )))
    }

    /// Evaluate every model on both tasks and write
    /// `<out_prefix>_task1_res.csv` and `<out_prefix>_task2_res.csv`. A task
    /// with no evaluated model writes no results file. A (model, task) pair
    /// that fails is logged and skipped; the rest of the batch still runs.
    pub fn run(
        &self,
        models: &[String],
        out_prefix: &Path,
        confusion_dir: &Path,
    ) -> Result<BatchReport, HumorError> {
        let mut report = BatchReport::default();
        for model in models {
            for task in Task::ALL {
                match self.evaluate(model, task, Some(confusion_dir)) {
                    Ok(Some((result, written))) => {
                        report.results.push(result);
                        report.written.extend(written);
                    }
                    Ok(None) => report.skipped.push((model.clone(), task)),
                    Err(e) => {
                        tracing::warn!(
                            model = model.as_str(),
                            task = task.number(),
                            error = %e,
                            "Evaluation failed, skipping"
                        );
                        report.skipped.push((model.clone(), task));
                    }
                }
            }
        }

        for task in Task::ALL {
            let rows: Vec<&ModelResult> = report.for_task(task).collect();
            if rows.is_empty() {
                continue;
            }
            let path = results_path(out_prefix, task);
            write_results_csv(&path, &self.config.ks, &rows)?;
            tracing::info!(task = task.number(), models = rows.len(), path = %path.display(), "Wrote results");
            report.written.push(path);
        }
        Ok(report)
    }
}

/// `<out_prefix>_task<n>_res.csv`.
pub fn results_path(out_prefix: &Path, task: Task) -> PathBuf {
    let mut name = out_prefix.as_os_str().to_os_string();
    name.push(format!("_task{}_res.csv", task.number()));
    PathBuf::from(name)
}

/// Results table: `model`, then `pass@<k>_acc`, `pass@<k>_f1`, `pass@<k>_auc`
/// for each k.
pub fn results_table(ks: &[usize], rows: &[&ModelResult]) -> Table {
    let mut columns = vec!["model".to_string()];
    for k in ks {
        columns.push(format!("pass@{k}_acc"));
        columns.push(format!("pass@{k}_f1"));
        columns.push(format!("pass@{k}_auc"));
    }
    let mut table = Table::new(columns);
    for result in rows {
        let mut row = vec![result.model.clone()];
        for k in ks {
            match result.metrics.iter().find(|m| m.k == *k) {
                Some(m) => {
                    row.push(format!("{:?}", m.accuracy));
                    row.push(format!("{:?}", m.macro_f1));
                    row.push(format!("{:?}", m.macro_auc));
                }
                None => row.extend(std::iter::repeat_n(String::new(), 3)),
            }
        }
        table.rows.push(row);
    }
    table
}

fn write_results_csv(path: &Path, ks: &[usize], rows: &[&ModelResult]) -> Result<(), HumorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_delimited(&results_table(ks, rows), ','))?;
    Ok(())
}
