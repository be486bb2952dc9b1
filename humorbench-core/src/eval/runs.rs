//! Loading and aligning repeated completion runs.

use crate::error::HumorError;
use crate::eval::transcript::{Answer, TranscriptParser};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_RUNS: usize = 5;

/// Transcript location for one slice of the ground truth.
///
/// Runs live at `<prefix>_run1.txt`, `<prefix>_run2.txt`, ... and each is
/// expected to answer `expected` questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSource {
    pub prefix: PathBuf,
    pub expected: usize,
}

impl RunSource {
    pub fn new(prefix: impl Into<PathBuf>, expected: usize) -> Self {
        Self {
            prefix: prefix.into(),
            expected,
        }
    }

    pub fn run_path(&self, run: usize) -> PathBuf {
        run_file_path(&self.prefix, run)
    }
}

/// `<prefix>_run<run>.txt`, numbered from 1.
pub fn run_file_path(prefix: &Path, run: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(format!("_run{run}.txt"));
    PathBuf::from(name)
}

/// Whether any source has a first run on disk.
pub fn any_first_run_exists(sources: &[RunSource]) -> bool {
    sources.iter().any(|s| s.run_path(1).is_file())
}

/// Answers for every question, one entry per loaded run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignedRuns {
    /// `questions[q][r]` is run `r`'s answer to question `q`.
    pub questions: Vec<Vec<Answer>>,
    pub runs_loaded: usize,
}

impl AlignedRuns {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Transpose per-run answer lists into per-question lists. Every run is
    /// cut or padded with [`Answer::Missing`] to `question_count`.
    pub fn from_runs(runs: Vec<Vec<Answer>>, question_count: usize) -> Self {
        let runs_loaded = runs.len();
        let mut questions = vec![Vec::with_capacity(runs_loaded); question_count];
        for mut run in runs {
            run.resize(question_count, Answer::Missing);
            for (slot, answer) in questions.iter_mut().zip(run) {
                slot.push(answer);
            }
        }
        Self {
            questions,
            runs_loaded,
        }
    }
}

/// Load up to `max_runs` runs. Within a run the sources are concatenated in
/// order, each cut or padded to its expected length so that question indices
/// line up with the concatenated ground truth. Runs with no file for any
/// source are skipped.
pub fn load_runs(
    parser: &TranscriptParser,
    sources: &[RunSource],
    max_runs: usize,
) -> Result<AlignedRuns, HumorError> {
    let question_count: usize = sources.iter().map(|s| s.expected).sum();
    let mut runs = Vec::new();

    for run in 1..=max_runs {
        if !sources.iter().any(|s| s.run_path(run).is_file()) {
            tracing::debug!(run, "No transcript for run, skipping");
            continue;
        }
        let mut answers = Vec::with_capacity(question_count);
        for source in sources {
            let path = source.run_path(run);
            let mut part = if path.is_file() {
                parser.parse_file(&path)?
            } else {
                tracing::warn!(run, path = %path.display(), "Missing transcript, padding");
                Vec::new()
            };
            if part.len() > source.expected {
                tracing::warn!(
                    run,
                    path = %path.display(),
                    completions = part.len(),
                    expected = source.expected,
                    "Ignoring surplus completions"
                );
            }
            part.resize(source.expected, Answer::Missing);
            answers.extend(part);
        }
        runs.push(answers);
    }

    Ok(AlignedRuns::from_runs(runs, question_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::labels::Task;
    use tempfile::TempDir;

    fn block(i: usize, label: &str) -> String {
        format!("=== Prompt {i} ===\n{{\"category\": \"{label}\"}}\n")
    }

    #[test]
    fn test_run_file_path() {
        assert_eq!(
            run_file_path(Path::new("/c/qwen/en_task1_qwen"), 3),
            PathBuf::from("/c/qwen/en_task1_qwen_run3.txt")
        );
    }

    #[test]
    fn test_transpose_pads_short_runs() {
        let runs = vec![
            vec![Answer::Label("a".into()), Answer::Label("b".into())],
            vec![Answer::Label("c".into())],
        ];
        let aligned = AlignedRuns::from_runs(runs, 2);
        assert_eq!(aligned.runs_loaded, 2);
        assert_eq!(
            aligned.questions[1],
            vec![Answer::Label("b".into()), Answer::Missing]
        );
    }

    #[test]
    fn test_load_runs_concatenates_sources() {
        let dir = TempDir::new().unwrap();
        let en = dir.path().join("en_task1_m");
        let es = dir.path().join("es_task1_m");
        std::fs::write(run_file_path(&en, 1), block(0, "dry") + &block(1, "dark")).unwrap();
        std::fs::write(run_file_path(&es, 1), block(0, "irony") + &block(1, "surplus")).unwrap();
        std::fs::write(run_file_path(&en, 2), block(0, "wit")).unwrap();

        let parser = TranscriptParser::new(Task::Classification);
        let sources = vec![RunSource::new(&en, 2), RunSource::new(&es, 1)];
        let aligned = load_runs(&parser, &sources, 5).unwrap();

        assert_eq!(aligned.runs_loaded, 2);
        assert_eq!(aligned.question_count(), 3);
        assert_eq!(
            aligned.questions[2],
            vec![Answer::Label("irony".into()), Answer::Missing]
        );
        assert_eq!(
            aligned.questions[1],
            vec![Answer::Label("dark".into()), Answer::Missing]
        );
        assert!(any_first_run_exists(&sources));
    }

    #[test]
    fn test_no_files_means_no_runs() {
        let dir = TempDir::new().unwrap();
        let sources = vec![RunSource::new(dir.path().join("absent"), 2)];
        let parser = TranscriptParser::new(Task::Classification);
        let aligned = load_runs(&parser, &sources, 5).unwrap();
        assert!(!any_first_run_exists(&sources));
        assert_eq!(aligned.runs_loaded, 0);
        assert_eq!(aligned.questions, vec![Vec::<Answer>::new(); 2]);
    }
}
