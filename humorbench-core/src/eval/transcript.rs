//! Parsing of model completion transcripts.
//!
//! A transcript is a sequence of blocks, each introduced by a delimiter line
//! such as `=== Prompt 12 ===`. Every block after a delimiter is one answer
//! position; text before the first delimiter is ignored.

use crate::error::HumorError;
use crate::eval::labels::Task;
use regex::Regex;
use std::path::Path;

/// Default per-prompt block delimiter.
pub const DEFAULT_DELIMITER: &str = r"=== Prompt \d+ ===";

/// One extracted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Task 1 category.
    Label(String),
    /// Task 2 per-line roles.
    Lines(Vec<String>),
    /// Empty, malformed or fieldless block.
    Missing,
}

impl Answer {
    /// Raw prediction for the unit at `line` (task 1 answers ignore `line`).
    pub fn prediction(&self, task: Task, line: usize) -> Option<&str> {
        match (task, self) {
            (Task::Classification, Self::Label(label)) => Some(label.as_str()),
            (Task::LineRoles, Self::Lines(lines)) => lines.get(line).map(String::as_str),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Splits transcripts into blocks and extracts the task's answer field.
#[derive(Debug, Clone)]
pub struct TranscriptParser {
    task: Task,
    delimiter: Regex,
}

impl TranscriptParser {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            delimiter: Regex::new(DEFAULT_DELIMITER).unwrap(),
        }
    }

    pub fn with_delimiter(task: Task, pattern: &str) -> Result<Self, HumorError> {
        Ok(Self {
            task,
            delimiter: Regex::new(pattern)?,
        })
    }

    pub fn task(&self) -> Task {
        self.task
    }

    /// Invalid UTF-8 is replaced rather than rejected, so a garbled
    /// transcript still yields one answer per block.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<Answer>, HumorError> {
        let bytes = std::fs::read(path)?;
        let answers = self.parse(&String::from_utf8_lossy(&bytes));
        tracing::debug!(
            path = %path.display(),
            blocks = answers.len(),
            "Parsed transcript"
        );
        Ok(answers)
    }

    /// One answer per delimiter, in order.
    pub fn parse(&self, text: &str) -> Vec<Answer> {
        let answers: Vec<Answer> = self
            .delimiter
            .split(text)
            .skip(1)
            .map(|block| self.extract(block.trim()))
            .collect();
        let failures = answers.iter().filter(|a| a.is_missing()).count();
        if failures > 0 {
            tracing::debug!(
                task = self.task.number(),
                failures,
                blocks = answers.len(),
                "Transcript blocks without a usable answer"
            );
        }
        answers
    }

    fn extract(&self, block: &str) -> Answer {
        if block.is_empty() {
            return Answer::Missing;
        }
        let Some(value) = last_json_object(block) else {
            return Answer::Missing;
        };
        let field = &value[self.task.answer_field()];
        match self.task {
            Task::Classification => match field.as_str() {
                Some(label) => Answer::Label(label.to_string()),
                None => Answer::Missing,
            },
            Task::LineRoles => match field.as_array() {
                Some(items) => Answer::Lines(
                    items
                        .iter()
                        .map(|item| item.as_str().unwrap_or_default().to_string())
                        .collect(),
                ),
                None => Answer::Missing,
            },
        }
    }
}

/// Decode the last `{...}` object in `block`.
///
/// The span is found by walking back from the final `}` to its matching `{`.
/// When that span does not decode, the widest span from the first `{` to the
/// final `}` is tried instead.
fn last_json_object(block: &str) -> Option<serde_json::Value> {
    let end = block.rfind('}')?;
    let mut candidates = Vec::with_capacity(2);
    if let Some(start) = matching_open_brace(block, end) {
        candidates.push(start);
    }
    if let Some(first) = block.find('{') {
        if first < end && !candidates.contains(&first) {
            candidates.push(first);
        }
    }
    candidates
        .into_iter()
        .find_map(|start| serde_json::from_str(&block[start..=end]).ok())
        .filter(serde_json::Value::is_object)
}

fn matching_open_brace(text: &str, close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text[..=close].char_indices().rev() {
        match c {
            '}' => depth += 1,
            '{' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_last_object_wins() {
        let parser = TranscriptParser::new(Task::Classification);
        let text = "=== Prompt 0 ===\nExample: {\"category\": \"dry\"}\nFinal: {\"category\": \"irony\", \"reasoning\": \"uses {braces}\"}### END";
        assert_eq!(parser.parse(text), vec![Answer::Label("irony".into())]);
    }

    #[test]
    fn test_positions_are_preserved() {
        let parser = TranscriptParser::new(Task::Classification);
        let text = "preamble {\"category\": \"dark\"}\n\
                    === Prompt 0 ===\n{\"category\": \"satire\"}\n\
                    === Prompt 1 ===\n\n\
                    === Prompt 2 ===\n{\"category\": broken\n\
                    === Prompt 3 ===\nno json here\n\
                    === Prompt 4 ===\n{\"reasoning\": \"no category\"}\n\
                    === Prompt 5 ===\n{\"category\": \"wordplay\"}";
        assert_eq!(
            parser.parse(text),
            vec![
                Answer::Label("satire".into()),
                Answer::Missing,
                Answer::Missing,
                Answer::Missing,
                Answer::Missing,
                Answer::Label("wordplay".into()),
            ]
        );
    }

    #[test]
    fn test_task2_answer_list() {
        let parser = TranscriptParser::new(Task::LineRoles);
        let text = "=== Prompt 0 ===\nthinking...\n{\"ANSWER\":[\"setup\", \"punchline\"]}### END.";
        let answers = parser.parse(text);
        assert_eq!(
            answers,
            vec![Answer::Lines(vec!["setup".into(), "punchline".into()])]
        );
        assert_eq!(answers[0].prediction(Task::LineRoles, 1), Some("punchline"));
        assert_eq!(answers[0].prediction(Task::LineRoles, 2), None);
    }

    #[test]
    fn test_task2_wrong_field_type() {
        let parser = TranscriptParser::new(Task::LineRoles);
        assert_eq!(
            parser.parse("=== Prompt 0 ===\n{\"ANSWER\": \"setup\"}"),
            vec![Answer::Missing]
        );
    }

    #[test]
    fn test_unbalanced_braces_fall_back_to_widest_span() {
        let parser = TranscriptParser::new(Task::Classification);
        let text = "=== Prompt 0 ===\n{\"category\": \"dry\", \"reasoning\": \"a } b\"}";
        assert_eq!(parser.parse(text), vec![Answer::Label("dry".into())]);
    }

    #[test]
    fn test_custom_delimiter() {
        let parser = TranscriptParser::with_delimiter(Task::Classification, r"--- \d+ ---").unwrap();
        let answers = parser.parse("--- 1 ---\n{\"category\": \"dark\"}\n--- 2 ---\n");
        assert_eq!(answers, vec![Answer::Label("dark".into()), Answer::Missing]);
    }

    #[test]
    fn test_invalid_utf8_file_still_parses() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garbled_run1.txt");
        let mut bytes = b"=== Prompt 0 ===\n\xff\xfe\n=== Prompt 1 ===\n".to_vec();
        bytes.extend_from_slice(b"{\"category\": \"dark\"}\n");
        std::fs::write(&path, bytes).unwrap();

        let parser = TranscriptParser::new(Task::Classification);
        assert_eq!(
            parser.parse_file(&path).unwrap(),
            vec![Answer::Missing, Answer::Label("dark".into())]
        );
    }

    #[test]
    fn test_invalid_delimiter_is_an_error() {
        assert!(TranscriptParser::with_delimiter(Task::Classification, "(").is_err());
    }
}
