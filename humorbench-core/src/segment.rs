//! Groups line-level annotated transcript rows into multi-line joke records.
//!
//! A joke ends when the video changes, or when a new `Establishing context`
//! line arrives after the current joke has already hit a climax label.

use crate::dataset::{
    JOKE_COLUMN, JokeRecord, TASK1_COLUMN, TASK2_COLUMN, Table, join_lines,
};
use crate::error::HumorError;
use std::collections::BTreeMap;

pub const VIDEO_COLUMN: &str = "Video #";
pub const LINE_COLUMN: &str = "Joke";
pub const LINE_TASK1_COLUMN: &str = "Task 1 Label";
pub const LINE_TASK2_COLUMN: &str = "Task 2 Label";

/// Role that opens a new bit once the previous one peaked.
pub const START_LABEL: &str = "Establishing context";
/// Roles that mark a joke as having peaked.
pub const CLIMAX_LABELS: [&str; 4] = ["Punchline", "Wrap-up", "Callback", "Meta-humor"];

const PUNCHLINE_LABEL: &str = "Punchline";

/// One annotated transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    pub video: String,
    pub text: String,
    pub task1_label: String,
    pub task2_label: String,
}

/// Read annotated lines from a table with `Video #`, `Joke`, `Task 1 Label`
/// and `Task 2 Label` columns.
pub fn annotated_lines(table: &Table) -> Result<Vec<AnnotatedLine>, HumorError> {
    table.require_columns(&[VIDEO_COLUMN, LINE_COLUMN, LINE_TASK1_COLUMN, LINE_TASK2_COLUMN])?;
    let videos = table.column_values(VIDEO_COLUMN)?;
    let texts = table.column_values(LINE_COLUMN)?;
    let task1 = table.column_values(LINE_TASK1_COLUMN)?;
    let task2 = table.column_values(LINE_TASK2_COLUMN)?;
    Ok(videos
        .into_iter()
        .zip(texts)
        .zip(task1)
        .zip(task2)
        .map(|(((video, text), t1), t2)| AnnotatedLine {
            video: video.to_string(),
            text: text.to_string(),
            task1_label: t1.to_string(),
            task2_label: t2.to_string(),
        })
        .collect())
}

/// Split annotated lines into jokes.
pub fn segment_lines(lines: &[AnnotatedLine]) -> Vec<JokeRecord> {
    let mut jokes = Vec::new();
    let mut current: Vec<&AnnotatedLine> = Vec::new();
    let mut climax_reached = false;
    let mut prev_video: Option<&str> = None;

    for line in lines {
        let new_video = prev_video.is_some_and(|v| v != line.video);
        let new_bit = line.task2_label == START_LABEL && climax_reached;
        if new_video || new_bit {
            if let Some(joke) = finalize(&current) {
                jokes.push(joke);
            }
            current.clear();
            climax_reached = false;
        }

        current.push(line);
        prev_video = Some(&line.video);
        if CLIMAX_LABELS.contains(&line.task2_label.as_str()) {
            climax_reached = true;
        }
    }

    if let Some(joke) = finalize(&current) {
        jokes.push(joke);
    }
    jokes
}

/// Segment a line-level table into a joke-level table with `Joke`,
/// `Task1 Label` and `Task2 Label` columns.
pub fn segment_table(table: &Table) -> Result<Table, HumorError> {
    let lines = annotated_lines(table)?;
    let jokes = segment_lines(&lines);
    tracing::info!(lines = lines.len(), jokes = jokes.len(), "Segmented transcript");

    let mut out = Table::new(vec![
        JOKE_COLUMN.to_string(),
        TASK1_COLUMN.to_string(),
        TASK2_COLUMN.to_string(),
    ]);
    out.rows = jokes
        .into_iter()
        .map(|j| vec![j.joke, j.task1_label, j.task2_label])
        .collect();
    Ok(out)
}

fn finalize(rows: &[&AnnotatedLine]) -> Option<JokeRecord> {
    if rows.is_empty() {
        return None;
    }
    let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
    let roles: Vec<&str> = rows.iter().map(|r| r.task2_label.as_str()).collect();
    let task1_label = rows
        .iter()
        .find(|r| r.task2_label == PUNCHLINE_LABEL)
        .map(|r| r.task1_label.clone())
        .unwrap_or_else(|| most_frequent(rows.iter().map(|r| r.task1_label.as_str())));

    Some(JokeRecord {
        joke: join_lines(&texts),
        task1_label,
        task2_label: join_lines(&roles),
    })
}

/// Most frequent value; ties go to the smallest value.
fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (v, n) in counts {
        if best.is_none_or(|(_, m)| n > m) {
            best = Some((v, n));
        }
    }
    best.map(|(v, _)| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_tsv;
    use pretty_assertions::assert_eq;

    fn line(video: &str, text: &str, t1: &str, t2: &str) -> AnnotatedLine {
        AnnotatedLine {
            video: video.into(),
            text: text.into(),
            task1_label: t1.into(),
            task2_label: t2.into(),
        }
    }

    #[test]
    fn test_splits_on_context_after_climax() {
        let lines = vec![
            line("1", "So I moved.", "dry", "Establishing context"),
            line("1", "Tiny flat.", "dry", "Setup"),
            line("1", "The mice are hunched.", "surreal/absurdism", "Punchline"),
            line("1", "Anyway, dating.", "observational/anecdotal", "Establishing context"),
            line("1", "She left.", "dark", "Punchline"),
        ];
        let jokes = segment_lines(&lines);
        assert_eq!(jokes.len(), 2);
        assert_eq!(jokes[0].joke, "So I moved.\\nTiny flat.\\nThe mice are hunched.");
        assert_eq!(jokes[0].task2_label, "Establishing context\\nSetup\\nPunchline");
        assert_eq!(jokes[0].task1_label, "surreal/absurdism");
        assert_eq!(jokes[1].task1_label, "dark");
    }

    #[test]
    fn test_context_without_climax_does_not_split() {
        let lines = vec![
            line("1", "a", "dry", "Establishing context"),
            line("1", "b", "dry", "Establishing context"),
            line("1", "c", "dry", "Setup"),
        ];
        assert_eq!(segment_lines(&lines).len(), 1);
    }

    #[test]
    fn test_splits_on_video_change() {
        let lines = vec![
            line("1", "a", "dry", "Setup"),
            line("2", "b", "wit", "Setup"),
        ];
        let jokes = segment_lines(&lines);
        assert_eq!(jokes.len(), 2);
        assert_eq!(jokes[1].joke, "b");
    }

    #[test]
    fn test_task1_falls_back_to_smallest_mode() {
        let lines = vec![
            line("1", "a", "irony", "Setup"),
            line("1", "b", "dry", "Escalation"),
            line("1", "c", "dry", "Wrap-up"),
            line("1", "d", "irony", "Timing"),
        ];
        assert_eq!(segment_lines(&lines)[0].task1_label, "dry");
    }

    #[test]
    fn test_task1_fallback_prefers_higher_count() {
        let lines = vec![
            line("1", "a", "dry", "Setup"),
            line("1", "b", "irony", "Escalation"),
            line("1", "c", "irony", "Timing"),
        ];
        assert_eq!(segment_lines(&lines)[0].task1_label, "irony");
    }

    #[test]
    fn test_segment_table() {
        let table = parse_tsv(
            "Video #\tJoke\tTask 1 Label\tTask 2 Label\n\
             7\tHi.\tdry\tEstablishing context\n\
             7\tBye.\tdry\tPunchline\n",
        )
        .unwrap();
        let out = segment_table(&table).unwrap();
        assert_eq!(out.columns, vec!["Joke", "Task1 Label", "Task2 Label"]);
        assert_eq!(out.rows, vec![vec!["Hi.\\nBye.", "dry", "Establishing context\\nPunchline"]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(segment_lines(&[]).is_empty());
    }
}
