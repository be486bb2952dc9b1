//! Prompt rendering for the two classification tasks.

use crate::dataset::{Table, read_tsv};
use crate::error::HumorError;
use crate::eval::Task;
use std::path::{Path, PathBuf};

/// Joke column names tried, in order, when none is given explicitly.
const PREFERRED_JOKE_COLUMNS: [&str; 4] = [
    "Joke",
    "joke",
    "perturbed_joke",
    "perturbed_joke_semantic_preserving",
];

const TASK1_ANSWER_FORMAT: &str =
    r#"{"category": "<one type>", "reasoning": "<1–2 sentence explanation>"}### END"#;

pub fn task1_prompt(joke: &str) -> String {
    format!(
        "Classify the following joke into one of these types: satire, parody, irony, aggressive, \
         dry, self-deprecating, surreal/absurdism, wordplay, witty, topical, observational, \
         anecdotal, dark. Output valid JSON of the form {TASK1_ANSWER_FORMAT} for the joke: \
         {joke} Your final answer should take the form {TASK1_ANSWER_FORMAT}"
    )
}

pub fn task2_prompt(joke: &str) -> String {
    format!(
        "Here is a joke: {joke} END OF JOKE. Classify each newline-separated line of a \
         multi-line joke by its role, assigning exactly one label from establishing context, \
         setup, escalation, subversion, callback, misdirection, timing, meta-humor, punchline, \
         redirection, non-line, wrap-up, repetition. Your final answer should take the form \
         {{\"ANSWER\":[\"label1\", \"label2\",...]}}### END."
    )
}

pub fn render_prompt(task: Task, joke: &str) -> String {
    match task {
        Task::Classification => task1_prompt(joke),
        Task::LineRoles => task2_prompt(joke),
    }
}

/// Pick the column holding joke text.
///
/// Order: `preferred` when present, then the well-known names, then the first
/// column whose name contains "joke" (any case), then the first column.
pub fn choose_joke_column<'a>(table: &'a Table, preferred: Option<&str>) -> Option<&'a str> {
    let named = |name: &str| {
        table
            .columns
            .iter()
            .find(|c| c.as_str() == name)
            .map(String::as_str)
    };
    if let Some(col) = preferred.and_then(named) {
        return Some(col);
    }
    if let Some(col) = PREFERRED_JOKE_COLUMNS.into_iter().find_map(named) {
        return Some(col);
    }
    table
        .columns
        .iter()
        .find(|c| c.to_lowercase().contains("joke"))
        .or_else(|| table.columns.first())
        .map(String::as_str)
}

/// `prompts_task{n}_<stem>.txt`.
pub fn prompt_file_name(task: Task, input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("prompts_task{}_{stem}.txt", task.number())
}

/// Write one prompt per joke, one file per requested task. Returns the
/// written paths in task order.
pub fn write_prompt_files(
    input: &Path,
    out_dir: &Path,
    joke_column: Option<&str>,
    tasks: &[Task],
) -> Result<Vec<PathBuf>, HumorError> {
    let table = read_tsv(input)?;
    let column = choose_joke_column(&table, joke_column)
        .ok_or_else(|| HumorError::dataset(format!("{} has no columns", input.display())))?;
    let jokes = table.column_values(column)?;

    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(tasks.len());
    for &task in tasks {
        let path = out_dir.join(prompt_file_name(task, input));
        let mut body = String::new();
        for joke in &jokes {
            body.push_str(&render_prompt(task, joke));
            body.push('\n');
        }
        std::fs::write(&path, body)?;
        tracing::info!(
            task = task.number(),
            column,
            prompts = jokes.len(),
            path = %path.display(),
            "Wrote prompts"
        );
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_tsv;
    use tempfile::TempDir;

    fn table(header: &str) -> Table {
        parse_tsv(&format!("{header}\n")).unwrap()
    }

    #[test]
    fn test_column_choice_order() {
        assert_eq!(choose_joke_column(&table("a\tJoke\tb"), Some("b")), Some("b"));
        assert_eq!(choose_joke_column(&table("a\tJoke\tb"), Some("zzz")), Some("Joke"));
        assert_eq!(
            choose_joke_column(&table("perturbed_joke_semantic_preserving\tperturbed_joke"), None),
            Some("perturbed_joke")
        );
        assert_eq!(choose_joke_column(&table("id\tMyJokeText"), None), Some("MyJokeText"));
        assert_eq!(choose_joke_column(&table("id\ttext"), None), Some("id"));
    }

    #[test]
    fn test_prompts_embed_joke_and_answer_format() {
        let p1 = task1_prompt("A pun.");
        assert!(p1.contains("for the joke: A pun. Your final answer"));
        assert!(p1.ends_with(r#"{"category": "<one type>", "reasoning": "<1–2 sentence explanation>"}### END"#));

        let p2 = task2_prompt("Line one\\nLine two");
        assert!(p2.starts_with("Here is a joke: Line one\\nLine two END OF JOKE."));
        assert!(p2.ends_with(r#"{"ANSWER":["label1", "label2",...]}### END."#));
    }

    #[test]
    fn test_write_prompt_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("jokes_ortho_typo.tsv");
        std::fs::write(&input, "perturbed_joke_ortho_typo\tTask1 Label\nfirst\tdry\nsecond\twitty\n")
            .unwrap();
        let out = dir.path().join("prompts");
        let paths =
            write_prompt_files(&input, &out, None, &[Task::Classification, Task::LineRoles])
                .unwrap();

        assert_eq!(paths[0], out.join("prompts_task1_jokes_ortho_typo.txt"));
        assert_eq!(paths[1], out.join("prompts_task2_jokes_ortho_typo.txt"));
        let task2 = std::fs::read_to_string(&paths[1]).unwrap();
        let lines: Vec<&str> = task2.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Here is a joke: second END OF JOKE."));
    }
}
