//! Tab-separated joke datasets.
//!
//! Multi-line jokes and their per-line role labels are stored in one cell each,
//! with lines joined by the literal two-character sequence `\n` (backslash, n)
//! rather than a newline byte. That encoding is kept verbatim on read and
//! write.

use crate::error::HumorError;
use std::path::Path;

/// Literal line separator used inside joke and task 2 cells.
pub const LINE_SEP: &str = "\\n";

pub const JOKE_COLUMN: &str = "Joke";
pub const TASK1_COLUMN: &str = "Task1 Label";
pub const TASK2_COLUMN: &str = "Task2 Label";

/// Columns every labelled joke dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = [JOKE_COLUMN, TASK1_COLUMN, TASK2_COLUMN];

/// Split a cell on the literal line separator.
pub fn split_lines(cell: &str) -> Vec<&str> {
    cell.split(LINE_SEP).collect()
}

/// Join lines with the literal line separator.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(LINE_SEP)
}

/// One labelled joke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JokeRecord {
    pub joke: String,
    pub task1_label: String,
    pub task2_label: String,
}

impl JokeRecord {
    pub fn joke_line_count(&self) -> usize {
        split_lines(&self.joke).len()
    }

    pub fn label_line_count(&self) -> usize {
        split_lines(&self.task2_label).len()
    }

    /// `(joke lines, label lines)` when the two counts disagree.
    pub fn line_mismatch(&self) -> Option<(usize, usize)> {
        let (jokes, labels) = (self.joke_line_count(), self.label_line_count());
        (jokes != labels).then_some((jokes, labels))
    }
}

/// An in-memory table of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Fail with [`HumorError::MissingColumns`] naming every absent column.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), HumorError> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(HumorError::MissingColumns(missing))
    }

    /// Cells of one column; short rows yield empty strings.
    pub fn column_values(&self, name: &str) -> Result<Vec<&str>, HumorError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| HumorError::MissingColumns(vec![name.to_string()]))?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Labelled joke records, after checking the required columns exist.
    pub fn joke_records(&self) -> Result<Vec<JokeRecord>, HumorError> {
        self.require_columns(&REQUIRED_COLUMNS)?;
        let jokes = self.column_values(JOKE_COLUMN)?;
        let task1 = self.column_values(TASK1_COLUMN)?;
        let task2 = self.column_values(TASK2_COLUMN)?;
        Ok(jokes
            .into_iter()
            .zip(task1)
            .zip(task2)
            .map(|((joke, t1), t2)| JokeRecord {
                joke: joke.to_string(),
                task1_label: t1.to_string(),
                task2_label: t2.to_string(),
            })
            .collect())
    }

    /// Rename a column in place. No-op when `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.as_str() == from) {
            *col = to.to_string();
        }
    }
}

/// Read a tab-separated file with a header row.
pub fn read_tsv(path: &Path) -> Result<Table, HumorError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| HumorError::dataset(format!("Failed to read {}: {e}", path.display())))?;
    parse_tsv(&content)
}

/// Parse tab-separated text. Quoted fields (`"..."` with `""` escapes) may
/// contain tabs and newlines. Blank lines are skipped.
pub fn parse_tsv(content: &str) -> Result<Table, HumorError> {
    let mut records = parse_records(content)?.into_iter();
    let columns = records
        .next()
        .ok_or_else(|| HumorError::dataset("Empty TSV file"))?;
    let width = columns.len();
    let rows = records
        .map(|mut row| {
            if row.len() < width {
                row.resize(width, String::new());
            }
            row
        })
        .collect();
    Ok(Table { columns, rows })
}

fn parse_records(content: &str) -> Result<Vec<Vec<String>>, HumorError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            '\t' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(HumorError::dataset("Unterminated quoted field"));
    }
    if field_started || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Write a table as tab-separated text with minimal quoting.
pub fn write_tsv(path: &Path, table: &Table) -> Result<(), HumorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_delimited(table, '\t'))?;
    Ok(())
}

/// Render a table with `delimiter`, quoting fields that contain the
/// delimiter, a quote or a line break.
pub fn render_delimited(table: &Table, delimiter: char) -> String {
    let sep = delimiter.to_string();
    let mut out = String::new();
    let mut push_row = |cells: &[String]| {
        let line = cells
            .iter()
            .map(|cell| quote_field(cell, delimiter))
            .collect::<Vec<_>>()
            .join(sep.as_str());
        out.push_str(&line);
        out.push('\n');
    };
    push_row(&table.columns);
    for row in &table.rows {
        push_row(row);
    }
    out
}

fn quote_field(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
    {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
