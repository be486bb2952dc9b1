//! Confusion matrices over a closed label vocabulary.

use crate::dataset::{Table, render_delimited};
use crate::error::HumorError;
use crate::eval::labels::NA_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Truth -> prediction -> count. Labels outside the vocabulary are counted
/// under `NA`, so every pair lands in a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Vocabulary in sorted order; rows and columns follow it.
    pub labels: Vec<String>,
    pub counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ConfusionMatrix {
    pub fn new(vocabulary: &[&str]) -> Self {
        let mut labels: Vec<String> = vocabulary.iter().map(|l| l.to_string()).collect();
        if !labels.iter().any(|l| l == NA_LABEL) {
            labels.push(NA_LABEL.to_string());
        }
        labels.sort();
        labels.dedup();
        let row: BTreeMap<String, u64> = labels.iter().map(|l| (l.clone(), 0)).collect();
        let counts = labels.iter().map(|l| (l.clone(), row.clone())).collect();
        Self { labels, counts }
    }

    pub fn record(&mut self, truth: &str, prediction: &str) {
        let truth = self.resolve(truth);
        let prediction = self.resolve(prediction);
        if let Some(cell) = self
            .counts
            .get_mut(&truth)
            .and_then(|row| row.get_mut(&prediction))
        {
            *cell += 1;
        }
    }

    pub fn get(&self, truth: &str, prediction: &str) -> u64 {
        self.counts
            .get(truth)
            .and_then(|row| row.get(prediction))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().flat_map(|row| row.values()).sum()
    }

    /// Sum of the diagonal.
    pub fn correct(&self) -> u64 {
        self.labels.iter().map(|l| self.get(l, l)).sum()
    }

    /// Square table: header row of predictions, one row per truth label.
    pub fn to_table(&self) -> Table {
        let mut columns = vec![String::new()];
        columns.extend(self.labels.iter().cloned());
        let mut table = Table::new(columns);
        for truth in &self.labels {
            let mut row = vec![truth.clone()];
            row.extend(self.labels.iter().map(|pred| self.get(truth, pred).to_string()));
            table.rows.push(row);
        }
        table
    }

    pub fn to_csv(&self) -> String {
        render_delimited(&self.to_table(), ',')
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), HumorError> {
        ensure_parent(path)?;
        std::fs::write(path, self.to_csv())?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), HumorError> {
        ensure_parent(path)?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn resolve(&self, label: &str) -> String {
        if self.counts.contains_key(label) {
            label.to_string()
        } else {
            NA_LABEL.to_string()
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), HumorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
