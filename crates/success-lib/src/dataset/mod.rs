//! Labeled training data
//!
//! Loads the training CSV (`description`, `outcome`, optional `progress`
//! and `created_at`), drops rows that cannot be used and normalizes
//! outcome labels.

mod labels;
pub mod sample;

pub use labels::normalize_label;

use crate::error::{Result, SuccessError};
use crate::models::{OutcomeLabel, ProjectRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Cell values treated as missing, compared case-insensitively after trimming
const MISSING_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "<na>", "#n/a"];

/// What to do with outcome values that match no known tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Keep the row and label it Medium
    #[default]
    DefaultMedium,
    /// Drop the row
    Drop,
}

/// One training example
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledProject {
    pub record: ProjectRecord,
    pub label: OutcomeLabel,
}

/// Row accounting from loading and cleaning a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub dropped_missing_outcome: usize,
    pub dropped_empty_description: usize,
    /// Outcome values that matched no tier, whatever the policy did with them
    pub unrecognized_labels: usize,
    pub dropped_unrecognized: usize,
    /// Occurrences of each distinct raw outcome value, before mapping
    pub raw_outcome_counts: BTreeMap<String, usize>,
}

impl CleaningReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_missing_outcome + self.dropped_empty_description + self.dropped_unrecognized
    }
}

/// Ordered (record, label) pairs ready for training
#[derive(Debug, Clone, Default)]
pub struct TrainingDataset {
    rows: Vec<LabeledProject>,
}

impl TrainingDataset {
    pub fn from_rows(rows: Vec<LabeledProject>) -> Self {
        Self { rows }
    }

    /// Load and clean a UTF-8 CSV file
    pub fn from_csv_path(
        path: &Path,
        policy: UnknownLabelPolicy,
    ) -> Result<(Self, CleaningReport)> {
        let file = File::open(path)?;
        debug!(path = %path.display(), "Reading training CSV");
        Self::from_reader(file, policy)
    }

    /// Load and clean CSV data from any reader
    pub fn from_reader<R: Read>(
        reader: R,
        policy: UnknownLabelPolicy,
    ) -> Result<(Self, CleaningReport)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let outcome_idx = column("outcome").ok_or_else(|| {
            SuccessError::Input(
                "CSV must contain an 'outcome' column (0/1/2 or tier labels)".to_string(),
            )
        })?;
        let description_idx = column("description").ok_or_else(|| {
            SuccessError::Input("CSV must contain a 'description' column".to_string())
        })?;
        let progress_idx = column("progress");
        let created_at_idx = column("created_at");

        let mut report = CleaningReport::default();
        let mut rows = Vec::new();

        for result in csv_reader.records() {
            let record = result?;
            report.rows_read += 1;

            let Some(raw_outcome) = present(record.get(outcome_idx)) else {
                report.dropped_missing_outcome += 1;
                continue;
            };
            *report
                .raw_outcome_counts
                .entry(raw_outcome.trim().to_string())
                .or_default() += 1;

            let description = present(record.get(description_idx)).unwrap_or_default();
            if description.trim().is_empty() {
                report.dropped_empty_description += 1;
                continue;
            }

            let label = match normalize_label(raw_outcome) {
                Some(label) => label,
                None => {
                    report.unrecognized_labels += 1;
                    match policy {
                        UnknownLabelPolicy::DefaultMedium => {
                            warn!(value = raw_outcome, "Unrecognized outcome label, using Medium");
                            OutcomeLabel::Medium
                        }
                        UnknownLabelPolicy::Drop => {
                            warn!(value = raw_outcome, "Unrecognized outcome label, dropping row");
                            report.dropped_unrecognized += 1;
                            continue;
                        }
                    }
                }
            };

            let progress = progress_idx
                .and_then(|i| present(record.get(i)))
                .and_then(ProjectRecord::parse_progress);
            let created_at = created_at_idx
                .and_then(|i| present(record.get(i)))
                .map(str::to_string);

            rows.push(LabeledProject {
                record: ProjectRecord {
                    description: description.to_string(),
                    progress,
                    created_at,
                },
                label,
            });
        }

        info!(
            rows_read = report.rows_read,
            rows_kept = rows.len(),
            dropped_missing_outcome = report.dropped_missing_outcome,
            dropped_empty_description = report.dropped_empty_description,
            unrecognized_labels = report.unrecognized_labels,
            "Training dataset loaded"
        );
        info!(raw_outcomes = ?report.raw_outcome_counts, "Outcome values before mapping");

        Ok((Self { rows }, report))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[LabeledProject] {
        &self.rows
    }

    pub fn labels(&self) -> Vec<OutcomeLabel> {
        self.rows.iter().map(|r| r.label).collect()
    }

    /// Number of rows per class, in class-index order
    pub fn class_counts(&self) -> [usize; OutcomeLabel::COUNT] {
        let mut counts = [0; OutcomeLabel::COUNT];
        for row in &self.rows {
            counts[row.label.index()] += 1;
        }
        counts
    }
}

fn present(cell: Option<&str>) -> Option<&str> {
    cell.filter(|v| {
        let lowered = v.trim().to_lowercase();
        !MISSING_MARKERS.contains(&lowered.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str) -> Result<(TrainingDataset, CleaningReport)> {
        TrainingDataset::from_reader(csv.as_bytes(), UnknownLabelPolicy::DefaultMedium)
    }

    #[test]
    fn test_missing_outcome_column_is_input_error() {
        let err = load("description,progress\nIdea,5\n").unwrap_err();
        assert!(matches!(err, SuccessError::Input(_)));
    }

    #[test]
    fn test_missing_description_column_is_input_error() {
        let err = load("outcome,progress\n2,5\n").unwrap_err();
        assert!(matches!(err, SuccessError::Input(_)));
    }

    #[test]
    fn test_cleaning_steps() {
        let csv = "description,progress,created_at,outcome\n\
                   \"MVP con usuarios\",55,2024-01-01,Medio éxito\n\
                   \"Sin outcome\",10,2024-01-01,\n\
                   \"   \",10,2024-01-01,2\n\
                   ,10,2024-01-01,2\n\
                   \"Ventas recurrentes\",abc,,ALTO\n\
                   \"Algo raro\",20,2024-01-01,tal vez\n";
        let (dataset, report) = load(csv).unwrap();

        assert_eq!(report.rows_read, 6);
        assert_eq!(report.dropped_missing_outcome, 1);
        assert_eq!(report.dropped_empty_description, 2);
        assert_eq!(report.unrecognized_labels, 1);
        assert_eq!(report.rows_dropped(), 3);
        assert_eq!(dataset.len(), 3);

        let rows = dataset.rows();
        assert_eq!(rows[0].label, OutcomeLabel::Medium);
        assert_eq!(rows[0].record.progress, Some(55));
        assert_eq!(rows[1].label, OutcomeLabel::High);
        assert_eq!(rows[1].record.progress, None);
        assert_eq!(rows[1].record.created_at, None);
        assert_eq!(rows[2].label, OutcomeLabel::Medium);
        assert_eq!(dataset.class_counts(), [0, 2, 1]);

        let raw: Vec<(&str, usize)> = report
            .raw_outcome_counts
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(raw, vec![("2", 2), ("ALTO", 1), ("Medio éxito", 1), ("tal vez", 1)]);
    }

    #[test]
    fn test_drop_policy_discards_unknown_labels() {
        let csv = "description,outcome\nuno,tal vez\ndos,0\n";
        let (dataset, report) =
            TrainingDataset::from_reader(csv.as_bytes(), UnknownLabelPolicy::Drop).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(report.dropped_unrecognized, 1);
        assert_eq!(dataset.labels(), vec![OutcomeLabel::Low]);
    }

    #[test]
    fn test_optional_columns_absent() {
        let (dataset, _) = load("outcome,description\n0,Idea inicial\n").unwrap();
        assert_eq!(dataset.rows()[0].record.progress, None);
        assert_eq!(dataset.rows()[0].record.created_at, None);
    }

    #[test]
    fn test_all_outcomes_missing_yields_empty_dataset() {
        let (dataset, report) = load("description,outcome\nuno,\ndos,NaN\n").unwrap();
        assert!(dataset.is_empty());
        assert_eq!(report.dropped_missing_outcome, 2);
    }
}
