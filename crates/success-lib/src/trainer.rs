//! Model training
//!
//! Loads and cleans a labeled CSV, fits the classification pipeline and
//! replaces the stored artifact. Nothing is written unless fitting succeeds.

use crate::dataset::{CleaningReport, TrainingDataset, UnknownLabelPolicy};
use crate::error::{Result, SuccessError};
use crate::models::{FeatureVector, OutcomeLabel};
use crate::observability::{StructuredLogger, SuccessMetrics};
use crate::pipeline::{ForestConfig, PipelineConfig, SuccessPipeline};
use crate::predictor::FeatureExtractor;
use crate::store::{ModelArtifact, ModelStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Training settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub pipeline: PipelineConfig,
    pub unknown_labels: UnknownLabelPolicy,
}

impl TrainerConfig {
    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.pipeline.forest = forest;
        self
    }

    pub fn with_unknown_labels(mut self, policy: UnknownLabelPolicy) -> Self {
        self.unknown_labels = policy;
        self
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub dropped_missing_outcome: usize,
    pub dropped_empty_description: usize,
    pub unrecognized_labels: usize,
    /// Rows per class in Low, Medium, High order
    pub class_counts: [usize; OutcomeLabel::COUNT],
    pub training_accuracy: f64,
    pub vocabulary_size: usize,
    pub n_trees: usize,
    pub elapsed_ms: u64,
    pub artifact_path: PathBuf,
}

pub struct ModelTrainer {
    config: TrainerConfig,
    extractor: FeatureExtractor,
    metrics: SuccessMetrics,
    logger: StructuredLogger,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::new(),
            metrics: SuccessMetrics::new(),
            logger: StructuredLogger::new("trainer"),
        }
    }

    /// Measure project age against a fixed clock instead of the wall clock
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train from a CSV file and replace the artifact in `store`
    pub fn train_csv(&self, csv_path: &Path, store: &ModelStore) -> Result<TrainingReport> {
        let outcome = TrainingDataset::from_csv_path(csv_path, self.config.unknown_labels)
            .and_then(|(dataset, cleaning)| self.fit_and_save(&dataset, &cleaning, store));
        self.finish(outcome)
    }

    /// Train from an in-memory dataset and replace the artifact in `store`
    pub fn train_dataset(&self, dataset: &TrainingDataset, store: &ModelStore) -> Result<TrainingReport> {
        let cleaning = CleaningReport {
            rows_read: dataset.len(),
            ..Default::default()
        };
        let outcome = self.fit_and_save(dataset, &cleaning, store);
        self.finish(outcome)
    }

    fn finish(&self, outcome: Result<TrainingReport>) -> Result<TrainingReport> {
        match &outcome {
            Ok(report) => {
                self.metrics.record_training(report.rows_used);
                self.logger.log_training_completed(
                    report.rows_used,
                    report.class_counts,
                    report.training_accuracy,
                    report.elapsed_ms as u128,
                );
            }
            Err(e) => {
                self.metrics.inc_training_failures();
                self.logger.log_training_failed(&e.to_string());
            }
        }
        outcome
    }

    fn fit_and_save(
        &self,
        dataset: &TrainingDataset,
        cleaning: &CleaningReport,
        store: &ModelStore,
    ) -> Result<TrainingReport> {
        let start = Instant::now();
        if dataset.is_empty() {
            return Err(SuccessError::EmptyDataset {
                rows_read: cleaning.rows_read,
            });
        }

        let class_counts = dataset.class_counts();
        info!(
            rows = dataset.len(),
            low = class_counts[0],
            medium = class_counts[1],
            high = class_counts[2],
            "Training label distribution"
        );

        let features: Vec<FeatureVector> = dataset
            .rows()
            .iter()
            .map(|row| self.extractor.extract(&row.record))
            .collect();
        let labels = dataset.labels();

        let pipeline = SuccessPipeline::fit(&features, &labels, &self.config.pipeline)?;
        let training_accuracy = training_accuracy(&pipeline, &features, &labels)?;
        info!(training_accuracy = training_accuracy, "Pipeline fitted");

        let artifact = ModelArtifact::new(pipeline, dataset.len(), training_accuracy);
        let artifact_path = store.save(&artifact)?;

        Ok(TrainingReport {
            rows_read: cleaning.rows_read,
            rows_used: dataset.len(),
            rows_dropped: cleaning.rows_dropped(),
            dropped_missing_outcome: cleaning.dropped_missing_outcome,
            dropped_empty_description: cleaning.dropped_empty_description,
            unrecognized_labels: cleaning.unrecognized_labels,
            class_counts,
            training_accuracy,
            vocabulary_size: artifact.metadata.vocabulary_size,
            n_trees: artifact.metadata.n_trees,
            elapsed_ms: start.elapsed().as_millis() as u64,
            artifact_path,
        })
    }
}

/// Fraction of training rows whose argmax class matches the label
fn training_accuracy(
    pipeline: &SuccessPipeline,
    features: &[FeatureVector],
    labels: &[OutcomeLabel],
) -> Result<f64> {
    let proba = pipeline.predict_proba(features)?;
    let correct = proba
        .rows()
        .into_iter()
        .zip(labels)
        .filter(|(row, label)| {
            let mut best = 0;
            for (i, p) in row.iter().enumerate() {
                if *p > row[best] {
                    best = i;
                }
            }
            best == label.index()
        })
        .count();
    Ok(correct as f64 / labels.len().max(1) as f64)
}
