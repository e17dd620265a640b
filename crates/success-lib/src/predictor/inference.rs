//! Inference over a stored model artifact
//!
//! Loads the artifact once, then answers predictions with the fitted
//! pipeline. Unexpected failures while transforming or classifying are
//! logged and turned into a flagged neutral answer instead of an error.

use super::explain::{explain, FALLBACK_EXPLANATION};
use super::FeatureExtractor;
use crate::error::{NotTrainedCause, Result, SuccessError};
use crate::models::{FeatureAnalysis, OutcomeLabel, PredictionResult, Probabilities, ProjectRecord};
use crate::observability::{SuccessMetrics, StructuredLogger};
use crate::store::{ArtifactMetadata, ModelArtifact, ModelStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Class distribution returned when classification fails
pub const FALLBACK_PROBABILITIES: [f64; 3] = [0.33, 0.34, 0.33];

/// Tolerance for a classifier row to count as already normalized
const SUM_TOLERANCE: f64 = 1e-6;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// Predictor bound to one loaded artifact
pub struct SuccessPredictor {
    artifact: ModelArtifact,
    extractor: FeatureExtractor,
    metrics: SuccessMetrics,
    logger: StructuredLogger,
    inference_count: AtomicU64,
    fallback_count: AtomicU64,
}

impl SuccessPredictor {
    pub fn new(artifact: ModelArtifact) -> Self {
        let metrics = SuccessMetrics::new();
        metrics.set_model_version(&artifact.metadata.version);
        Self {
            artifact,
            extractor: FeatureExtractor::new(),
            metrics,
            logger: StructuredLogger::new("predictor"),
            inference_count: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
        }
    }

    /// Load the artifact from `store`. Absent and corrupt artifacts both
    /// surface as [`SuccessError::ModelNotTrained`].
    pub fn from_store(store: &ModelStore) -> Result<Self> {
        match store.load() {
            Ok(Some(artifact)) => Ok(Self::new(artifact)),
            Ok(None) => Err(SuccessError::ModelNotTrained {
                path: store.path().to_path_buf(),
                cause: NotTrainedCause::Absent,
            }),
            Err(SuccessError::CorruptArtifact { path, reason }) => {
                warn!(path = %path.display(), reason = %reason, "Stored model is unusable");
                Err(SuccessError::ModelNotTrained {
                    path,
                    cause: NotTrainedCause::Corrupt(reason),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Use a fixed clock for project age instead of the wall clock
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.artifact.metadata
    }

    pub fn model_version(&self) -> &str {
        &self.artifact.metadata.version
    }

    pub fn predict(&self, record: &ProjectRecord) -> PredictionResult {
        let start = Instant::now();
        let features = self.extractor.extract(record);
        let analysis = FeatureAnalysis::from(&features);

        let result = match self.classify(&features) {
            Ok(values) => {
                let probabilities = Probabilities::new(&self.artifact.metadata.class_names, &values);
                let label_index = probabilities.argmax();
                let label = OutcomeLabel::from_index(label_index).unwrap_or(OutcomeLabel::Medium);
                let confidence = values[label_index];
                let explanation = explain(label, &analysis, &probabilities);
                debug!(probabilities = ?values, label = %label, "Record classified");
                PredictionResult {
                    label: self.class_name(label_index),
                    label_index,
                    probabilities,
                    confidence,
                    feature_analysis: analysis,
                    explanation,
                    is_fallback: false,
                    model_version: self.model_version().to_string(),
                }
            }
            Err(e) => {
                error!(error = %e, "Prediction failed, returning neutral fallback");
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                fallback_result(&self.artifact.metadata.class_names, analysis, self.model_version())
            }
        };

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }

        self.metrics
            .record_prediction(&result.label, result.is_fallback, elapsed.as_secs_f64());
        self.logger.log_prediction(
            &result.label,
            result.confidence,
            result.feature_analysis.progress,
            result.is_fallback,
            &result.model_version,
        );
        result
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            fallbacks: self.fallback_count.load(Ordering::Relaxed),
        }
    }

    fn classify(&self, features: &crate::models::FeatureVector) -> Result<Vec<f64>> {
        let values = self.artifact.pipeline.predict_proba_one(features)?;
        normalize_distribution(values)
    }

    fn class_name(&self, index: usize) -> String {
        self.artifact
            .metadata
            .class_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| OutcomeLabel::ALL[index.min(2)].name().to_string())
    }
}

/// Load the artifact at `store` and predict a single record
pub fn predict_project(record: &ProjectRecord, store: &ModelStore) -> Result<PredictionResult> {
    let predictor = SuccessPredictor::from_store(store)?;
    Ok(predictor.predict(record))
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub fallbacks: u64,
}

/// Check a raw classifier row and rescale it to sum to exactly 1
fn normalize_distribution(values: Vec<f64>) -> Result<Vec<f64>> {
    if values.len() != OutcomeLabel::COUNT {
        return Err(SuccessError::Inference(format!(
            "classifier returned {} probabilities, expected {}",
            values.len(),
            OutcomeLabel::COUNT
        )));
    }
    if values.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(SuccessError::Inference(format!(
            "classifier returned invalid probabilities {:?}",
            values
        )));
    }
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 {
        return Err(SuccessError::Inference("classifier returned an all-zero distribution".to_string()));
    }
    if (sum - 1.0).abs() <= SUM_TOLERANCE {
        return Ok(values);
    }
    Ok(values.into_iter().map(|p| p / sum).collect())
}

fn fallback_result(class_names: &[String], analysis: FeatureAnalysis, model_version: &str) -> PredictionResult {
    let label = OutcomeLabel::Medium;
    let probabilities = Probabilities::new(class_names, &FALLBACK_PROBABILITIES);
    PredictionResult {
        label: label.name().to_string(),
        label_index: label.index(),
        confidence: FALLBACK_PROBABILITIES[label.index()],
        probabilities,
        feature_analysis: analysis,
        explanation: FALLBACK_EXPLANATION.to_string(),
        is_fallback: true,
        model_version: model_version.to_string(),
    }
}
