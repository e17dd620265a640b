//! Orchestration facade for a hosting application
//!
//! Predictions run inline against a cached predictor. Retraining runs on
//! the blocking thread pool, one run at a time, and swaps the cached
//! predictor once the new artifact is stored.

use crate::error::{Result, SuccessError};
use crate::models::{PredictionResult, ProjectRecord};
use crate::predictor::SuccessPredictor;
use crate::store::ModelStore;
use crate::trainer::{ModelTrainer, TrainerConfig, TrainingReport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub struct SuccessService {
    store: Arc<ModelStore>,
    config: TrainerConfig,
    predictor: RwLock<Option<Arc<SuccessPredictor>>>,
    training: Arc<AtomicBool>,
}

impl SuccessService {
    pub fn new(store: ModelStore, config: TrainerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            predictor: RwLock::new(None),
            training: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn is_training(&self) -> bool {
        self.training.load(Ordering::SeqCst)
    }

    /// Predict one record, loading the stored model on first use
    pub fn predict(&self, record: &ProjectRecord) -> Result<PredictionResult> {
        Ok(self.predictor()?.predict(record))
    }

    /// Train from `csv_path` and replace the stored model.
    ///
    /// Returns [`SuccessError::TrainingInProgress`] if a run is already active.
    pub async fn retrain(&self, csv_path: impl Into<PathBuf>) -> Result<TrainingReport> {
        let guard = TrainingGuard::acquire(&self.training)?;
        let csv_path = csv_path.into();
        let store = Arc::clone(&self.store);
        let trainer = ModelTrainer::new(self.config.clone());

        info!(csv = %csv_path.display(), "Retraining started");
        let report = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            trainer.train_csv(&csv_path, &store)
        })
        .await
        .map_err(|e| {
            SuccessError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("training task failed: {}", e),
            ))
        })??;

        let fresh = Arc::new(SuccessPredictor::from_store(&self.store)?);
        *self.predictor.write().unwrap_or_else(|e| e.into_inner()) = Some(fresh);
        info!(path = %report.artifact_path.display(), "Retraining finished, predictor reloaded");
        Ok(report)
    }

    fn predictor(&self) -> Result<Arc<SuccessPredictor>> {
        if let Some(p) = self.predictor.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(Arc::clone(p));
        }
        let loaded = Arc::new(SuccessPredictor::from_store(&self.store)?);
        let mut slot = self.predictor.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(slot.get_or_insert(loaded)))
    }
}

/// Clears the in-progress flag when the training work ends
struct TrainingGuard {
    flag: Arc<AtomicBool>,
}

impl TrainingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Retrain requested while another run is active");
            return Err(SuccessError::TrainingInProgress);
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample::generate_sample_csv;
    use crate::pipeline::{ForestConfig, PipelineConfig};
    use chrono::Utc;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> SuccessService {
        let config = TrainerConfig {
            pipeline: PipelineConfig {
                forest: ForestConfig::default().with_n_estimators(15),
                ..Default::default()
            },
            ..Default::default()
        };
        SuccessService::new(ModelStore::new(dir.path().join("model.json")), config)
    }

    fn sample_csv(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, generate_sample_csv(Utc::now().date_naive()).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_predict_before_training_is_not_trained() {
        let dir = TempDir::new().unwrap();
        let err = service(&dir).predict(&ProjectRecord::new("Idea")).unwrap_err();
        assert!(err.is_not_trained());
    }

    #[tokio::test]
    async fn test_retrain_then_predict() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let report = svc.retrain(sample_csv(&dir)).await.unwrap();

        assert_eq!(report.rows_used, 45);
        assert_eq!(report.class_counts, [15, 15, 15]);
        assert!(!svc.is_training());

        let result = svc
            .predict(&ProjectRecord::new("MVP en desarrollo con usuarios beta").with_progress(50))
            .unwrap();
        assert!(!result.is_fallback);
        assert!((result.probabilities.sum() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_retrain_rejected() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let _held = TrainingGuard::acquire(&svc.training).unwrap();

        let err = svc.retrain(sample_csv(&dir)).await.unwrap_err();
        assert!(matches!(err, SuccessError::TrainingInProgress));
        assert!(!svc.store().exists());
    }

    #[tokio::test]
    async fn test_failed_retrain_releases_flag() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let err = svc.retrain(dir.path().join("missing.csv")).await.unwrap_err();
        assert!(matches!(err, SuccessError::Io(_)));
        assert!(!svc.is_training());
    }
}
