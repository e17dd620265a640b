//! Model store: persistence of the single trained model artifact
//!
//! This module provides:
//! - Atomic replace on save (temp file, fsync, rename) so readers only ever
//!   observe the old or the new artifact
//! - A lock file guaranteeing at most one writer per location
//! - SHA256 checksum validation on load, reporting corrupt artifacts
//!   separately from absent ones

use crate::error::{Result, SuccessError};
use crate::models::OutcomeLabel;
use crate::pipeline::SuccessPipeline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Artifact format version written by this crate
pub const ARTIFACT_VERSION: &str = "2.0";

/// Location used when none is configured
pub const DEFAULT_MODEL_PATH: &str = "models/success_multiclass.json";

/// Descriptive data stored next to the fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    /// Class names in index order
    pub class_names: Vec<String>,
    pub rows_trained: usize,
    /// Accuracy on the training rows, for reference only
    pub training_accuracy: f64,
    pub vocabulary_size: usize,
    pub n_trees: usize,
}

/// A trained pipeline plus its metadata. Never mutated once written.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub pipeline: SuccessPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: SuccessPipeline, rows_trained: usize, training_accuracy: f64) -> Self {
        let metadata = ArtifactMetadata {
            version: ARTIFACT_VERSION.to_string(),
            trained_at: Utc::now(),
            class_names: OutcomeLabel::class_names(),
            rows_trained,
            training_accuracy,
            vocabulary_size: pipeline.vocabulary_size(),
            n_trees: pipeline.n_trees(),
        };
        Self { metadata, pipeline }
    }
}

#[derive(Serialize)]
struct StoredArtifactOut<'a> {
    metadata: &'a ArtifactMetadata,
    checksum: String,
    pipeline: &'a RawValue,
}

#[derive(Deserialize)]
struct StoredArtifactIn<'a> {
    metadata: ArtifactMetadata,
    checksum: String,
    #[serde(borrow)]
    pipeline: &'a RawValue,
}

/// File-backed store for one model artifact
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the artifact, replacing any previous one wholesale
    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let _lock = WriterLock::acquire(&self.sibling("lock"))?;

        let pipeline_json = serde_json::to_string(&artifact.pipeline)?;
        let checksum = compute_checksum(pipeline_json.as_bytes());
        let pipeline_raw = RawValue::from_string(pipeline_json)?;
        let bytes = serde_json::to_vec(&StoredArtifactOut {
            metadata: &artifact.metadata,
            checksum: checksum.clone(),
            pipeline: &*pipeline_raw,
        })?;

        let temp_path = self.sibling("tmp");
        if let Err(e) = write_synced(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            size = bytes.len(),
            checksum = %checksum,
            version = %artifact.metadata.version,
            "Model artifact saved"
        );
        Ok(self.path.clone())
    }

    /// Load the artifact. `Ok(None)` means nothing has been stored yet.
    pub fn load(&self) -> Result<Option<ModelArtifact>> {
        let Some(content) = self.read()? else {
            return Ok(None);
        };
        let stored = self.parse(&content)?;
        let pipeline: SuccessPipeline = serde_json::from_str(stored.pipeline.get())
            .map_err(|e| self.corrupt(format!("pipeline does not deserialize: {}", e)))?;

        debug!(
            path = %self.path.display(),
            version = %stored.metadata.version,
            trained_at = %stored.metadata.trained_at,
            "Model artifact loaded"
        );
        Ok(Some(ModelArtifact {
            metadata: stored.metadata,
            pipeline,
        }))
    }

    /// Verified metadata only, skipping pipeline deserialization
    pub fn metadata(&self) -> Result<Option<ArtifactMetadata>> {
        let Some(content) = self.read()? else {
            return Ok(None);
        };
        Ok(Some(self.parse(&content)?.metadata))
    }

    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.corrupt(format!("unreadable: {}", e))),
        }
    }

    fn parse<'a>(&self, content: &'a str) -> Result<StoredArtifactIn<'a>> {
        let stored: StoredArtifactIn<'a> = serde_json::from_str(content)
            .map_err(|e| self.corrupt(format!("invalid artifact document: {}", e)))?;

        let computed = compute_checksum(stored.pipeline.get().as_bytes());
        if computed != stored.checksum {
            warn!(
                path = %self.path.display(),
                expected = %stored.checksum,
                computed = %computed,
                "Model artifact checksum mismatch"
            );
            return Err(self.corrupt(format!(
                "checksum mismatch: expected {}, got {}",
                stored.checksum, computed
            )));
        }
        let expected = OutcomeLabel::class_names();
        if stored.metadata.class_names != expected {
            return Err(self.corrupt(format!(
                "class names {:?} do not match {:?}",
                stored.metadata.class_names, expected
            )));
        }
        Ok(stored)
    }

    fn corrupt(&self, reason: String) -> SuccessError {
        SuccessError::CorruptArtifact {
            path: self.path.clone(),
            reason,
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

/// Exclusive writer lock held for the lifetime of the guard
struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    fn acquire(path: &Path) -> Result<Self> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(SuccessError::StoreLocked(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release model store lock");
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureVector, ProjectRecord};
    use crate::pipeline::{ForestConfig, PipelineConfig};
    use crate::predictor::FeatureExtractor;
    use tempfile::TempDir;

    fn tiny_artifact() -> ModelArtifact {
        let extractor = FeatureExtractor::new();
        let rows = [
            ("idea inicial", 5, OutcomeLabel::Low),
            ("concepto sin validación", 3, OutcomeLabel::Low),
            ("mvp en desarrollo", 50, OutcomeLabel::Medium),
            ("prototipo beta", 55, OutcomeLabel::Medium),
            ("clientes activos y ventas", 90, OutcomeLabel::High),
            ("mrr creciendo con funding", 95, OutcomeLabel::High),
        ];
        let features: Vec<FeatureVector> = rows
            .iter()
            .map(|(d, p, _)| extractor.extract(&ProjectRecord::new(*d).with_progress(*p)))
            .collect();
        let labels: Vec<OutcomeLabel> = rows.iter().map(|(_, _, l)| *l).collect();
        let config = PipelineConfig {
            forest: ForestConfig::default().with_n_estimators(5),
            ..Default::default()
        };
        let pipeline = SuccessPipeline::fit(&features, &labels, &config).unwrap();
        ModelArtifact::new(pipeline, rows.len(), 1.0)
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"test model weights"));
    }

    #[test]
    fn test_load_absent_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("missing.json"));
        assert!(!store.exists());
        assert!(store.load().unwrap().is_none());
        assert!(store.metadata().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("nested").join("model.json"));
        let artifact = tiny_artifact();

        let path = store.save(&artifact).unwrap();
        assert_eq!(path, store.path());
        assert!(store.exists());
        assert!(!store.sibling("tmp").exists());
        assert!(!store.sibling("lock").exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.metadata, artifact.metadata);
        assert_eq!(loaded.metadata.class_names, vec!["Low", "Medium", "High"]);
        assert_eq!(loaded.metadata.version, ARTIFACT_VERSION);
        assert_eq!(loaded.pipeline.n_trees(), 5);
    }

    #[test]
    fn test_save_overwrites_previous_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("model.json"));
        let first = tiny_artifact();
        store.save(&first).unwrap();

        let mut second = tiny_artifact();
        second.metadata.rows_trained = 99;
        store.save(&second).unwrap();

        assert_eq!(store.metadata().unwrap().unwrap().rows_trained, 99);
    }

    #[test]
    fn test_garbage_file_is_corrupt_not_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.json");
        fs::write(&path, b"not json at all").unwrap();

        let err = ModelStore::new(&path).load().unwrap_err();
        assert!(matches!(err, SuccessError::CorruptArtifact { .. }));
    }

    #[test]
    fn test_tampered_pipeline_fails_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("model.json"));
        store.save(&tiny_artifact()).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let tampered = content.replacen("\"n_estimators\":5", "\"n_estimators\":6", 1);
        assert_ne!(content, tampered);
        fs::write(store.path(), tampered).unwrap();

        match store.load() {
            Err(SuccessError::CorruptArtifact { reason, .. }) => assert!(reason.contains("checksum")),
            other => panic!("expected corrupt artifact, got {:?}", other.map(|a| a.is_some())),
        }
    }

    #[test]
    fn test_renamed_class_fails_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("model.json"));
        store.save(&tiny_artifact()).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let tampered = content.replacen("\"Low\"", "\"Bogus\"", 1);
        assert_ne!(content, tampered);
        fs::write(store.path(), tampered).unwrap();

        match store.load() {
            Err(SuccessError::CorruptArtifact { reason, .. }) => assert!(reason.contains("class names")),
            other => panic!("expected corrupt artifact, got {:?}", other.map(|a| a.is_some())),
        }
        assert!(matches!(store.metadata(), Err(SuccessError::CorruptArtifact { .. })));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("model.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupied"), b"x").unwrap();
        let store = ModelStore::new(&target);

        assert!(store.save(&tiny_artifact()).is_err());
        assert!(!store.sibling("tmp").exists());
        assert!(!store.sibling("lock").exists());
    }

    #[test]
    fn test_held_lock_blocks_second_writer() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("model.json"));
        let _held = WriterLock::acquire(&store.sibling("lock")).unwrap();

        let err = store.save(&tiny_artifact()).unwrap_err();
        assert!(matches!(err, SuccessError::StoreLocked(_)));
        assert!(!store.exists());
    }

    #[test]
    fn test_default_location() {
        assert_eq!(ModelStore::default().path(), Path::new(DEFAULT_MODEL_PATH));
    }
}
