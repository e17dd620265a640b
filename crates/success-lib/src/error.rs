//! Error types for training, storage and prediction

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for success-lib operations
pub type Result<T> = std::result::Result<T, SuccessError>;

/// Why a prediction could not find a usable model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotTrainedCause {
    /// Nothing has been stored at the location yet
    Absent,
    /// A file exists but could not be read back as a model
    Corrupt(String),
}

impl fmt::Display for NotTrainedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotTrainedCause::Absent => write!(f, "no model artifact stored"),
            NotTrainedCause::Corrupt(reason) => write!(f, "stored artifact is unusable: {}", reason),
        }
    }
}

/// Main error type for the success predictor
#[derive(Error, Debug)]
pub enum SuccessError {
    /// Malformed or missing required training columns
    #[error("Input error: {0}")]
    Input(String),

    /// No usable rows survived cleaning
    #[error("Empty dataset: no usable rows remain after cleaning ({rows_read} read)")]
    EmptyDataset { rows_read: usize },

    /// Predict requested without a usable artifact
    #[error("Model not trained at {path:?} ({cause}); train the model first")]
    ModelNotTrained { path: PathBuf, cause: NotTrainedCause },

    /// Unexpected failure while transforming features or classifying
    #[error("Inference error: {0}")]
    Inference(String),

    /// Artifact file exists but failed to parse or verify
    #[error("Corrupt model artifact at {path:?}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    /// Another writer holds the store lock
    #[error("Model store at {0:?} is locked by another writer")]
    StoreLocked(PathBuf),

    /// A retrain was requested while one is already running
    #[error("A training run is already in progress")]
    TrainingInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SuccessError {
    /// True for the errors a caller should surface as "train the model first"
    pub fn is_not_trained(&self) -> bool {
        matches!(self, SuccessError::ModelNotTrained { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_trained_message_mentions_training() {
        let err = SuccessError::ModelNotTrained {
            path: PathBuf::from("models/m.json"),
            cause: NotTrainedCause::Absent,
        };
        assert!(err.is_not_trained());
        assert!(err.to_string().contains("train the model first"));
    }

    #[test]
    fn test_corrupt_cause_display() {
        let cause = NotTrainedCause::Corrupt("checksum mismatch".to_string());
        assert!(cause.to_string().contains("checksum mismatch"));
    }
}
