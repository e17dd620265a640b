//! Incubator project success prediction
//!
//! This crate provides the core functionality for:
//! - Feature extraction from free-text project descriptions
//! - Training a three-tier (Low/Medium/High) classifier from labeled CSV data
//! - Atomic, checksummed persistence of the trained model
//! - Prediction with a deterministic natural-language explanation
//! - Metrics and structured logging

pub mod dataset;
pub mod error;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod service;
pub mod store;
pub mod trainer;

pub use error::{NotTrainedCause, Result, SuccessError};
pub use models::*;
pub use observability::{StructuredLogger, SuccessMetrics};
pub use predictor::{predict_project, FeatureExtractor, SuccessPredictor};
pub use service::SuccessService;
pub use store::{ArtifactMetadata, ModelArtifact, ModelStore, DEFAULT_MODEL_PATH};
pub use trainer::{ModelTrainer, TrainerConfig, TrainingReport};
