//! Success prediction engine
//!
//! Extract -> transform -> classify -> explain, run fresh for every record.

mod explain;
mod features;
mod inference;

pub use explain::{explain, FALLBACK_EXPLANATION, HIGH_CONFIDENCE, MODERATE_CONFIDENCE};
pub use features::{
    clamp_progress, parse_created_at, FeatureExtractor, DEFAULT_DAYS_SINCE_CREATION,
    HIGH_PROGRESS_THRESHOLD, HIGH_SUCCESS_KEYWORDS, LOW_SUCCESS_KEYWORDS, MATURE_PROJECT_DAYS,
    MEDIUM_PROGRESS_THRESHOLD, MEDIUM_SUCCESS_KEYWORDS, NEW_PROJECT_DAYS,
};
pub use inference::{predict_project, InferenceStats, SuccessPredictor, FALLBACK_PROBABILITIES};
