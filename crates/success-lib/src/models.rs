//! Core data models for the success predictor

use serde::de::IgnoredAny;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One incubation project as submitted by the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Free-text description, may be empty
    #[serde(default)]
    pub description: String,
    /// Progress percentage, intended 0-100; missing or malformed counts as 0
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: Option<i64>,
    /// Creation date as an ISO-like string; missing counts as 30 days old
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ProjectRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            progress: None,
            created_at: None,
        }
    }

    pub fn with_progress(mut self, progress: i64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    /// Lenient progress parsing for text sources ("42", "42.7", " 90 ").
    ///
    /// Fractional values are truncated; anything non-numeric is treated as missing.
    pub fn parse_progress(raw: &str) -> Option<i64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Some(v);
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v.trunc() as i64),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Accept a number or numeric string; anything else is treated as missing
fn lenient_progress<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let progress = match Option::<RawProgress>::deserialize(deserializer)? {
        Some(RawProgress::Integer(v)) => Some(v),
        Some(RawProgress::Float(v)) if v.is_finite() => Some(v.trunc() as i64),
        Some(RawProgress::Text(s)) => ProjectRecord::parse_progress(&s),
        Some(RawProgress::Float(_)) | Some(RawProgress::Other(_)) | None => None,
    };
    Ok(progress)
}

/// Canonical success tier. The ordering Low < Medium < High is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeLabel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl OutcomeLabel {
    pub const ALL: [OutcomeLabel; 3] = [OutcomeLabel::Low, OutcomeLabel::Medium, OutcomeLabel::High];
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            OutcomeLabel::Low => "Low",
            OutcomeLabel::Medium => "Medium",
            OutcomeLabel::High => "High",
        }
    }

    /// Class names in index order, as persisted in the model artifact
    pub fn class_names() -> Vec<String> {
        Self::ALL.iter().map(|l| l.name().to_string()).collect()
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engineered representation of a ProjectRecord.
///
/// Field order of [`FeatureVector::numeric_values`] matches
/// [`FeatureVector::NUMERIC_FEATURES`] and never changes between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub text: String,
    pub desc_len: usize,
    pub word_count: usize,
    /// Weighted high-tier hits (2 per matching term)
    pub high_keywords: u32,
    pub medium_keywords: u32,
    pub low_keywords: u32,
    pub keyword_score: u32,
    pub has_numbers: bool,
    pub has_percentage: bool,
    pub has_money: bool,
    /// Clamped to [0, 100]
    pub progress: f64,
    pub progress_squared: f64,
    pub is_high_progress: bool,
    pub is_medium_progress: bool,
    pub is_low_progress: bool,
    pub days_since_creation: i64,
    pub is_new: bool,
    pub is_mature: bool,
    pub high_success_score: u32,
    pub low_success_score: u32,
}

impl FeatureVector {
    pub const NUM_NUMERIC: usize = 19;

    pub const NUMERIC_FEATURES: [&'static str; Self::NUM_NUMERIC] = [
        "desc_len",
        "word_count",
        "keyword_score",
        "progress",
        "progress_squared",
        "days_since_creation",
        "high_keywords",
        "medium_keywords",
        "low_keywords",
        "has_numbers",
        "has_percentage",
        "has_money",
        "is_high_progress",
        "is_medium_progress",
        "is_low_progress",
        "is_new",
        "is_mature",
        "high_success_score",
        "low_success_score",
    ];

    pub fn numeric_values(&self) -> [f64; Self::NUM_NUMERIC] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            self.desc_len as f64,
            self.word_count as f64,
            self.keyword_score as f64,
            self.progress,
            self.progress_squared,
            self.days_since_creation as f64,
            self.high_keywords as f64,
            self.medium_keywords as f64,
            self.low_keywords as f64,
            flag(self.has_numbers),
            flag(self.has_percentage),
            flag(self.has_money),
            flag(self.is_high_progress),
            flag(self.is_medium_progress),
            flag(self.is_low_progress),
            flag(self.is_new),
            flag(self.is_mature),
            self.high_success_score as f64,
            self.low_success_score as f64,
        ]
    }
}

/// Feature snapshot kept in a prediction for explanation purposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnalysis {
    pub progress: i64,
    pub description_length: usize,
    pub word_count: usize,
    pub days_active: i64,
    pub high_keywords_found: u32,
    pub medium_keywords_found: u32,
    pub low_keywords_found: u32,
}

impl From<&FeatureVector> for FeatureAnalysis {
    fn from(f: &FeatureVector) -> Self {
        Self {
            progress: f.progress as i64,
            description_length: f.desc_len,
            word_count: f.word_count,
            days_active: f.days_since_creation,
            high_keywords_found: f.high_keywords,
            medium_keywords_found: f.medium_keywords,
            low_keywords_found: f.low_keywords,
        }
    }
}

/// Probability per class, kept in class-index order.
///
/// Serializes as a map of class name to probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities {
    entries: Vec<(String, f64)>,
}

impl Probabilities {
    pub fn new(class_names: &[String], values: &[f64]) -> Self {
        Self {
            entries: class_names.iter().cloned().zip(values.iter().copied()).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), *p))
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, p)| *p).collect()
    }

    pub fn get(&self, class_name: &str) -> Option<f64> {
        self.entries.iter().find(|(name, _)| name == class_name).map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// Index of the largest probability; ties go to the lowest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, (_, p)) in self.entries.iter().enumerate() {
            if *p > self.entries[best].1 {
                best = i;
            }
        }
        best
    }

    pub fn max(&self) -> f64 {
        self.entries.iter().map(|(_, p)| *p).fold(0.0, f64::max)
    }
}

impl Serialize for Probabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, p) in &self.entries {
            map.serialize_entry(name, p)?;
        }
        map.end()
    }
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    pub label_index: usize,
    pub probabilities: Probabilities,
    pub confidence: f64,
    pub feature_analysis: FeatureAnalysis,
    pub explanation: String,
    /// Set when the result is the degraded answer produced after an inference failure
    pub is_fallback: bool,
    pub model_version: String,
}

impl PredictionResult {
    pub fn outcome(&self) -> Option<OutcomeLabel> {
        OutcomeLabel::from_index(self.label_index)
    }
}
