//! Feature extraction for project success classification
//!
//! Turns one ProjectRecord into the fixed-schema FeatureVector consumed by
//! the pipeline. Features include text size, tiered keyword hits, numeric
//! and money signals, progress bands and project age.
//!
//! Extraction is total: malformed or missing inputs fall back to defaults
//! instead of failing.

use crate::models::{FeatureVector, ProjectRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Age assumed when `created_at` is missing or unparseable
pub const DEFAULT_DAYS_SINCE_CREATION: i64 = 30;

/// Projects at most this old count as new
pub const NEW_PROJECT_DAYS: i64 = 30;

/// Projects at least this old count as mature
pub const MATURE_PROJECT_DAYS: i64 = 90;

pub const HIGH_PROGRESS_THRESHOLD: f64 = 70.0;
pub const MEDIUM_PROGRESS_THRESHOLD: f64 = 40.0;

/// Strongest success signals: traction, revenue, team and growth
pub const HIGH_SUCCESS_KEYWORDS: &[&str] = &[
    "clientes activos",
    "ingresos recurrentes",
    "usuarios",
    "ventas",
    "revenue",
    "mrr",
    "funding",
    "inversión",
    "crecimiento",
    "empleados",
    "equipo",
    "escalamiento",
    "expansión",
    "profitability",
    "validado",
    "mercado validado",
];

/// Product under construction, early validation
pub const MEDIUM_SUCCESS_KEYWORDS: &[&str] = &[
    "prototipo",
    "mvp",
    "desarrollo",
    "pruebas",
    "testing",
    "beta",
    "financiamiento",
    "modelo de negocio",
    "pitch",
    "equipo formado",
    "primeros clientes",
    "feedback",
    "iteración",
];

/// Exploratory, pre-product language
pub const LOW_SUCCESS_KEYWORDS: &[&str] = &[
    "idea",
    "concepto",
    "inicial",
    "exploración",
    "investigación",
    "sin validación",
    "fase inicial",
    "brainstorming",
];

/// Each high-tier hit counts double
const HIGH_KEYWORD_WEIGHT: u32 = 2;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

fn percentage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%|\d+\s*por\s*ciento").expect("valid percentage regex"))
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$|USD|pesos|dólares|ingresos").expect("valid money regex"))
}

/// Extracts features from a project record
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    reference_time: Option<DateTime<Utc>>,
}

impl FeatureExtractor {
    /// Extractor measuring project age against the wall clock
    pub fn new() -> Self {
        Self { reference_time: None }
    }

    /// Extractor measuring project age against a fixed instant
    pub fn at(reference_time: DateTime<Utc>) -> Self {
        Self {
            reference_time: Some(reference_time),
        }
    }

    pub fn extract(&self, record: &ProjectRecord) -> FeatureVector {
        let description = record.description.as_str();
        let lowered = description.to_lowercase();

        let high_keywords = count_hits(&lowered, HIGH_SUCCESS_KEYWORDS) * HIGH_KEYWORD_WEIGHT;
        let medium_keywords = count_hits(&lowered, MEDIUM_SUCCESS_KEYWORDS);
        let low_keywords = count_hits(&lowered, LOW_SUCCESS_KEYWORDS);
        let keyword_score = high_keywords * 3 + medium_keywords * 2 + low_keywords;

        let has_numbers = digits_re().is_match(description);
        let has_percentage = percentage_re().is_match(description);
        let has_money = money_re().is_match(description);

        let progress = clamp_progress(record.progress);
        let is_high_progress = progress >= HIGH_PROGRESS_THRESHOLD;
        let is_medium_progress =
            progress >= MEDIUM_PROGRESS_THRESHOLD && progress < HIGH_PROGRESS_THRESHOLD;
        let is_low_progress = progress < MEDIUM_PROGRESS_THRESHOLD;

        let days_since_creation = self.days_since(record.created_at.as_deref());
        let is_new = days_since_creation <= NEW_PROJECT_DAYS;
        let is_mature = days_since_creation >= MATURE_PROJECT_DAYS;

        let high_success_score = high_keywords * 3
            + u32::from(is_high_progress) * 2
            + u32::from(has_money) * 2
            + u32::from(has_numbers)
            + u32::from(is_mature);
        let low_success_score =
            low_keywords * 2 + u32::from(is_low_progress) * 2 + u32::from(is_new);

        FeatureVector {
            text: description.to_string(),
            desc_len: description.chars().count(),
            word_count: description.split_whitespace().count(),
            high_keywords,
            medium_keywords,
            low_keywords,
            keyword_score,
            has_numbers,
            has_percentage,
            has_money,
            progress,
            progress_squared: progress * progress,
            is_high_progress,
            is_medium_progress,
            is_low_progress,
            days_since_creation,
            is_new,
            is_mature,
            high_success_score,
            low_success_score,
        }
    }

    fn days_since(&self, created_at: Option<&str>) -> i64 {
        let Some(created) = created_at.and_then(parse_created_at) else {
            return DEFAULT_DAYS_SINCE_CREATION;
        };
        let now = self.reference_time.unwrap_or_else(Utc::now);
        (now - created).num_days().max(0)
    }
}

/// Clamp progress into [0, 100]; missing progress is 0
pub fn clamp_progress(progress: Option<i64>) -> f64 {
    progress.unwrap_or(0).clamp(0, 100) as f64
}

fn count_hits(lowered: &str, vocabulary: &[&str]) -> u32 {
    vocabulary.iter().filter(|kw| lowered.contains(*kw)).count() as u32
}

/// Parse the date-like strings seen in project exports. Naive values are read as UTC.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() || matches!(s.to_lowercase().as_str(), "none" | "null" | "nan" | "nat") {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
