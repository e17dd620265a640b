//! Deterministic natural-language rationale for a prediction

use super::features::{HIGH_PROGRESS_THRESHOLD, MEDIUM_PROGRESS_THRESHOLD};
use crate::models::{FeatureAnalysis, OutcomeLabel, Probabilities};

/// Progress below which a Low prediction calls out slow progress
pub const LOW_PROGRESS_NOTE_THRESHOLD: i64 = 30;

/// Max probability above which confidence is reported as high
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// Max probability above which confidence is reported as moderate
pub const MODERATE_CONFIDENCE: f64 = 0.5;

/// Text shown in place of a rationale when the prediction is a fallback
pub const FALLBACK_EXPLANATION: &str =
    "The project could not be analyzed reliably. Try again with more detail.";

/// Build the explanation for `label` from the feature snapshot and the
/// class distribution. The same inputs always produce the same text.
pub fn explain(label: OutcomeLabel, analysis: &FeatureAnalysis, probabilities: &Probabilities) -> String {
    let mut clauses: Vec<String> = vec![opener(label).to_string()];
    clauses.extend(details(label, analysis));
    clauses.push(recommendation(label).to_string());
    clauses.push(confidence_qualifier(probabilities.max()).to_string());
    clauses.join(" ")
}

fn opener(label: OutcomeLabel) -> &'static str {
    match label {
        OutcomeLabel::Low => "This project is in an early-stage phase.",
        OutcomeLabel::Medium => "This project is in active development.",
        OutcomeLabel::High => "This project shows a mature profile.",
    }
}

fn details(label: OutcomeLabel, analysis: &FeatureAnalysis) -> Vec<String> {
    let progress = analysis.progress;
    let mut out = Vec::new();
    match label {
        OutcomeLabel::Low => {
            if progress < LOW_PROGRESS_NOTE_THRESHOLD {
                out.push("Progress is still low.".to_string());
            }
            if analysis.low_keywords_found > 0 {
                out.push("Exploratory, early-stage language was detected.".to_string());
            }
        }
        OutcomeLabel::Medium => {
            let p = progress as f64;
            if (MEDIUM_PROGRESS_THRESHOLD..HIGH_PROGRESS_THRESHOLD).contains(&p) {
                out.push(format!("Moderate progress ({}%).", progress));
            }
            if analysis.medium_keywords_found > 0 {
                out.push("Development signals were identified.".to_string());
            }
        }
        OutcomeLabel::High => {
            if progress as f64 >= HIGH_PROGRESS_THRESHOLD {
                out.push(format!("High progress ({}%).", progress));
            }
            if analysis.high_keywords_found > 0 {
                out.push("Success indicators were detected (customers, revenue, users).".to_string());
            }
        }
    }
    out
}

fn recommendation(label: OutcomeLabel) -> &'static str {
    match label {
        OutcomeLabel::Low => "Recommendation: build a prototype and validate it with customers.",
        OutcomeLabel::Medium => {
            "Recommendation: keep validating the business model and look for traction."
        }
        OutcomeLabel::High => "Recommendation: focus on scaling and optimizing operations.",
    }
}

fn confidence_qualifier(max_probability: f64) -> &'static str {
    if max_probability > HIGH_CONFIDENCE {
        "High confidence in this prediction."
    } else if max_probability > MODERATE_CONFIDENCE {
        "Moderate confidence."
    } else {
        "Uncertain prediction, consider more context."
    }
}
