//! Observability infrastructure for the success predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, fallbacks, training runs, model info)
//! - Structured event logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SuccessMetricsInner> = OnceLock::new();

struct SuccessMetricsInner {
    predictions_total: IntCounterVec,
    prediction_fallbacks_total: IntCounter,
    prediction_latency_seconds: Histogram,
    training_runs_total: IntCounter,
    training_failures_total: IntCounter,
    training_rows: IntGauge,
    model_info: GaugeVec,
}

impl SuccessMetricsInner {
    fn new() -> Self {
        Self {
            predictions_total: register_int_counter_vec!(
                "success_predictions_total",
                "Predictions served, by predicted tier",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_fallbacks_total: register_int_counter!(
                "success_prediction_fallbacks_total",
                "Predictions answered with the neutral fallback"
            )
            .expect("Failed to register prediction_fallbacks_total"),

            prediction_latency_seconds: register_histogram!(
                "success_prediction_latency_seconds",
                "Time spent extracting features and running the classifier",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_runs_total: register_int_counter!(
                "success_training_runs_total",
                "Completed training runs"
            )
            .expect("Failed to register training_runs_total"),

            training_failures_total: register_int_counter!(
                "success_training_failures_total",
                "Training runs that ended in an error"
            )
            .expect("Failed to register training_failures_total"),

            training_rows: register_int_gauge!(
                "success_training_rows",
                "Rows used by the most recent training run"
            )
            .expect("Failed to register training_rows"),

            model_info: register_gauge_vec!(
                "success_model_info",
                "Information about the currently loaded model",
                &["version"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Lightweight handle to the process-wide metrics. Clones share state.
#[derive(Clone)]
pub struct SuccessMetrics {
    _private: (),
}

impl Default for SuccessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SuccessMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SuccessMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SuccessMetricsInner {
        GLOBAL_METRICS.get_or_init(SuccessMetricsInner::new)
    }

    pub fn record_prediction(&self, label: &str, is_fallback: bool, duration_secs: f64) {
        let inner = self.inner();
        inner.predictions_total.with_label_values(&[label]).inc();
        if is_fallback {
            inner.prediction_fallbacks_total.inc();
        }
        inner.prediction_latency_seconds.observe(duration_secs);
    }

    pub fn record_training(&self, rows: usize) {
        self.inner().training_runs_total.inc();
        self.inner().training_rows.set(rows as i64);
    }

    pub fn inc_training_failures(&self) {
        self.inner().training_failures_total.inc();
    }

    /// Replace the model info series with the given version
    pub fn set_model_version(&self, version: &str) {
        self.inner().model_info.reset();
        self.inner().model_info.with_label_values(&[version]).set(1.0);
    }
}

/// Consistent event records for predictions and training
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_prediction(
        &self,
        label: &str,
        confidence: f64,
        progress: i64,
        is_fallback: bool,
        model_version: &str,
    ) {
        if is_fallback {
            warn!(
                event = "prediction_fallback",
                component = %self.component,
                progress = progress,
                "Served neutral fallback prediction"
            );
        } else {
            info!(
                event = "prediction_generated",
                component = %self.component,
                label = %label,
                confidence = confidence,
                progress = progress,
                model_version = %model_version,
                "Generated success prediction"
            );
        }
    }

    pub fn log_training_completed(
        &self,
        rows: usize,
        class_counts: [usize; 3],
        training_accuracy: f64,
        elapsed_ms: u128,
    ) {
        info!(
            event = "training_completed",
            component = %self.component,
            rows = rows,
            low = class_counts[0],
            medium = class_counts[1],
            high = class_counts[2],
            training_accuracy = training_accuracy,
            elapsed_ms = elapsed_ms as u64,
            "Model trained and saved"
        );
    }

    pub fn log_training_failed(&self, reason: &str) {
        warn!(
            event = "training_failed",
            component = %self.component,
            reason = %reason,
            "Training failed, previous model left in place"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = SuccessMetrics::new();
        let other = metrics.clone();

        metrics.record_prediction("High", false, 0.002);
        other.record_prediction("Medium", true, 0.001);
        metrics.record_training(45);
        metrics.inc_training_failures();
        metrics.set_model_version("2.0");

        let inner = metrics.inner();
        assert!(inner.predictions_total.with_label_values(&["High"]).get() >= 1);
        assert!(inner.prediction_fallbacks_total.get() >= 1);
        assert!(inner.training_runs_total.get() >= 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("trainer");
        assert_eq!(logger.component, "trainer");
    }
}
