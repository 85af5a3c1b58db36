//! Observability infrastructure for the impact engine
//!
//! Provides:
//! - Prometheus metrics (evaluations, failures, region fallbacks, latency, table sizes)
//! - Structured logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGaugeVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::models::RegionField;

/// Histogram buckets for evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000_001, 0.000_005, 0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    evaluations: IntCounterVec,
    evaluation_failures: IntCounterVec,
    region_fallbacks: IntCounter,
    evaluation_latency_seconds: Histogram,
    table_rows: IntGaugeVec,
    comparisons: IntCounterVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            evaluations: register_int_counter_vec!(
                "impact_engine_evaluations_total",
                "Usage records evaluated successfully",
                &["service_type"]
            )
            .expect("Failed to register evaluations_total"),

            evaluation_failures: register_int_counter_vec!(
                "impact_engine_evaluation_failures_total",
                "Usage records that failed evaluation, by error kind",
                &["kind"]
            )
            .expect("Failed to register evaluation_failures_total"),

            region_fallbacks: register_int_counter!(
                "impact_engine_region_fallbacks_total",
                "Evaluations that used the default region's factors"
            )
            .expect("Failed to register region_fallbacks_total"),

            evaluation_latency_seconds: register_histogram!(
                "impact_engine_evaluation_latency_seconds",
                "Time spent evaluating one usage record",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            table_rows: register_int_gauge_vec!(
                "impact_engine_reference_rows",
                "Rows loaded per reference table",
                &["table"]
            )
            .expect("Failed to register reference_rows"),

            comparisons: register_int_counter_vec!(
                "impact_engine_comparisons_total",
                "Comparison sets produced, by varied dimension",
                &["dimension"]
            )
            .expect("Failed to register comparisons_total"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance. Clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn inc_evaluations(&self, service_type: &str) {
        self.inner()
            .evaluations
            .with_label_values(&[service_type])
            .inc();
    }

    pub fn inc_evaluation_failures(&self, kind: &str) {
        self.inner()
            .evaluation_failures
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_region_fallbacks(&self) {
        self.inner().region_fallbacks.inc();
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    pub fn set_table_rows(&self, table: &str, rows: usize) {
        self.inner()
            .table_rows
            .with_label_values(&[table])
            .set(rows as i64);
    }

    pub fn inc_comparisons(&self, dimension: &str) {
        self.inner()
            .comparisons
            .with_label_values(&[dimension])
            .inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for engine events
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

    /// Log a completed reference data load
    pub fn log_store_loaded(
        &self,
        regions: usize,
        models: usize,
        resource_classes: usize,
        priced: bool,
        digest: &str,
    ) {
        info!(
            event = "reference_store_loaded",
            component = %self.component,
            regions = regions,
            models = models,
            resource_classes = resource_classes,
            pricing = priced,
            digest = %digest,
            "Reference data loaded"
        );
    }

    /// Log a region lookup that fell back to the default region
    pub fn log_region_fallback(&self, requested: &str, resolved: &str) {
        warn!(
            event = "region_fallback",
            component = %self.component,
            requested_region = %requested,
            resolved_region = %resolved,
            "Unknown region, using default region factors"
        );
    }

    /// Log use of a region whose factors were partly borrowed at load time
    pub fn log_defaulted_fields(&self, region: &str, fields: &[RegionField]) {
        debug!(
            event = "region_fields_defaulted",
            component = %self.component,
            region = %region,
            fields = ?fields,
            "Region factors include defaulted values"
        );
    }

    /// Log a negative or out-of-range coefficient found during evaluation
    pub fn log_integrity_fault(&self, subject: &str, field: &str, value: f64, reason: &str) {
        warn!(
            event = "data_integrity_fault",
            component = %self.component,
            subject = %subject,
            field = %field,
            value = value,
            reason = %reason,
            "Reference coefficient failed range check"
        );
    }

    pub fn log_evaluation(
        &self,
        service_type: &str,
        resource_id: &str,
        region: &str,
        energy_wh: f64,
        total_gco2e: f64,
    ) {
        debug!(
            event = "usage_evaluated",
            component = %self.component,
            service_type = %service_type,
            resource_id = %resource_id,
            region = %region,
            energy_wh = energy_wh,
            total_gco2e = total_gco2e,
            "Evaluated usage record"
        );
    }

    /// Log a finished comparison
    pub fn log_comparison(
        &self,
        dimension: &str,
        metric: &str,
        candidates: usize,
        failures: usize,
        best: Option<&str>,
    ) {
        if failures > 0 {
            warn!(
                event = "comparison_finished",
                component = %self.component,
                dimension = %dimension,
                metric = %metric,
                candidates = candidates,
                failures = failures,
                best = ?best,
                "Comparison finished with failed candidates"
            );
        } else {
            info!(
                event = "comparison_finished",
                component = %self.component,
                dimension = %dimension,
                metric = %metric,
                candidates = candidates,
                best = ?best,
                "Comparison finished"
            );
        }
    }
}
