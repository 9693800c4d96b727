// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Prometheus CDI Exporter
// ─────────────────────────────────────────────────────────────────────
//! [`MetricsSink`] backed by a private `prometheus::Registry`.
//!
//! Consumes the same signals as [`crate::logging::CdiLogger`]; attach
//! both through a fan-out sink when JSON logs and scraping are wanted.

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

use cdi_types::{Decision, GuardError, GuardResult, KsResult, MetricsSink, MonitorSummary};

pub const DEFAULT_NAMESPACE: &str = "cdi";

pub const CDI_BUCKETS: [f64; 8] = [0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99, 1.0];
pub const LATENCY_BUCKETS_MS: [f64; 8] = [1.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0];

fn telemetry(e: prometheus::Error) -> GuardError {
    GuardError::Telemetry(e.to_string())
}

pub struct PrometheusSink {
    namespace: String,
    registry: Registry,
    cdi_value: Histogram,
    prediction_latency: Histogram,
    decision_count: CounterVec,
    cdi_mean: Gauge,
    cdi_p95: Gauge,
    ks_statistic: Gauge,
    psi_value: Gauge,
    ks_drift_flag: Gauge,
}

impl PrometheusSink {
    pub fn new(namespace: &str) -> GuardResult<Self> {
        let registry = Registry::new();

        let histogram = |name: &str, help: &str, buckets: &[f64]| -> GuardResult<Histogram> {
            let h = Histogram::with_opts(
                HistogramOpts::new(name, help)
                    .namespace(namespace)
                    .buckets(buckets.to_vec()),
            )
            .map_err(telemetry)?;
            registry.register(Box::new(h.clone())).map_err(telemetry)?;
            Ok(h)
        };
        let gauge = |name: &str, help: &str| -> GuardResult<Gauge> {
            let g = Gauge::with_opts(Opts::new(name, help).namespace(namespace))
                .map_err(telemetry)?;
            registry.register(Box::new(g.clone())).map_err(telemetry)?;
            Ok(g)
        };

        let cdi_value = histogram("cdi_value", "CDI value per prediction", &CDI_BUCKETS)?;
        let prediction_latency = histogram(
            "prediction_latency_ms",
            "Prediction latency in ms",
            &LATENCY_BUCKETS_MS,
        )?;
        let decision_count = CounterVec::new(
            Opts::new("decision_total", "Decision counts by type").namespace(namespace),
            &["decision"],
        )
        .map_err(telemetry)?;
        registry
            .register(Box::new(decision_count.clone()))
            .map_err(telemetry)?;

        let cdi_mean = gauge("cdi_mean", "Rolling mean CDI")?;
        let cdi_p95 = gauge("cdi_p95", "Rolling p95 CDI")?;
        let ks_statistic = gauge("cdi_ks_statistic", "KS statistic for CDI drift")?;
        let psi_value = gauge("cdi_psi", "Population Stability Index for CDI")?;
        let ks_drift_flag = gauge("cdi_ks_drift", "KS drift detected (1 = drift)")?;

        Ok(Self {
            namespace: namespace.to_string(),
            registry,
            cdi_value,
            prediction_latency,
            decision_count,
            cdi_mean,
            cdi_p95,
            ks_statistic,
            psi_value,
            ks_drift_flag,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format of every registered metric.
    pub fn gather_text(&self) -> GuardResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(telemetry)?;
        String::from_utf8(buf).map_err(|e| GuardError::Telemetry(e.to_string()))
    }
}

impl MetricsSink for PrometheusSink {
    fn log_prediction(&self, cdi_value: f64, decision: Decision, latency_ms: Option<f64>) {
        self.cdi_value.observe(cdi_value);
        self.decision_count
            .with_label_values(&[decision.as_str()])
            .inc();
        if let Some(ms) = latency_ms {
            self.prediction_latency.observe(ms);
        }
    }

    fn log_monitor_summary(&self, summary: &MonitorSummary) {
        if summary.count == 0 {
            return;
        }
        self.cdi_mean.set(summary.mean);
        self.cdi_p95.set(summary.p95);
    }

    fn log_drift(&self, ks_result: &KsResult, psi_value: f64) {
        self.ks_statistic.set(ks_result.statistic);
        self.psi_value.set(psi_value);
        self.ks_drift_flag
            .set(if ks_result.drift { 1.0 } else { 0.0 });
    }
}
