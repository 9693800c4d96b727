// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Structured CDI Metrics Logger
// ─────────────────────────────────────────────────────────────────────
//! JSON metric records for predictions, monitor summaries, and drift.
//!
//! Every record carries `service`, `timestamp` (UTC seconds) and an
//! `event` tag (`prediction`, `cdi_summary`, `cdi_drift`). Records go to
//! a [`RecordEmitter`]: stdout, the `log` facade, or a caller-supplied
//! destination.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use cdi_types::{Decision, GuardConfig, KsResult, MetricsSink, MonitorSummary};

pub const DEFAULT_SERVICE_NAME: &str = "cdi_guardrail";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricEvent {
    Prediction {
        cdi: f64,
        decision: Decision,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        latency_ms: Option<f64>,
    },
    CdiSummary(MonitorSummary),
    CdiDrift {
        ks_statistic: f64,
        ks_p_value: f64,
        ks_drift: bool,
        psi: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub service: String,
    pub timestamp: f64,
    #[serde(flatten)]
    pub event: MetricEvent,
}

impl MetricRecord {
    /// Stamp `event` with the current UTC time.
    pub fn now(service: &str, event: MetricEvent) -> Self {
        Self {
            service: service.to_string(),
            timestamp: Utc::now().timestamp_micros() as f64 / 1e6,
            event,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Destination for finished records.
pub trait RecordEmitter: Send + Sync {
    fn emit(&self, record: &MetricRecord);
}

impl<F> RecordEmitter for F
where
    F: Fn(&MetricRecord) + Send + Sync,
{
    fn emit(&self, record: &MetricRecord) {
        self(record)
    }
}

/// One JSON line per record on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutEmitter;

impl RecordEmitter for StdoutEmitter {
    fn emit(&self, record: &MetricRecord) {
        match record.to_json() {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("failed to encode metric record: {e}"),
        }
    }
}

/// Records as `log::info!` lines under target `cdi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmitter;

impl RecordEmitter for LogEmitter {
    fn emit(&self, record: &MetricRecord) {
        match record.to_json() {
            Ok(line) => log::info!(target: "cdi", "{line}"),
            Err(e) => log::error!("failed to encode metric record: {e}"),
        }
    }
}

/// [`MetricsSink`] that turns every signal into a [`MetricRecord`].
#[derive(Clone)]
pub struct CdiLogger {
    service_name: String,
    emitter: Arc<dyn RecordEmitter>,
}

impl CdiLogger {
    /// Logger writing to stdout.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::with_emitter(service_name, Arc::new(StdoutEmitter))
    }

    pub fn with_emitter(service_name: impl Into<String>, emitter: Arc<dyn RecordEmitter>) -> Self {
        Self {
            service_name: service_name.into(),
            emitter,
        }
    }

    pub fn from_config(config: &GuardConfig, emitter: Arc<dyn RecordEmitter>) -> Self {
        Self::with_emitter(config.service_name.clone(), emitter)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn send(&self, event: MetricEvent) {
        self.emitter
            .emit(&MetricRecord::now(&self.service_name, event));
    }
}

impl Default for CdiLogger {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl MetricsSink for CdiLogger {
    fn log_prediction(&self, cdi_value: f64, decision: Decision, latency_ms: Option<f64>) {
        self.send(MetricEvent::Prediction {
            cdi: cdi_value,
            decision,
            latency_ms,
        });
    }

    fn log_monitor_summary(&self, summary: &MonitorSummary) {
        self.send(MetricEvent::CdiSummary(*summary));
    }

    fn log_drift(&self, ks_result: &KsResult, psi_value: f64) {
        self.send(MetricEvent::CdiDrift {
            ks_statistic: ks_result.statistic,
            ks_p_value: ks_result.p_value,
            ks_drift: ks_result.drift,
            psi: psi_value,
        });
    }
}
