// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Metrics Sink
// ─────────────────────────────────────────────────────────────────────
//! Consumer interface for prediction, monitor, and drift signals.
//!
//! Implementations live in `cdi-observers` (structured JSON logger,
//! Prometheus exporter). A guard holds an optional sink and emits one
//! prediction record per scored call.

use std::sync::Arc;

use crate::score::{Decision, KsResult, MonitorSummary};

pub trait MetricsSink: Send + Sync {
    fn log_prediction(&self, cdi_value: f64, decision: Decision, latency_ms: Option<f64>);

    fn log_monitor_summary(&self, summary: &MonitorSummary);

    fn log_drift(&self, ks_result: &KsResult, psi_value: f64);
}

/// Forwards every signal to each wrapped sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn MetricsSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for FanoutSink {
    fn log_prediction(&self, cdi_value: f64, decision: Decision, latency_ms: Option<f64>) {
        for sink in &self.sinks {
            sink.log_prediction(cdi_value, decision, latency_ms);
        }
    }

    fn log_monitor_summary(&self, summary: &MonitorSummary) {
        for sink in &self.sinks {
            sink.log_monitor_summary(summary);
        }
    }

    fn log_drift(&self, ks_result: &KsResult, psi_value: f64) {
        for sink in &self.sinks {
            sink.log_drift(ks_result, psi_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl MetricsSink for Counter {
        fn log_prediction(&self, _: f64, _: Decision, _: Option<f64>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn log_monitor_summary(&self, _: &MonitorSummary) {
            self.0.fetch_add(10, Ordering::SeqCst);
        }
        fn log_drift(&self, _: &KsResult, _: f64) {
            self.0.fetch_add(100, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let fan = FanoutSink::new(vec![a.clone() as Arc<dyn MetricsSink>, b.clone()]);
        assert_eq!(fan.len(), 2);
        fan.log_prediction(0.5, Decision::Accept, None);
        fan.log_drift(
            &KsResult {
                statistic: 0.1,
                p_value: 0.9,
                drift: false,
            },
            0.01,
        );
        assert_eq!(a.0.load(Ordering::SeqCst), 101);
        assert_eq!(b.0.load(Ordering::SeqCst), 101);
    }
}
