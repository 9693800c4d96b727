// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Monitor + Drift Integration Tests
// ─────────────────────────────────────────────────────────────────────

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use cdi_observers::{
    ks_drift, population_stability_index, CdiLogger, CdiMonitor, DriftDetector, MetricEvent,
    MetricRecord,
};
use cdi_types::{FanoutSink, MetricsSink};

fn clipped_normal(mean: f64, std: f64, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(mean, std).unwrap();
    (0..n)
        .map(|_| dist.sample(&mut rng).clamp(0.0, 1.0))
        .collect()
}

#[test]
fn test_monitor_summary_on_healthy_baseline() {
    let baseline = clipped_normal(0.75, 0.05, 1000, 0);
    let monitor = CdiMonitor::new(1000).unwrap();
    for &v in &baseline {
        monitor.update(v);
    }
    let s = monitor.summary().unwrap();
    assert_eq!(s.count, 1000);
    assert!(0.6 < s.mean && s.mean < 0.9);
    assert!(s.p95 >= s.p90 && s.p90 >= s.p50);
    assert!(s.p99 >= s.p95);
}

#[test]
fn test_no_false_drift_on_same_distribution() {
    let mut flagged = 0;
    for seed in 0..20 {
        let baseline = clipped_normal(0.75, 0.05, 1000, 2 * seed);
        let current = clipped_normal(0.75, 0.05, 1000, 2 * seed + 1);
        let ks = ks_drift(&baseline, &current, 0.05).unwrap();
        if ks.drift {
            flagged += 1;
        }
        let psi = population_stability_index(&baseline, &current, 10, 1e-6).unwrap();
        assert!(psi < 0.1, "seed {seed}: psi = {psi}");
    }
    // alpha = 0.05 → about one flag in twenty is expected
    assert!(flagged <= 5, "{flagged} of 20 identical-distribution pairs flagged");
}

#[test]
fn test_shifted_distribution_is_drift() {
    let baseline = clipped_normal(0.75, 0.05, 1000, 100);
    let current = clipped_normal(0.92, 0.03, 1000, 101);
    let report = DriftDetector::default().compare(&baseline, &current).unwrap();
    assert!(report.ks.drift);
    assert!(report.ks.p_value < 1e-6);
    assert!(report.psi > 0.2);
}

#[test]
fn test_empty_monitor_has_no_summary() {
    let monitor = CdiMonitor::new(100).unwrap();
    assert!(monitor.summary().is_none());
}

#[test]
fn test_monitor_and_drift_reach_logger() {
    let records: Arc<Mutex<Vec<MetricRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::clone(&records);
    let logger = CdiLogger::with_emitter(
        "test_service",
        Arc::new(move |r: &MetricRecord| store.lock().push(r.clone())),
    );

    let monitor = CdiMonitor::new(100).unwrap();
    for v in clipped_normal(0.75, 0.1, 100, 7) {
        monitor.update(v);
    }
    monitor.publish(&logger).unwrap();

    let baseline = clipped_normal(0.7, 0.05, 500, 8);
    let current = clipped_normal(0.9, 0.03, 500, 9);
    DriftDetector::default()
        .compare_and_publish(&baseline, &current, &logger)
        .unwrap();

    let records = records.lock();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.service == "test_service"));
    match &records[0].event {
        MetricEvent::CdiSummary(s) => assert_eq!(s.count, 100),
        other => panic!("expected summary, got {other:?}"),
    }
    match &records[1].event {
        MetricEvent::CdiDrift { ks_drift, psi, .. } => {
            assert!(*ks_drift);
            assert!(*psi > 0.2);
        }
        other => panic!("expected drift, got {other:?}"),
    }
}

#[cfg(feature = "prometheus")]
#[test]
fn test_fanout_to_logger_and_prometheus() {
    use cdi_observers::PrometheusSink;
    use cdi_types::Decision;

    let count = Arc::new(Mutex::new(0usize));
    let seen = Arc::clone(&count);
    let logger = CdiLogger::with_emitter(
        "svc",
        Arc::new(move |_: &MetricRecord| *seen.lock() += 1),
    );
    let prom = Arc::new(PrometheusSink::new("fan").unwrap());
    let fan = FanoutSink::new(vec![
        Arc::new(logger) as Arc<dyn MetricsSink>,
        prom.clone() as Arc<dyn MetricsSink>,
    ]);

    fan.log_prediction(0.97, Decision::Reject, Some(3.0));
    assert_eq!(*count.lock(), 1);
    let text = prom.gather_text().unwrap();
    let reject_line = text
        .lines()
        .find(|l| l.starts_with("fan_decision_total{decision=\"reject\"}"))
        .unwrap();
    let value: f64 = reject_line.rsplit(' ').next().unwrap().parse().unwrap();
    assert_eq!(value, 1.0);
}
