// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Observers (Monitor, Drift, Telemetry)
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Production-side observers for CDI scores.
//!
//! - Monitor: rolling window with count / mean / std / percentiles
//! - Drift: KS two-sample test and PSI against a reference window
//! - Statistics: z-score, bootstrap CI, Spearman rank correlation
//! - Telemetry: JSON metric records and a Prometheus exporter

pub mod drift;
pub mod logging;
pub mod monitor;
#[cfg(feature = "prometheus")]
pub mod prometheus_sink;
pub mod statistics;

pub use drift::{ks_2samp, ks_drift, population_stability_index, DriftDetector};
pub use logging::{CdiLogger, LogEmitter, MetricEvent, MetricRecord, RecordEmitter, StdoutEmitter};
pub use monitor::CdiMonitor;
#[cfg(feature = "prometheus")]
pub use prometheus_sink::PrometheusSink;
pub use statistics::{bootstrap_ci, spearman, zscore};
