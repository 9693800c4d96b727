// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rolling CDI Monitor
// ─────────────────────────────────────────────────────────────────────
//! Fixed-capacity FIFO window of recent CDI values with summary
//! statistics. The oldest value is evicted once the window is full.
//!
//! Thread-safe: window mutations are guarded by a `parking_lot::Mutex`.

use std::collections::VecDeque;

use parking_lot::Mutex;

use cdi_types::score::quantile_sorted;
use cdi_types::{GuardError, GuardResult, MetricsSink, MonitorSummary};

pub const DEFAULT_WINDOW_SIZE: usize = 1000;

pub struct CdiMonitor {
    window_size: usize,
    buffer: Mutex<VecDeque<f64>>,
}

impl CdiMonitor {
    pub fn new(window_size: usize) -> GuardResult<Self> {
        if window_size == 0 {
            return Err(GuardError::Config("window_size must be >= 1".to_string()));
        }
        Ok(Self {
            window_size,
            buffer: Mutex::new(VecDeque::with_capacity(window_size)),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn update(&self, cdi_value: f64) {
        let mut buf = self.buffer.lock();
        if buf.len() == self.window_size {
            buf.pop_front();
        }
        buf.push_back(cdi_value);
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Window contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.buffer.lock().iter().copied().collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    /// `None` while the window is empty.
    pub fn summary(&self) -> Option<MonitorSummary> {
        let mut values = self.snapshot();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        values.sort_by(f64::total_cmp);
        Some(MonitorSummary {
            count: values.len(),
            mean,
            std: var.sqrt(),
            p50: quantile_sorted(&values, 0.50)?,
            p90: quantile_sorted(&values, 0.90)?,
            p95: quantile_sorted(&values, 0.95)?,
            p99: quantile_sorted(&values, 0.99)?,
        })
    }

    /// Forward the current summary to `sink`; returns it. No-op when
    /// the window is empty.
    pub fn publish(&self, sink: &dyn MetricsSink) -> Option<MonitorSummary> {
        let summary = self.summary()?;
        sink.log_monitor_summary(&summary);
        Some(summary)
    }
}

impl Default for CdiMonitor {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            buffer: Mutex::new(VecDeque::with_capacity(DEFAULT_WINDOW_SIZE)),
        }
    }
}
