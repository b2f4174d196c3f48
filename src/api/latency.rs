//! Latency histogram for upstream geocoding / air-pollution calls.
//! The fetcher records, /stats/latency reads.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Upper bound of the tracked range: 2 minutes, in microseconds.
const MAX_TRACKED_US: u64 = 120_000_000;

pub struct LatencyStats {
    inner: Mutex<Histogram<u64>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySnapshot {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

impl LatencyStats {
    pub fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKED_US, 3)
            .map_err(|e| AppError::Config(format!("latency histogram: {e}")))?;
        Ok(Self {
            inner: Mutex::new(histogram),
        })
    }

    /// Record one request; values past the tracked range are clamped.
    pub fn record(&self, d: Duration) {
        let us = (d.as_micros().min(u128::from(MAX_TRACKED_US)) as u64).max(1);
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let Ok(h) = self.inner.lock() else {
            return LatencySnapshot::default();
        };
        if h.len() == 0 {
            return LatencySnapshot::default();
        }
        let ms = |q: f64| Some(h.value_at_quantile(q) as f64 / 1000.0);
        LatencySnapshot {
            p50_ms: ms(0.5),
            p95_ms: ms(0.95),
            p99_ms: ms(0.99),
            sample_count: h.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_percentiles() {
        let stats = LatencyStats::new().unwrap();
        assert_eq!(stats.snapshot(), LatencySnapshot::default());
    }

    #[test]
    fn percentiles_in_milliseconds() {
        let stats = LatencyStats::new().unwrap();
        for ms in 1..=100 {
            stats.record(Duration::from_millis(ms));
        }
        let snap = stats.snapshot();
        assert_eq!(snap.sample_count, 100);
        let p50 = snap.p50_ms.unwrap();
        assert!((p50 - 50.0).abs() < 1.0, "p50={p50}");
        assert!(snap.p99_ms.unwrap() >= snap.p95_ms.unwrap());
    }

    #[test]
    fn oversized_samples_are_clamped() {
        let stats = LatencyStats::new().unwrap();
        stats.record(Duration::from_secs(3600));
        assert_eq!(stats.snapshot().sample_count, 1);
    }
}
