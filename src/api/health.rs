//! Shared counters for the /health endpoint, updated by the route handlers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct HealthState {
    analyses_ok: AtomicU64,
    analyses_failed: AtomicU64,
    /// Failures that came from the geocoding / air-pollution services.
    upstream_failures: AtomicU64,
    /// Unix seconds of the last successful analysis (0 = none).
    last_analysis_at: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub analyses_ok: u64,
    pub analyses_failed: u64,
    pub upstream_failures: u64,
    pub last_analysis_at: Option<u64>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at_secs: u64) {
        self.analyses_ok.fetch_add(1, Ordering::Relaxed);
        self.last_analysis_at.store(at_secs, Ordering::Relaxed);
    }

    pub fn record_failure(&self, upstream: bool) {
        self.analyses_failed.fetch_add(1, Ordering::Relaxed);
        if upstream {
            self.upstream_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> HealthResponse {
        let last = self.last_analysis_at.load(Ordering::Relaxed);
        HealthResponse {
            status: "ok",
            analyses_ok: self.analyses_ok.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            last_analysis_at: (last > 0).then_some(last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_failures() {
        let h = HealthState::new();
        assert_eq!(h.snapshot().last_analysis_at, None);

        h.record_success(1_700_000_000);
        h.record_failure(true);
        h.record_failure(false);

        let snap = h.snapshot();
        assert_eq!(snap.analyses_ok, 1);
        assert_eq!(snap.analyses_failed, 2);
        assert_eq!(snap.upstream_failures, 1);
        assert_eq!(snap.last_analysis_at, Some(1_700_000_000));
    }
}
