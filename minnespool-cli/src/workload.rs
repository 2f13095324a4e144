//! ## minnespool-cli::workload
//! **Seeded allocate/release driver with invariant cross-checks**
//!
//! Same seed, same decision stream: a failing run is a reproducible bug
//! report. Between operations the driver re-checks the pool's structural
//! invariants from an inspect snapshot, so any engine defect surfaces at
//! the operation that introduced it.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use minnespool_config::WorkloadSettings;
use minnespool_core::{AllocHandle, Pool, PoolError};
use minnespool_telemetry::metrics::MetricsRecorder;

/// Outcome tallies for one workload run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct WorkloadReport {
    pub attempted: usize,
    pub placed: usize,
    pub refused: usize,
    pub released: usize,
    pub peak_allocated_bytes: usize,
    pub final_fragmentation: f64,
}

pub struct WorkloadDriver {
    rng: SmallRng,
    settings: WorkloadSettings,
    live: Vec<AllocHandle>,
}

impl WorkloadDriver {
    pub fn new(settings: &WorkloadSettings) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(settings.seed),
            settings: settings.clone(),
            live: Vec::new(),
        }
    }

    /// Drives the configured number of operations, then releases every
    /// survivor so the pool ends in its single-gap state.
    pub fn run(
        &mut self,
        pool: &mut Pool,
        metrics: &MetricsRecorder,
    ) -> Result<WorkloadReport, PoolError> {
        let mut report = WorkloadReport::default();

        for _ in 0..self.settings.operations {
            let release_turn = !self.live.is_empty()
                && self.rng.random_bool(self.settings.release_probability);
            if release_turn {
                let pick = self.rng.random_range(0..self.live.len());
                let handle = self.live.swap_remove(pick);
                pool.release(handle)?;
                metrics.inc_releases();
                report.released += 1;
            } else {
                let req = self
                    .rng
                    .random_range(self.settings.min_request..=self.settings.max_request);
                report.attempted += 1;
                metrics.request_bytes.observe(req as f64);
                match pool.allocate(req) {
                    Ok(handle) => {
                        self.live.push(handle);
                        metrics.inc_allocations();
                        report.placed += 1;
                        report.peak_allocated_bytes =
                            report.peak_allocated_bytes.max(pool.allocated_bytes());
                    }
                    Err(PoolError::NoFitFound { .. }) => {
                        metrics.inc_placement_failures();
                        report.refused += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
            verify_invariants(pool);
        }

        // drain the survivors so the pool can close
        while let Some(handle) = self.live.pop() {
            pool.release(handle)?;
            metrics.inc_releases();
            report.released += 1;
        }
        verify_invariants(pool);
        report.final_fragmentation = pool.stats().fragmentation();
        Ok(report)
    }
}

/// Cross-checks the structural invariants from an inspect snapshot. A
/// breach here is an engine defect, so this panics instead of returning.
pub fn verify_invariants(pool: &Pool) {
    let segments = pool.inspect();

    let total: usize = segments.iter().map(|seg| seg.size).sum();
    assert_eq!(
        total,
        pool.total_size(),
        "segment sizes no longer sum to the pool size"
    );
    for pair in segments.windows(2) {
        assert!(
            pair[0].allocated || pair[1].allocated,
            "adjacent gaps left uncoalesced"
        );
    }
    let gaps = segments.iter().filter(|seg| !seg.allocated).count();
    assert_eq!(
        gaps,
        pool.free_segment_count(),
        "gap count drifted from the snapshot"
    );
    assert_eq!(
        segments.len() - gaps,
        pool.allocation_count(),
        "allocation count drifted from the snapshot"
    );
}
