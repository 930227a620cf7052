//! Process memory and GC pause statistics.

use tally_core::MemorySnapshot;

use crate::percentile::percentile;

/// GC pause percentiles in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcPauses {
    pub p100_us: u64,
    pub p99_us: u64,
    pub p95_us: u64,
}

impl GcPauses {
    /// Summarize the valid part of the pause buffer of `snapshot`.
    ///
    /// Pauses are recorded in nanoseconds and reported in whole
    /// microseconds, truncated.
    pub fn from_snapshot(snapshot: &MemorySnapshot) -> Self {
        let mut pauses = snapshot.valid_pauses().to_vec();
        pauses.sort_unstable();

        Self {
            p100_us: percentile(100.0, &pauses) / 1000,
            p99_us: percentile(99.0, &pauses) / 1000,
            p95_us: percentile(95.0, &pauses) / 1000,
        }
    }
}
