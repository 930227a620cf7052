//! Nearest-rank percentile.
//!
//! Picks an existing sample instead of interpolating. The rank is
//! `floor(p / 100 * n + 0.5)`, clamped to the last sample; dashboards built
//! on the exported values depend on this exact rounding.

/// Value at percentile `perc` (0–100) of `sorted`, which must be sorted
/// ascending. Returns 0 for an empty sample.
pub fn percentile(perc: f64, sorted: &[u64]) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let len = sorted.len();
    let index = ((perc / 100.0) * len as f64 + 0.5).floor() as usize;
    sorted[index.min(len - 1)]
}
