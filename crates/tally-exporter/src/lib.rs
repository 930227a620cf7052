//! tally-exporter: periodic differential statsd export.
//!
//! Every interval the exporter snapshots the stats provider, diffs the
//! monotonic counters against the previous tick and pushes counters and
//! gauges through a fresh statsd session.
//!
//! # Architecture
//!
//! ```text
//! StatsdExporter
//!   ├── run()   → interval loop, stops on the shutdown channel
//!   └── tick()  → run_cycle(client, provider, memory, baseline)
//!                   ├── diff      (match previous topic / channel, deltas)
//!                   ├── names     (statsd paths)
//!                   └── memory    (GC pause percentiles)
//! ```

pub mod cycle;
pub mod diff;
pub mod exporter;
pub mod memory;
pub mod names;
pub mod percentile;
pub mod source;

#[cfg(test)]
mod testing;

pub use cycle::{Baseline, TickReport, run_cycle};
pub use exporter::{MIN_INTERVAL, StatsdExporter};
pub use memory::GcPauses;
pub use percentile::percentile;
pub use source::{MemorySource, StatsProvider};
