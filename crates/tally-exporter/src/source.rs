//! Where snapshots come from.
//!
//! Both sources are read-only from the exporter's point of view and are
//! queried once per tick.

use tally_core::{MemorySnapshot, TopicSnapshot};

/// Supplies the per-topic statistics of the host server.
pub trait StatsProvider: Send + Sync {
    /// Roll up historical aggregates. Runs once per tick, before
    /// [`topic_stats`](Self::topic_stats).
    fn refresh_history(&self) {}

    /// Current statistics of every topic, in the order they are reported.
    fn topic_stats(&self, include_clients: bool) -> Vec<TopicSnapshot>;
}

/// Supplies process memory statistics.
pub trait MemorySource: Send + Sync {
    fn sample(&self) -> MemorySnapshot;
}
