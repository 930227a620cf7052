//! Snapshot types produced by the stats provider.
//!
//! A fresh collection is built for every tick and never mutated after it
//! is handed to the exporter. The previous tick's collection is kept only
//! as the delta base for the next one.

use serde::{Deserialize, Serialize};

// ── Latency ────────────────────────────────────────────────────────

/// One point of an end-to-end processing latency summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PercentileEntry {
    /// Quantile in `[0.0, 1.0]`, e.g. `0.99`.
    pub quantile: f64,
    /// Latency at that quantile.
    pub value: f64,
}

impl PercentileEntry {
    pub fn new(quantile: f64, value: f64) -> Self {
        Self { quantile, value }
    }
}

// ── Topic / Channel ────────────────────────────────────────────────

/// Per-topic statistics at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TopicSnapshot {
    /// Identity key, unique among topics in one snapshot.
    pub name: String,
    /// Name used in metric paths.
    pub statsd_name: String,
    /// Cumulative messages published to the topic.
    pub message_count: u64,
    pub e2e_latency: Vec<PercentileEntry>,
    /// Topic belongs to an ordered, replicated group.
    pub is_multi_ordered: bool,
    /// Local process is the leader replica for the topic.
    pub is_leader: bool,
    pub channels: Vec<ChannelSnapshot>,
}

impl TopicSnapshot {
    /// Create a topic whose metric name equals its identity key.
    pub fn new(name: &str, message_count: u64) -> Self {
        Self {
            name: name.to_string(),
            statsd_name: name.to_string(),
            message_count,
            ..Self::default()
        }
    }

    /// Name used in metric paths, falling back to the identity key when the
    /// provider left `statsd_name` empty.
    pub fn metric_name(&self) -> &str {
        if self.statsd_name.is_empty() {
            &self.name
        } else {
            &self.statsd_name
        }
    }

    /// Non-leader replicas of an ordered topic do not report.
    pub fn reports_metrics(&self) -> bool {
        !self.is_multi_ordered || self.is_leader
    }
}

/// Per-channel statistics at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelSnapshot {
    /// Identity key, unique within the parent topic.
    pub name: String,
    pub message_count: u64,
    pub requeue_count: u64,
    pub timeout_count: u64,
    /// In-memory queue depth.
    pub depth: i64,
    /// Depth of the disk-backed queue.
    pub backend_depth: i64,
    pub in_flight_count: u64,
    pub deferred_count: u64,
    /// Connected consumers.
    pub client_count: u64,
    pub e2e_latency: Vec<PercentileEntry>,
}

impl ChannelSnapshot {
    pub fn new(name: &str, message_count: u64) -> Self {
        Self {
            name: name.to_string(),
            message_count,
            ..Self::default()
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────────

/// Process memory and GC statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemorySnapshot {
    pub heap_objects: u64,
    pub heap_idle_bytes: u64,
    pub heap_in_use_bytes: u64,
    pub heap_released_bytes: u64,
    /// Heap size at which the next collection triggers.
    pub next_gc_bytes: u64,
    /// Cumulative number of completed GC runs.
    pub num_gc: u32,
    /// Recent GC pause durations in nanoseconds.
    pub pause_ns: Vec<u64>,
}

impl MemorySnapshot {
    /// The recorded pauses. Only the first `num_gc` slots have been written
    /// to until the buffer fills.
    pub fn valid_pauses(&self) -> &[u64] {
        let len = self.pause_ns.len().min(self.num_gc as usize);
        &self.pause_ns[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_topic_reports() {
        let topic = TopicSnapshot::new("orders", 1);
        assert!(topic.reports_metrics());
    }

    #[test]
    fn ordered_topic_reports_only_on_leader() {
        let mut topic = TopicSnapshot::new("orders", 1);
        topic.is_multi_ordered = true;
        assert!(!topic.reports_metrics());

        topic.is_leader = true;
        assert!(topic.reports_metrics());
    }

    #[test]
    fn valid_pauses_bounded_by_gc_runs() {
        let mem = MemorySnapshot {
            num_gc: 2,
            pause_ns: vec![10, 20, 0, 0],
            ..MemorySnapshot::default()
        };
        assert_eq!(mem.valid_pauses(), &[10, 20]);
    }

    #[test]
    fn valid_pauses_bounded_by_buffer() {
        let mem = MemorySnapshot {
            num_gc: 1_000,
            pause_ns: vec![7; 256],
            ..MemorySnapshot::default()
        };
        assert_eq!(mem.valid_pauses().len(), 256);
    }

    #[test]
    fn topic_deserializes_with_missing_fields() {
        let json = r#"{ "name": "orders", "message_count": 5,
                        "channels": [ { "name": "ch1", "depth": 3 } ] }"#;
        let topic: TopicSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(topic.name, "orders");
        assert_eq!(topic.statsd_name, "");
        assert_eq!(topic.metric_name(), "orders");
        assert_eq!(topic.channels[0].depth, 3);
        assert_eq!(topic.channels[0].message_count, 0);
    }
}
