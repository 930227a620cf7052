//! Metric path construction.
//!
//! ```text
//! topic.<topic>.message_count
//! topic.<topic>.e2e_processing_latency_<pct>
//! topic.<topic>.channel.<channel>.<metric>
//! mem.<metric>
//! ```
//!
//! The collector prefix is added by the metrics client, not here.

pub fn topic_stat(topic: &str, metric: &str) -> String {
    format!("topic.{topic}.{metric}")
}

pub fn channel_stat(topic: &str, channel: &str, metric: &str) -> String {
    format!("topic.{topic}.channel.{channel}.{metric}")
}

pub fn mem_stat(metric: &str) -> String {
    format!("mem.{metric}")
}

/// Latency metric for a quantile: `0.99` becomes `e2e_processing_latency_99`.
pub fn latency_metric(quantile: f64) -> String {
    format!("e2e_processing_latency_{:.0}", quantile * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_and_channel_paths() {
        assert_eq!(topic_stat("orders", "message_count"), "topic.orders.message_count");
        assert_eq!(
            channel_stat("orders", "ch1", "depth"),
            "topic.orders.channel.ch1.depth"
        );
        assert_eq!(mem_stat("gc_runs"), "mem.gc_runs");
    }

    #[test]
    fn latency_suffix_is_whole_percent() {
        assert_eq!(latency_metric(0.99), "e2e_processing_latency_99");
        assert_eq!(latency_metric(0.95), "e2e_processing_latency_95");
        assert_eq!(latency_metric(1.0), "e2e_processing_latency_100");
        assert_eq!(latency_metric(0.0), "e2e_processing_latency_0");
        // 99.9 has no integer form and rounds up.
        assert_eq!(latency_metric(0.999), "e2e_processing_latency_100");
    }
}
