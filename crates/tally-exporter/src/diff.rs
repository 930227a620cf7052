//! Matching against the previous tick and interval deltas.
//!
//! Topics are matched by name among the previous topics; channels only among
//! the channels of the matched previous topic. A miss yields an all-zero
//! snapshot, so the first delta of a new topic or channel is its full
//! cumulative value.

use tally_core::{ChannelSnapshot, TopicSnapshot};

static EMPTY_TOPIC: TopicSnapshot = TopicSnapshot {
    name: String::new(),
    statsd_name: String::new(),
    message_count: 0,
    e2e_latency: Vec::new(),
    is_multi_ordered: false,
    is_leader: false,
    channels: Vec::new(),
};

static EMPTY_CHANNEL: ChannelSnapshot = ChannelSnapshot {
    name: String::new(),
    message_count: 0,
    requeue_count: 0,
    timeout_count: 0,
    depth: 0,
    backend_depth: 0,
    in_flight_count: 0,
    deferred_count: 0,
    client_count: 0,
    e2e_latency: Vec::new(),
};

/// Previous snapshot of topic `name`, or an all-zero topic.
pub fn match_topic<'a>(name: &str, previous: &'a [TopicSnapshot]) -> &'a TopicSnapshot {
    previous
        .iter()
        .find(|t| t.name == name)
        .unwrap_or(&EMPTY_TOPIC)
}

/// Previous snapshot of channel `name` within `previous_topic`, or an
/// all-zero channel.
pub fn match_channel<'a>(name: &str, previous_topic: &'a TopicSnapshot) -> &'a ChannelSnapshot {
    previous_topic
        .channels
        .iter()
        .find(|c| c.name == name)
        .unwrap_or(&EMPTY_CHANNEL)
}

/// Change of a cumulative counter since the previous tick.
///
/// A counter that went backwards (reset) yields a negative value; it is
/// passed on as is.
pub fn delta(current: u64, previous: u64) -> i64 {
    current.wrapping_sub(previous) as i64
}
