//! One export tick.
//!
//! ```text
//! refresh_history() → topic_stats() → open_session()
//!   for each topic:    message_count delta   (failure ends the topic loop)
//!                      latency gauges
//!                      for each channel: counters, gauges, latency
//!   memory sample:     heap gauges, pause percentiles, gc_runs delta
//! close() → new baseline = this tick's snapshots
//! ```
//!
//! Only the topic `message_count` counter is fail-fast: when it cannot be
//! sent, no later topic is processed this tick. Every other failed emission
//! is counted and skipped. The baseline advances even after such failures;
//! only a session that could not be opened leaves it untouched.

use tally_core::{ChannelSnapshot, MemorySnapshot, TopicSnapshot};
use tally_statsd::{MetricsClient, MetricsSession, StatsdResult};
use tracing::{debug, warn};

use crate::diff::{delta, match_channel, match_topic};
use crate::memory::GcPauses;
use crate::names::{channel_stat, latency_metric, mem_stat, topic_stat};
use crate::source::{MemorySource, StatsProvider};

/// State carried from one tick to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub topics: Vec<TopicSnapshot>,
    pub memory: MemorySnapshot,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The session could not be opened; nothing was sent.
    pub session_failed: bool,
    /// Topics whose metrics were sent.
    pub topics_reported: usize,
    /// Non-leader replicas of ordered topics.
    pub topics_skipped: usize,
    /// Successful emissions.
    pub emitted: usize,
    /// Emissions that failed without stopping the tick.
    pub dropped: usize,
    /// Topic whose `message_count` failed, ending the topic loop.
    pub aborted_at: Option<String>,
    pub memory_reported: bool,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Counter,
    Gauge,
}

async fn send<S: MetricsSession>(session: &mut S, kind: Kind, stat: &str, value: i64) -> StatsdResult<()> {
    match kind {
        Kind::Counter => session.incr(stat, value).await,
        Kind::Gauge => session.gauge(stat, value).await,
    }
}

fn tally(report: &mut TickReport, stat: &str, result: StatsdResult<()>) {
    match result {
        Ok(()) => report.emitted += 1,
        Err(e) => {
            debug!(%stat, error = %e, "dropped metric");
            report.dropped += 1;
        }
    }
}

/// Run one tick against `baseline` and return the baseline for the next.
pub async fn run_cycle<C: MetricsClient>(
    client: &C,
    provider: &dyn StatsProvider,
    memory: Option<&dyn MemorySource>,
    include_clients: bool,
    baseline: Baseline,
) -> (Baseline, TickReport) {
    let mut report = TickReport::default();

    provider.refresh_history();
    let topics = provider.topic_stats(include_clients);

    let mut session = match client.open_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "failed to open statsd session");
            report.session_failed = true;
            return (baseline, report);
        }
    };

    debug!(%session, topics = topics.len(), "pushing stats");

    for topic in &topics {
        if !topic.reports_metrics() {
            report.topics_skipped += 1;
            continue;
        }

        let previous = match_topic(&topic.name, &baseline.topics);
        let stat = topic_stat(topic.metric_name(), "message_count");
        if let Err(e) = session
            .incr(&stat, delta(topic.message_count, previous.message_count))
            .await
        {
            warn!(topic = %topic.name, error = %e, "pushing stats failed, skipping remaining topics");
            report.aborted_at = Some(topic.name.clone());
            break;
        }
        report.emitted += 1;

        emit_topic_details(&mut session, topic, previous, &mut report).await;
        report.topics_reported += 1;
    }

    let memory = match memory {
        Some(source) => {
            let sample = source.sample();
            emit_memory(&mut session, &sample, &baseline.memory, &mut report).await;
            report.memory_reported = true;
            sample
        }
        None => baseline.memory,
    };

    session.close().await;

    debug!(
        reported = report.topics_reported,
        skipped = report.topics_skipped,
        emitted = report.emitted,
        dropped = report.dropped,
        "stats pushed"
    );

    (Baseline { topics, memory }, report)
}

async fn emit_topic_details<S: MetricsSession>(
    session: &mut S,
    topic: &TopicSnapshot,
    previous: &TopicSnapshot,
    report: &mut TickReport,
) {
    let name = topic.metric_name();

    for entry in &topic.e2e_latency {
        let stat = topic_stat(name, &latency_metric(entry.quantile));
        let result = session.gauge(&stat, entry.value as i64).await;
        tally(report, &stat, result);
    }

    for channel in &topic.channels {
        let previous_channel = match_channel(&channel.name, previous);
        emit_channel(session, name, channel, previous_channel, report).await;
    }
}

async fn emit_channel<S: MetricsSession>(
    session: &mut S,
    topic: &str,
    channel: &ChannelSnapshot,
    previous: &ChannelSnapshot,
    report: &mut TickReport,
) {
    let metrics = [
        ("message_count", Kind::Counter, delta(channel.message_count, previous.message_count)),
        ("depth", Kind::Gauge, channel.depth),
        ("backend_depth", Kind::Gauge, channel.backend_depth),
        ("in_flight_count", Kind::Gauge, channel.in_flight_count as i64),
        ("deferred_count", Kind::Gauge, channel.deferred_count as i64),
        ("requeue_count", Kind::Counter, delta(channel.requeue_count, previous.requeue_count)),
        ("timeout_count", Kind::Counter, delta(channel.timeout_count, previous.timeout_count)),
        ("clients", Kind::Gauge, channel.client_count as i64),
    ];

    for (metric, kind, value) in metrics {
        let stat = channel_stat(topic, &channel.name, metric);
        let result = send(session, kind, &stat, value).await;
        tally(report, &stat, result);
    }

    for entry in &channel.e2e_latency {
        let stat = channel_stat(topic, &channel.name, &latency_metric(entry.quantile));
        let result = session.gauge(&stat, entry.value as i64).await;
        tally(report, &stat, result);
    }
}

async fn emit_memory<S: MetricsSession>(
    session: &mut S,
    sample: &MemorySnapshot,
    previous: &MemorySnapshot,
    report: &mut TickReport,
) {
    let pauses = GcPauses::from_snapshot(sample);
    let gauges = [
        ("heap_objects", sample.heap_objects),
        ("heap_idle_bytes", sample.heap_idle_bytes),
        ("heap_in_use_bytes", sample.heap_in_use_bytes),
        ("heap_released_bytes", sample.heap_released_bytes),
        ("gc_pause_usec_100", pauses.p100_us),
        ("gc_pause_usec_99", pauses.p99_us),
        ("gc_pause_usec_95", pauses.p95_us),
        ("next_gc_bytes", sample.next_gc_bytes),
    ];

    for (metric, value) in gauges {
        let stat = mem_stat(metric);
        let result = session.gauge(&stat, value as i64).await;
        tally(report, &stat, result);
    }

    let stat = mem_stat("gc_runs");
    let runs = delta(u64::from(sample.num_gc), u64::from(previous.num_gc));
    match session.incr(&stat, runs).await {
        Ok(()) => report.emitted += 1,
        Err(e) => {
            warn!(error = %e, "pushing memory stats failed");
            report.dropped += 1;
        }
    }
}
