//! Export loop: one tick per interval until shutdown.
//!
//! The exporter owns the baseline. Each tick takes it, runs the cycle and
//! stores the baseline the cycle hands back, so two exporters never share
//! delta state. Ticks run inline in the loop: a slow tick delays the next
//! one and the shutdown check, it never overlaps with either.

use std::sync::Arc;
use std::time::Duration;

use tally_core::{ConfigResult, StatsdConfig};
use tally_statsd::MetricsClient;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use crate::cycle::{Baseline, TickReport, run_cycle};
use crate::source::{MemorySource, StatsProvider};

/// Shortest tick period the exporter accepts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically diffs the provider's snapshots and pushes them to statsd.
pub struct StatsdExporter<C: MetricsClient> {
    client: C,
    provider: Arc<dyn StatsProvider>,
    /// Sampled each tick when set.
    memory: Option<Arc<dyn MemorySource>>,
    interval: Duration,
    include_clients: bool,
    baseline: Baseline,
}

impl<C: MetricsClient> StatsdExporter<C> {
    /// Create an exporter that ticks every `interval`. A zero interval is
    /// raised to [`MIN_INTERVAL`].
    pub fn new(client: C, provider: Arc<dyn StatsProvider>, interval: Duration) -> Self {
        Self {
            client,
            provider,
            memory: None,
            interval: interval.max(MIN_INTERVAL),
            include_clients: false,
            baseline: Baseline::default(),
        }
    }

    /// Create an exporter using the `[statsd]` interval.
    ///
    /// Memory statistics still need a source, see
    /// [`with_memory_source`](Self::with_memory_source).
    pub fn from_config(
        config: &StatsdConfig,
        client: C,
        provider: Arc<dyn StatsProvider>,
    ) -> ConfigResult<Self> {
        Ok(Self::new(client, provider, config.interval()?))
    }

    /// Enable memory statistics.
    pub fn with_memory_source(mut self, source: Arc<dyn MemorySource>) -> Self {
        self.memory = Some(source);
        self
    }

    /// Ask the provider for per-client detail when snapshotting.
    pub fn include_clients(mut self, include: bool) -> Self {
        self.include_clients = include;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Snapshots the next tick will diff against.
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Run a single tick now.
    pub async fn tick(&mut self) -> TickReport {
        let baseline = std::mem::take(&mut self.baseline);
        let (baseline, report) = run_cycle(
            &self.client,
            self.provider.as_ref(),
            self.memory.as_deref(),
            self.include_clients,
            baseline,
        )
        .await;
        self.baseline = baseline;
        report
    }

    /// Tick every interval until `shutdown` flips or its sender is dropped.
    ///
    /// Consumes the exporter: a stopped exporter cannot be restarted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow_and_update() {
            return;
        }

        info!(
            interval_ms = self.interval.as_millis() as u64,
            mem_stats = self.memory.is_some(),
            "statsd exporter started"
        );

        // First tick one full interval after start.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        info!("statsd exporter shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}
