//! Test doubles for the snapshot sources.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tally_core::{ChannelSnapshot, MemorySnapshot, TopicSnapshot};

use crate::source::{MemorySource, StatsProvider};

pub fn topic(name: &str, message_count: u64) -> TopicSnapshot {
    TopicSnapshot::new(name, message_count)
}

pub fn channel(name: &str, message_count: u64) -> ChannelSnapshot {
    ChannelSnapshot::new(name, message_count)
}

/// Hands out one prepared topic list per tick, then empty lists.
pub struct QueuedStats {
    ticks: Mutex<VecDeque<Vec<TopicSnapshot>>>,
    refreshes: AtomicUsize,
    fetches: AtomicUsize,
}

impl QueuedStats {
    pub fn new(ticks: Vec<Vec<TopicSnapshot>>) -> Self {
        Self {
            ticks: Mutex::new(ticks.into()),
            refreshes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl StatsProvider for QueuedStats {
    fn refresh_history(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn topic_stats(&self, _include_clients: bool) -> Vec<TopicSnapshot> {
        assert_eq!(
            self.refreshes(),
            self.fetches() + 1,
            "history must be refreshed before every fetch"
        );
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.ticks.lock().unwrap().pop_front().unwrap_or_default()
    }
}

/// Memory source backed by a closure.
pub struct FnMemory<F>(pub F);

impl<F> MemorySource for FnMemory<F>
where
    F: Fn() -> MemorySnapshot + Send + Sync,
{
    fn sample(&self) -> MemorySnapshot {
        (self.0)()
    }
}
