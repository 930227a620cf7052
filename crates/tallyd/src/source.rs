//! Stats read from a JSON dump written by the host server.
//!
//! ```json
//! {
//!   "topics": [{ "name": "orders", "message_count": 100, "channels": [] }],
//!   "memory": { "heap_objects": 42, "num_gc": 3, "pause_ns": [2000] }
//! }
//! ```
//!
//! The file is re-read once per tick, in `refresh_history`. Topic stats and
//! the memory sample of that tick are both served from that one read. A
//! file that cannot be read or parsed leaves the previous read in place.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Deserialize;
use tally_core::{MemorySnapshot, TopicSnapshot};
use tally_exporter::{MemorySource, StatsProvider};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read stats file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid stats file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Contents of the stats file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsDump {
    pub topics: Vec<TopicSnapshot>,
    pub memory: Option<MemorySnapshot>,
}

impl StatsDump {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Default)]
struct Cached {
    topics: Vec<TopicSnapshot>,
    memory: MemorySnapshot,
}

/// Serves topic and memory stats from a file on disk.
pub struct FileStatsSource {
    path: PathBuf,
    cached: Mutex<Cached>,
}

impl FileStatsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(Cached::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cached(&self) -> MutexGuard<'_, Cached> {
        self.cached.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StatsProvider for FileStatsSource {
    fn refresh_history(&self) {
        let mut cached = self.cached();
        match StatsDump::load(&self.path) {
            Ok(dump) => {
                debug!(path = %self.path.display(), topics = dump.topics.len(), "stats file loaded");
                cached.topics = dump.topics;
                // A dump without a memory section keeps the last sample so
                // gc_runs does not jump backwards.
                if let Some(memory) = dump.memory {
                    cached.memory = memory;
                }
            }
            // The last good topics are served again: their deltas come out
            // as zero and the exporter's baseline stays intact.
            Err(e) => {
                warn!(error = %e, "stats file unavailable, reusing last good stats");
            }
        }
    }

    /// The dump already carries per-channel client counts, so
    /// `include_clients` changes nothing here.
    fn topic_stats(&self, _include_clients: bool) -> Vec<TopicSnapshot> {
        self.cached().topics.clone()
    }
}

impl MemorySource for FileStatsSource {
    fn sample(&self) -> MemorySnapshot {
        self.cached().memory.clone()
    }
}
