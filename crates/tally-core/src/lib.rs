//! tally-core: shared types for the Tally statsd exporter.
//!
//! Holds the snapshot model handed over by the stats provider on every
//! tick, the exporter configuration parsed from `tally.toml`, and the
//! error types shared by the other crates.
//!
//! # Snapshot hierarchy
//!
//! ```text
//! TopicSnapshot            (message_count, e2e latency, leader flags)
//!   └── ChannelSnapshot*   (counters, depth gauges, e2e latency)
//!
//! MemorySnapshot           (heap gauges, gc runs, pause buffer)
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{Protocol, SourceConfig, StatsdConfig, TallyConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
