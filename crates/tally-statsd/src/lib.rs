//! tally-statsd: the metrics-client side of the exporter.
//!
//! The exporter talks to the collector through two narrow traits: a
//! [`MetricsClient`] opens one [`MetricsSession`] per tick, the session
//! pushes counters and gauges and is closed at the end of the tick.
//!
//! # Implementations
//!
//! ```text
//! StatsdClient ── open_session() ──► StatsdSession (UDP socket | TCP stream)
//! MemoryClient ── open_session() ──► MemorySession (records in memory)
//! ```
//!
//! Sessions are never pooled: every tick pays for a fresh socket.

use std::fmt;
use std::future::Future;

pub mod client;
pub mod error;
pub mod memory;

pub use client::{StatsdClient, StatsdSession};
pub use error::{StatsdError, StatsdResult};
pub use memory::{Emission, MemoryClient};

/// Opens per-tick sessions to a metrics collector.
pub trait MetricsClient: Send + Sync {
    type Session: MetricsSession;

    /// Establish a session. Failure aborts the whole tick.
    fn open_session(&self) -> impl Future<Output = StatsdResult<Self::Session>> + Send;
}

/// A live connection to the collector, scoped to one tick.
pub trait MetricsSession: Send + fmt::Display {
    /// Add `value` to the counter `stat`.
    fn incr(&mut self, stat: &str, value: i64) -> impl Future<Output = StatsdResult<()>> + Send;

    /// Set the gauge `stat` to `value`.
    fn gauge(&mut self, stat: &str, value: i64) -> impl Future<Output = StatsdResult<()>> + Send;

    /// Release the connection.
    fn close(self) -> impl Future<Output = ()> + Send;
}
