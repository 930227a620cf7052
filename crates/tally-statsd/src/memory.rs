//! In-memory metrics client.
//!
//! Records every emission instead of sending it, and can be told to fail
//! the session handshake or individual stats. Cloning the client shares the
//! recorded state, so a test keeps one handle and gives the other to the
//! exporter.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tally_core::Protocol;

use crate::error::{StatsdError, StatsdResult};
use crate::{MetricsClient, MetricsSession};

/// A single recorded metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Counter { stat: String, value: i64 },
    Gauge { stat: String, value: i64 },
}

impl Emission {
    pub fn stat(&self) -> &str {
        match self {
            Emission::Counter { stat, .. } | Emission::Gauge { stat, .. } => stat,
        }
    }
}

#[derive(Debug, Default)]
struct Recorder {
    emissions: Vec<Emission>,
    sessions_opened: usize,
    sessions_closed: usize,
    refuse_sessions: bool,
    failing_stats: HashSet<String>,
}

/// Metrics client that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    inner: Arc<Mutex<Recorder>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn recorder(&self) -> MutexGuard<'_, Recorder> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every following `open_session` fail.
    pub fn refuse_sessions(&self, refuse: bool) {
        self.recorder().refuse_sessions = refuse;
    }

    /// Make every emission of `stat` fail without being recorded.
    pub fn fail_stat(&self, stat: &str) {
        self.recorder().failing_stats.insert(stat.to_string());
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.recorder().emissions.clone()
    }

    /// Drop everything recorded so far; failure settings are kept.
    pub fn clear(&self) {
        self.recorder().emissions.clear();
    }

    /// Last value sent for counter `stat`.
    pub fn counter(&self, stat: &str) -> Option<i64> {
        self.recorder().emissions.iter().rev().find_map(|e| match e {
            Emission::Counter { stat: s, value } if s == stat => Some(*value),
            _ => None,
        })
    }

    /// Last value sent for gauge `stat`.
    pub fn gauge(&self, stat: &str) -> Option<i64> {
        self.recorder().emissions.iter().rev().find_map(|e| match e {
            Emission::Gauge { stat: s, value } if s == stat => Some(*value),
            _ => None,
        })
    }

    /// Whether anything at all was sent under a name starting with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.recorder()
            .emissions
            .iter()
            .any(|e| e.stat().starts_with(prefix))
    }

    pub fn sessions_opened(&self) -> usize {
        self.recorder().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.recorder().sessions_closed
    }
}

impl MetricsClient for MemoryClient {
    type Session = MemorySession;

    async fn open_session(&self) -> StatsdResult<MemorySession> {
        let mut recorder = self.recorder();
        if recorder.refuse_sessions {
            return Err(StatsdError::Connect {
                protocol: Protocol::Udp,
                address: "memory".to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "sessions refused"),
            });
        }
        recorder.sessions_opened += 1;
        Ok(MemorySession {
            client: self.clone(),
        })
    }
}

/// Session handed out by [`MemoryClient`].
#[derive(Debug)]
pub struct MemorySession {
    client: MemoryClient,
}

impl MemorySession {
    fn record(&self, stat: &str, emission: Emission) -> StatsdResult<()> {
        let mut recorder = self.client.recorder();
        if recorder.failing_stats.contains(stat) {
            return Err(StatsdError::Send {
                stat: stat.to_string(),
                address: "memory".to_string(),
                source: io::Error::other("injected failure"),
            });
        }
        recorder.emissions.push(emission);
        Ok(())
    }
}

impl fmt::Display for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory://")
    }
}

impl MetricsSession for MemorySession {
    async fn incr(&mut self, stat: &str, value: i64) -> StatsdResult<()> {
        self.record(
            stat,
            Emission::Counter {
                stat: stat.to_string(),
                value,
            },
        )
    }

    async fn gauge(&mut self, stat: &str, value: i64) -> StatsdResult<()> {
        self.record(
            stat,
            Emission::Gauge {
                stat: stat.to_string(),
                value,
            },
        )
    }

    async fn close(self) {
        self.client.recorder().sessions_closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_emissions_in_order() {
        let client = MemoryClient::new();
        let mut session = client.open_session().await.unwrap();
        session.incr("a", 1).await.unwrap();
        session.gauge("b", 2).await.unwrap();
        session.incr("a", 3).await.unwrap();
        session.close().await;

        assert_eq!(client.emissions().len(), 3);
        assert_eq!(client.counter("a"), Some(3));
        assert_eq!(client.gauge("b"), Some(2));
        assert_eq!(client.gauge("a"), None);
        assert_eq!(client.sessions_opened(), 1);
        assert_eq!(client.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let client = MemoryClient::new();
        client.fail_stat("bad");
        let mut session = client.open_session().await.unwrap();
        assert!(session.incr("bad", 1).await.is_err());
        assert!(session.incr("good", 1).await.is_ok());
        assert!(!client.has_prefix("bad"));

        client.refuse_sessions(true);
        assert!(client.open_session().await.is_err());
        assert_eq!(client.sessions_opened(), 1);
    }
}
