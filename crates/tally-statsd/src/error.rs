//! Statsd client error types.

use std::io;
use std::time::Duration;

use tally_core::Protocol;
use thiserror::Error;

/// Errors that can occur while talking to the collector.
#[derive(Debug, Error)]
pub enum StatsdError {
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("no address found for {0}")]
    NoAddress(String),

    #[error("{protocol} connect to {address} failed: {source}")]
    Connect {
        protocol: Protocol,
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("{protocol} connect to {address} timed out after {timeout:?}")]
    Timeout {
        protocol: Protocol,
        address: String,
        timeout: Duration,
    },

    #[error("failed to send {stat} to {address}: {source}")]
    Send {
        stat: String,
        address: String,
        #[source]
        source: io::Error,
    },
}

pub type StatsdResult<T> = Result<T, StatsdError>;
