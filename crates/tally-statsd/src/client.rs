//! Statsd line-protocol client over UDP or TCP.
//!
//! Every metric is written as one line:
//!
//! ```text
//! <prefix><stat>:<value>|c      counter increment
//! <prefix><stat>:<value>|g      gauge
//! ```
//!
//! Over UDP each line is its own datagram; over TCP the lines share one
//! stream and are separated by `\n`.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tally_core::{ConfigResult, Protocol, StatsdConfig};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

use crate::error::{StatsdError, StatsdResult};
use crate::{MetricsClient, MetricsSession};

// ── Transport ────────────────────────────────────────────────────────

/// Underlying socket of a session.
enum Transport {
    /// Connected UDP socket, one datagram per metric.
    Udp(UdpSocket),
    /// TCP stream, newline-delimited metrics.
    Tcp(TcpStream),
}

// ── StatsdClient ─────────────────────────────────────────────────────

/// Opens statsd sessions to a fixed collector address.
#[derive(Debug, Clone)]
pub struct StatsdClient {
    address: String,
    prefix: String,
    protocol: Protocol,
    connect_timeout: Duration,
}

impl StatsdClient {
    /// Create a client. `prefix` is written verbatim in front of every stat.
    pub fn new(address: &str, prefix: &str, protocol: Protocol, connect_timeout: Duration) -> Self {
        Self {
            address: address.to_string(),
            prefix: prefix.to_string(),
            protocol,
            connect_timeout,
        }
    }

    /// Build a client from the `[statsd]` config section.
    pub fn from_config(config: &StatsdConfig) -> ConfigResult<Self> {
        Ok(Self::new(
            &config.address,
            &config.metric_prefix(),
            config.protocol,
            config.connect_timeout()?,
        ))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn resolve(&self) -> StatsdResult<SocketAddr> {
        tokio::net::lookup_host(&self.address)
            .await
            .map_err(|source| StatsdError::Resolve {
                address: self.address.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| StatsdError::NoAddress(self.address.clone()))
    }

    async fn connect(&self) -> StatsdResult<Transport> {
        let addr = self.resolve().await?;
        let connect_err = |source| StatsdError::Connect {
            protocol: self.protocol,
            address: self.address.clone(),
            source,
        };

        match self.protocol {
            Protocol::Udp => {
                let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let socket = UdpSocket::bind(local).await.map_err(connect_err)?;
                socket.connect(addr).await.map_err(connect_err)?;
                Ok(Transport::Udp(socket))
            }
            Protocol::Tcp => {
                let stream = TcpStream::connect(addr).await.map_err(connect_err)?;
                // Small writes, one per metric.
                let _ = stream.set_nodelay(true);
                Ok(Transport::Tcp(stream))
            }
        }
    }
}

impl MetricsClient for StatsdClient {
    type Session = StatsdSession;

    async fn open_session(&self) -> StatsdResult<StatsdSession> {
        let transport = tokio::time::timeout(self.connect_timeout, self.connect())
            .await
            .map_err(|_| StatsdError::Timeout {
                protocol: self.protocol,
                address: self.address.clone(),
                timeout: self.connect_timeout,
            })??;

        debug!(protocol = %self.protocol, address = %self.address, "statsd session opened");

        Ok(StatsdSession {
            transport,
            address: self.address.clone(),
            prefix: self.prefix.clone(),
            protocol: self.protocol,
        })
    }
}

// ── StatsdSession ────────────────────────────────────────────────────

/// One open connection to the collector.
pub struct StatsdSession {
    transport: Transport,
    address: String,
    prefix: String,
    protocol: Protocol,
}

impl fmt::Debug for StatsdSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsdSession")
            .field("protocol", &self.protocol)
            .field("address", &self.address)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl fmt::Display for StatsdSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.address)
    }
}

impl StatsdSession {
    async fn send(&mut self, stat: &str, value: i64, kind: &str) -> StatsdResult<()> {
        let line = format_line(&self.prefix, stat, value, kind);
        let result = match &mut self.transport {
            Transport::Udp(socket) => socket.send(line.as_bytes()).await.map(|_| ()),
            Transport::Tcp(stream) => stream.write_all(line.as_bytes()).await,
        };
        result.map_err(|source| StatsdError::Send {
            stat: stat.to_string(),
            address: self.address.clone(),
            source,
        })
    }
}

impl MetricsSession for StatsdSession {
    async fn incr(&mut self, stat: &str, value: i64) -> StatsdResult<()> {
        self.send(stat, value, "c").await
    }

    async fn gauge(&mut self, stat: &str, value: i64) -> StatsdResult<()> {
        self.send(stat, value, "g").await
    }

    async fn close(self) {
        if let Transport::Tcp(mut stream) = self.transport {
            let _ = stream.shutdown().await;
        }
    }
}

/// Render one statsd line, newline included.
pub fn format_line(prefix: &str, stat: &str, value: i64, kind: &str) -> String {
    format!("{prefix}{stat}:{value}|{kind}\n")
}

// ── Tests ────────────────────────────────────────────────────────────
