//! tally.toml configuration parser.
//!
//! ```toml
//! [statsd]
//! address = "127.0.0.1:8125"
//! prefix = "nsq.host1"
//! protocol = "udp"
//! interval = "60s"
//! mem_stats = true
//!
//! [source]
//! path = "/var/run/nsqd/stats.json"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    pub statsd: StatsdConfig,
    pub source: Option<SourceConfig>,
}

/// Where and how often metrics are pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsdConfig {
    /// Collector address, `host:port`.
    pub address: String,
    /// Prepended to every metric name.
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Also export process memory and GC pause statistics.
    #[serde(default = "default_mem_stats")]
    pub mem_stats: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
}

/// File-backed stats source used by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub include_clients: bool,
}

/// Transport used to reach the collector.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => f.write_str("udp"),
            Protocol::Tcp => f.write_str("tcp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            other => Err(ConfigError::Invalid {
                field: "statsd.protocol",
                reason: format!("unsupported protocol {other:?}"),
            }),
        }
    }
}

fn default_interval() -> String {
    "60s".to_string()
}

fn default_mem_stats() -> bool {
    true
}

fn default_connect_timeout() -> String {
    "2s".to_string()
}

impl TallyConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check every field that can only be validated after parsing.
    pub fn validate(&self) -> ConfigResult<()> {
        self.statsd.validate()
    }
}

impl FromStr for TallyConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let config: TallyConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl StatsdConfig {
    /// Defaults for everything but the collector address.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            prefix: String::new(),
            protocol: Protocol::default(),
            interval: default_interval(),
            mem_stats: default_mem_stats(),
            connect_timeout: default_connect_timeout(),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "statsd.address",
                reason: "must not be empty".to_string(),
            });
        }
        if self.interval()?.is_zero() {
            return Err(ConfigError::Invalid {
                field: "statsd.interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.connect_timeout()?;
        Ok(())
    }

    /// Time between two ticks.
    pub fn interval(&self) -> ConfigResult<Duration> {
        parse_duration(&self.interval).ok_or_else(|| ConfigError::InvalidDuration {
            field: "statsd.interval",
            value: self.interval.clone(),
        })
    }

    pub fn connect_timeout(&self) -> ConfigResult<Duration> {
        parse_duration(&self.connect_timeout).ok_or_else(|| ConfigError::InvalidDuration {
            field: "statsd.connect_timeout",
            value: self.connect_timeout.clone(),
        })
    }

    /// The prefix as written on the wire: empty, or ending in exactly one `.`.
    pub fn metric_prefix(&self) -> String {
        let prefix = self.prefix.trim();
        if prefix.is_empty() || prefix.ends_with('.') {
            prefix.to_string()
        } else {
            format!("{prefix}.")
        }
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
[statsd]
address = "127.0.0.1:8125"
"#;
        let config: TallyConfig = toml_str.parse().unwrap();
        assert_eq!(config.statsd.address, "127.0.0.1:8125");
        assert_eq!(config.statsd.protocol, Protocol::Udp);
        assert_eq!(config.statsd.interval().unwrap(), Duration::from_secs(60));
        assert_eq!(config.statsd.connect_timeout().unwrap(), Duration::from_secs(2));
        assert!(config.statsd.mem_stats);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[statsd]
address = "stats.internal:8125"
prefix = "nsq.host1"
protocol = "tcp"
interval = "500ms"
mem_stats = false

[source]
path = "/tmp/stats.json"
include_clients = true
"#;
        let config: TallyConfig = toml_str.parse().unwrap();
        assert_eq!(config.statsd.protocol, Protocol::Tcp);
        assert_eq!(config.statsd.interval().unwrap(), Duration::from_millis(500));
        assert!(!config.statsd.mem_stats);
        let source = config.source.unwrap();
        assert_eq!(source.path, PathBuf::from("/tmp/stats.json"));
        assert!(source.include_clients);
    }

    #[test]
    fn test_rejects_empty_address() {
        let err = "[statsd]\naddress = \"  \"\n".parse::<TallyConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "statsd.address", .. }));
    }

    #[test]
    fn test_rejects_bad_interval() {
        let err = "[statsd]\naddress = \"a:1\"\ninterval = \"soon\"\n"
            .parse::<TallyConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { field: "statsd.interval", .. }));

        let err = "[statsd]\naddress = \"a:1\"\ninterval = \"0s\"\n"
            .parse::<TallyConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "statsd.interval", .. }));
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        let err = "[statsd]\naddress = \"a:1\"\nprotocol = \"sctp\"\n"
            .parse::<TallyConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!("SCTP".parse::<Protocol>().is_err());
        assert_eq!(" TCP ".parse::<Protocol>().unwrap(), Protocol::Tcp);
    }

    #[test]
    fn test_metric_prefix() {
        let mut config = StatsdConfig::new("a:1");
        assert_eq!(config.metric_prefix(), "");
        config.prefix = "nsq.host1".to_string();
        assert_eq!(config.metric_prefix(), "nsq.host1.");
        config.prefix = "nsq.host1.".to_string();
        assert_eq!(config.metric_prefix(), "nsq.host1.");
    }

    #[test]
    fn test_parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn test_parse_duration_minutes_overflow() {
        assert_eq!(parse_duration(&format!("{}m", u64::MAX)), None);
        assert_eq!(parse_duration(&format!("{}m", u64::MAX / 60)), Some(Duration::from_secs(u64::MAX / 60 * 60)));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let config = TallyConfig {
            statsd: StatsdConfig::new("127.0.0.1:8125"),
            source: None,
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = TallyConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.statsd.address, "127.0.0.1:8125");
        assert_eq!(loaded.statsd.interval, "60s");
    }

    #[test]
    fn test_from_missing_file() {
        let err = TallyConfig::from_file(Path::new("/nonexistent/tally.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }
}
