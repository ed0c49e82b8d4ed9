//! Runtime configuration for lockwatch
//!
//! All values come from the command line; there is no config file and no
//! environment lookup. [`ConnectionConfig`] describes how to reach the
//! server, [`MonitorConfig`] how to watch it.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default MySQL port used when `host` carries no `:port` suffix.
pub const DEFAULT_PORT: u16 = 3306;

/// Default cadence between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Diagnostic log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("{s:?} (expected pretty or json)")),
        }
    }
}

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectionConfig {
    /// Build from a `host` or `host:port` address plus credentials.
    pub fn from_address(
        address: &str,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let (host, port) = split_host_port(address)?;
        Ok(Self {
            host,
            port,
            user: user.into(),
            password: password.into(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host"));
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::Missing("user"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "port",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` for display and error messages.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn split_host_port(address: &str) -> Result<(String, u16), ConfigError> {
    let address = address.trim();
    if let Some(inner) = address.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
        return Ok((inner.to_string(), DEFAULT_PORT));
    }
    match address.rsplit_once(':') {
        // Bare IPv6 literals contain colons but no port.
        Some((host, _)) if host.contains(':') && !host.starts_with('[') => {
            Ok((address.to_string(), DEFAULT_PORT))
        }
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|e| ConfigError::Invalid {
                field: "port",
                reason: format!("{port:?}: {e}"),
            })?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            Ok((host.to_string(), port))
        }
        None => Ok((address.to_string(), DEFAULT_PORT)),
    }
}

/// Poll loop parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Lock-wait duration after which a transaction is reported
    pub wait_threshold: Duration,
    /// Cadence between poll cycles
    pub poll_interval: Duration,
    /// Alert log the reports are appended to
    pub alert_log: PathBuf,
}

impl MonitorConfig {
    /// Config with the default poll interval.
    #[must_use]
    pub fn new(alert_log: impl Into<PathBuf>, wait_threshold: Duration) -> Self {
        Self {
            wait_threshold,
            poll_interval: DEFAULT_POLL_INTERVAL,
            alert_log: alert_log.into(),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alert_log.as_os_str().is_empty() {
            return Err(ConfigError::Missing("log file"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "poll interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_without_port_uses_default() {
        let cfg = ConnectionConfig::from_address("db1.internal", "monitor", "pw").unwrap();
        assert_eq!(cfg.host, "db1.internal");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.address(), "db1.internal:3306");
    }

    #[test]
    fn address_with_port() {
        let cfg = ConnectionConfig::from_address("10.0.0.5:3307", "monitor", "pw").unwrap();
        assert_eq!(cfg.host, "10.0.0.5");
        assert_eq!(cfg.port, 3307);
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let cfg = ConnectionConfig::from_address("[::1]:3310", "monitor", "pw").unwrap();
        assert_eq!(cfg.host, "::1");
        assert_eq!(cfg.port, 3310);
    }

    #[test]
    fn bare_ipv6_keeps_default_port() {
        let cfg = ConnectionConfig::from_address("fe80::1", "monitor", "pw").unwrap();
        assert_eq!(cfg.host, "fe80::1");
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ConnectionConfig::from_address("db1:mysql", "monitor", "pw").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "port", .. }));
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let cfg = ConnectionConfig::from_address("", "monitor", "pw").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("host"))));

        let cfg = ConnectionConfig::from_address("db1", " ", "pw").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("user"))));

        let cfg = ConnectionConfig::from_address("db1:0", "monitor", "pw").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = ConnectionConfig::from_address("db1", "monitor", "hunter2").unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn monitor_config_defaults_and_validation() {
        let cfg = MonitorConfig::new("/tmp/locks.log", Duration::from_secs(30));
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(cfg.validate().is_ok());

        let zero_threshold = MonitorConfig::new("/tmp/locks.log", Duration::ZERO);
        assert!(zero_threshold.validate().is_ok());

        let no_interval = cfg.clone().with_poll_interval(Duration::ZERO);
        assert!(no_interval.validate().is_err());

        let no_path = MonitorConfig::new("", Duration::from_secs(1));
        assert!(matches!(
            no_path.validate(),
            Err(ConfigError::Missing("log file"))
        ));
    }

    #[test]
    fn log_format_names() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
