//! Error types for lockwatch-core

use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Remediation command for resolving an error
#[derive(Debug, Clone)]
pub struct RemediationCommand {
    /// Short label describing the command purpose
    pub label: String,
    /// Command to run
    pub command: String,
}

/// Actionable remediation guidance for an error
#[derive(Debug, Clone)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<RemediationCommand>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    /// Add a suggested command
    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for cmd in &self.commands {
                let _ = writeln!(output, "    - {}: {}", cmd.label, cmd.command);
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lockwatch-core
#[derive(Error, Debug)]
pub enum Error {
    /// Data source errors (connectivity and queries)
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    /// Alert sink errors
    #[error("Alert sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Return remediation guidance for this error.
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::Source(err) => err.remediation(),
            Self::Sink(err) => err.remediation(),
            Self::Config(err) => err.remediation(),
        }
    }

    /// True when the data source could not be reached or re-reached.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Source(SourceError::Connect { .. } | SourceError::Ping { .. })
        )
    }
}

/// Data-source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Could not open a connection
    #[error("Cannot connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// Liveness check failed and the connection could not be re-established
    #[error("Connection lost and reconnect failed: {reason}")]
    Ping { reason: String },

    /// A snapshot or diagnostics query failed
    #[error("Query failed ({query}): {reason}")]
    Query { query: &'static str, reason: String },

    /// The engine status query returned no row
    #[error("Engine status query returned no rows")]
    MissingStatus,
}

impl SourceError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::Connect { host, .. } => Remediation::new(format!(
                "Verify that the MySQL server at {host} is reachable and the credentials are valid."
            ))
            .command("Check connectivity", format!("mysqladmin -h {host} -u <user> -p ping"))
            .alternative("Pass host as name:port when the server does not listen on 3306."),
            Self::Ping { .. } => Remediation::new(
                "The server dropped the connection and did not accept a new one. Check server health.",
            )
            .command("Check server status", "mysqladmin -h <host> -u <user> -p status")
            .alternative("Restart lockwatch once the server is back."),
            Self::Query { .. } => Remediation::new(
                "A monitoring query failed. The account needs PROCESS privilege to read InnoDB state.",
            )
            .command("Grant privilege", "GRANT PROCESS ON *.* TO '<user>'@'%';")
            .alternative("Confirm the server runs InnoDB and exposes information_schema.INNODB_TRX."),
            Self::MissingStatus => Remediation::new(
                "SHOW ENGINE INNODB STATUS returned nothing. Confirm InnoDB is enabled.",
            )
            .command("Check engines", "SHOW ENGINES;"),
        }
    }
}

/// Alert sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to open alert log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write alert log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::Open { path, .. } | Self::Write { path, .. } => Remediation::new(format!(
                "Alert log {} is not writable. Check the path and permissions.",
                path.display()
            ))
            .command("Check permissions", format!("ls -l \"{}\"", path.display()))
            .alternative("Point LOG_FILE at a writable location."),
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing value: {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::Missing(field) => Remediation::new(format!("Provide a value for {field}."))
                .command("Usage", "lockwatch --help"),
            Self::Invalid { field, .. } => Remediation::new(format!("Fix the value of {field}."))
                .command("Usage", "lockwatch --help"),
        }
    }
}

/// Format an error with remediation guidance for display.
#[must_use]
pub fn format_error_with_remediation(error: &Error) -> String {
    format!("Error: {error}\n\n{}", error.remediation().render_plain())
}
