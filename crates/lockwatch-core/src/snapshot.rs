//! Snapshot source contract.
//!
//! A snapshot is the full set of transactions the engine reports as active
//! at one polling instant. The [`SnapshotSource`] trait is the boundary to
//! the database; [`crate::mysql::MysqlSource`] is the production
//! implementation and tests substitute scripted fakes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Marker embedded in every statement lockwatch sends, so its own probes
/// can be recognized in the server's process list.
pub const PROBE_MARKER: &str = "/* lockwatch */";

/// Engine token for a transaction blocked on a lock.
pub const LOCK_WAIT_TOKEN: &str = "LOCK WAIT";

/// Transaction state as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrxState {
    Running,
    LockWait,
    RollingBack,
    Committing,
    Other(String),
}

impl TrxState {
    /// Parse an engine state token. Only the exact `LOCK WAIT` token is a wait.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            LOCK_WAIT_TOKEN => Self::LockWait,
            "RUNNING" => Self::Running,
            "ROLLING BACK" => Self::RollingBack,
            "COMMITTING" => Self::Committing,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_lock_wait(&self) -> bool {
        matches!(self, Self::LockWait)
    }
}

impl std::fmt::Display for TrxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::LockWait => write!(f, "{LOCK_WAIT_TOKEN}"),
            Self::RollingBack => write!(f, "ROLLING BACK"),
            Self::Committing => write!(f, "COMMITTING"),
            Self::Other(token) => write!(f, "{token}"),
        }
    }
}

/// One row of the active-transaction snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTransaction {
    /// Engine transaction id, stable while the transaction lives
    pub id: String,
    pub state: TrxState,
    /// Session that owns the transaction
    pub thread_id: u64,
    /// Statement currently executing, if any
    pub query: Option<String>,
}

impl ActiveTransaction {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        state: TrxState,
        thread_id: u64,
        query: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            state,
            thread_id,
            query,
        }
    }
}

/// A statement executing on the server when diagnostics were collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningQuery {
    pub thread_id: u64,
    /// Originating account, `user@host`
    pub component: String,
    pub statement: String,
}

/// Access to the engine's transaction state.
///
/// Calls are issued strictly one after another from the poll loop.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    /// Make sure the connection is usable, re-establishing it if the
    /// transport dropped. Fails when the server cannot be reached again.
    async fn ensure_live(&mut self) -> Result<()>;

    /// Every active transaction, in any state.
    async fn active_transactions(&mut self) -> Result<Vec<ActiveTransaction>>;

    /// Statements executing right now, with monitor probes and
    /// housekeeping statements removed.
    async fn running_queries(&mut self) -> Result<Vec<RunningQuery>>;

    /// Free-form engine status text.
    async fn engine_status(&mut self) -> Result<String>;
}

/// Housekeeping statements that say nothing about lock contention.
const HOUSEKEEPING: &[&str] = &[
    "commit",
    "rollback",
    "select now()",
    "set autocommit=0",
    "set autocommit=1",
];

fn normalize_statement(statement: &str) -> String {
    let collapsed = statement
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let trimmed = collapsed.trim_end_matches(';').trim_end();
    // Spacing around `=` carries no meaning.
    trimmed
        .split('=')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("=")
}

/// True for statements the monitor itself sent.
#[must_use]
pub fn is_probe(statement: &str) -> bool {
    statement.contains(PROBE_MARKER)
}

/// True for bookkeeping statements excluded from reports.
#[must_use]
pub fn is_housekeeping(statement: &str) -> bool {
    let normalized = normalize_statement(statement);
    HOUSEKEEPING.contains(&normalized.as_str())
}

/// Drop the monitor's own session, its probe statements, and housekeeping
/// statements from a process-list read.
#[must_use]
pub fn filter_running_queries(
    rows: Vec<RunningQuery>,
    own_connection_id: Option<u64>,
) -> Vec<RunningQuery> {
    rows.into_iter()
        .filter(|row| Some(row.thread_id) != own_connection_id)
        .filter(|row| !is_probe(&row.statement))
        .filter(|row| !is_housekeeping(&row.statement))
        .collect()
}
