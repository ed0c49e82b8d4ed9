//! lockwatch-core: Core library for lockwatch
//!
//! Watches a MySQL server's InnoDB transactions and reports, once per
//! transaction, those stuck in lock wait longer than a threshold.
//!
//! # Architecture
//!
//! ```text
//! Monitor (ticker) → SnapshotSource (MySQL) → TransactionTracker
//!                                                  ↓ alert events
//!                          diagnostics → AlertReport → AlertSink (file)
//! ```
//!
//! # Modules
//!
//! - `tracker`: lock-wait state machine across snapshots
//! - `report`: structured alert report and its text rendering
//! - `snapshot`: snapshot source contract and statement filtering
//! - `mysql`: `mysql_async` implementation of the snapshot source
//! - `sink`: alert sinks (append-only file)
//! - `monitor`: poll loop driver
//! - `config`: connection and monitor parameters
//! - `logging`: tracing subscriber setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod mysql;
pub mod report;
pub mod sink;
pub mod snapshot;
pub mod tracker;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
