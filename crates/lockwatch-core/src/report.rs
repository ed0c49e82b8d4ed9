//! Alert reports.
//!
//! An [`AlertReport`] is the structured form of one alert: the blocked
//! transaction, everything else running on the server at alert time, and
//! the engine status text. [`AlertReport::render`] is the only place that
//! decides what the alert log looks like.

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::RunningQuery;
use crate::tracker::AlertEvent;

const FRAME_RULE: &str =
    "================================================================================";
const SECTION_RULE: &str =
    "--------------------------------------------------------------------------------";

/// Structured diagnostic report for one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReport {
    pub transaction_id: String,
    pub thread_id: u64,
    pub query: Option<String>,
    pub waited: Duration,
    pub first_seen: DateTime<Utc>,
    pub running: Vec<RunningQuery>,
    pub engine_status: String,
}

impl AlertReport {
    #[must_use]
    pub fn new(event: &AlertEvent, running: Vec<RunningQuery>, engine_status: String) -> Self {
        Self {
            transaction_id: event.id.clone(),
            thread_id: event.thread_id,
            query: event.query.clone(),
            waited: event.waited,
            first_seen: event.first_seen,
            running,
            engine_status,
        }
    }

    /// Render the report as a human-readable text block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{FRAME_RULE}");
        let _ = writeln!(out, "Lock wait alert: transaction {}", self.transaction_id);
        let _ = writeln!(
            out,
            "First seen waiting: {}",
            self.first_seen.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let _ = writeln!(out, "Waited: {}s", self.waited.as_secs());

        let _ = writeln!(out, "{SECTION_RULE}");
        let _ = writeln!(out, "Blocked thread: {}", self.thread_id);
        let _ = writeln!(out, "Query:");
        match self.query.as_deref() {
            Some(query) => push_indented(&mut out, query, "  "),
            None => {
                let _ = writeln!(out, "  (no statement)");
            }
        }

        let _ = writeln!(out, "{SECTION_RULE}");
        let _ = writeln!(out, "Active queries ({}):", self.running.len());
        for (n, running) in self.running.iter().enumerate() {
            let _ = writeln!(
                out,
                "  [{}] {} (thread {})",
                n + 1,
                running.component,
                running.thread_id
            );
            push_indented(&mut out, &running.statement, "      ");
        }

        let _ = writeln!(out, "{SECTION_RULE}");
        let _ = writeln!(out, "Engine status:");
        out.push_str(&self.engine_status);
        if !self.engine_status.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "{FRAME_RULE}");

        out
    }
}

fn push_indented(out: &mut String, text: &str, indent: &str) {
    for line in text.lines() {
        let _ = writeln!(out, "{indent}{line}");
    }
}

/// Build and render the report for one alert.
#[must_use]
pub fn format_report(
    event: &AlertEvent,
    running_queries: Vec<RunningQuery>,
    engine_status: String,
) -> String {
    AlertReport::new(event, running_queries, engine_status).render()
}
