//! Structured run log.
//!
//! Every run accumulates an append-only list of [`LogEvent`]s; nothing is
//! ever restructured, only appended. The list renders to the line-oriented
//! transcript operators read (`>` step lines, `| Error(n) ... !!!` failure
//! markers) or to JSON for machine consumption, and flushes to stdout or a
//! log file at the end of the run.

use std::io::Write;
use std::panic::Location;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// Operation category codes, used to tag failures in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    /// Code 1: create table (fresh import).
    CreateTable = 1,
    /// Code 2: create index (fresh import).
    CreateIndex = 2,
    /// Code 3: add primary key (fresh import).
    AddPrimaryKey = 3,
    /// Code 4: add foreign key (fresh import post-pass).
    AddForeignKey = 4,
    /// Code 5: insert seed data.
    InsertData = 5,
    /// Code 6: reset auto-increment sequence.
    ResetSequence = 6,
    /// Code 7: update table or column.
    UpdateTable = 7,
    /// Code 8: update index.
    UpdateIndex = 8,
    /// Code 9: update primary key.
    UpdatePrimaryKey = 9,
    /// Code 10: update foreign key.
    UpdateForeignKey = 10,
}

impl OpCode {
    /// Numeric code as it appears in the transcript.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Outcome of one logged step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepOutcome {
    /// The operation succeeded.
    Done,
    /// The operation failed and was recorded.
    Failed {
        /// Operation category code.
        code: u8,
        /// Failure message from the driver.
        message: String,
        /// Source location that recorded the failure.
        location: String,
    },
}

/// One entry in the run log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LogEvent {
    /// A named section opened (e.g. "add tables").
    SectionStart { name: String },
    /// A named section closed.
    SectionEnd { name: String },
    /// One operation step with its outcome.
    Step {
        op: OpCode,
        action: String,
        target: String,
        outcome: StepOutcome,
    },
    /// Informational sub-step (e.g. a per-dialect override being applied).
    Note { text: String },
    /// A flagged condition that is not an operation failure.
    Warning { text: String },
}

/// Where to flush the rendered transcript.
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Write to standard output.
    Stdout,
    /// Append to the given file.
    File(PathBuf),
}

/// Append-only run log; one per run.
#[derive(Debug)]
pub struct ImportLog {
    started_at: DateTime<Utc>,
    events: Vec<LogEvent>,
}

impl Default for ImportLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportLog {
    /// Create an empty log stamped with the current time.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    /// When the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// All recorded events, in order.
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// Open a named section.
    pub fn section(&mut self, name: &str) {
        self.events.push(LogEvent::SectionStart {
            name: name.to_string(),
        });
    }

    /// Close a named section.
    pub fn end_section(&mut self, name: &str) {
        self.events.push(LogEvent::SectionEnd {
            name: name.to_string(),
        });
    }

    /// Record a successful step.
    pub fn done(&mut self, op: OpCode, action: &str, target: &str) {
        self.events.push(LogEvent::Step {
            op,
            action: action.to_string(),
            target: target.to_string(),
            outcome: StepOutcome::Done,
        });
    }

    /// Record a failed step, tagging it with the caller's source location.
    #[track_caller]
    pub fn failed(&mut self, op: OpCode, action: &str, target: &str, message: &str) {
        let loc = Location::caller();
        self.events.push(LogEvent::Step {
            op,
            action: action.to_string(),
            target: target.to_string(),
            outcome: StepOutcome::Failed {
                code: op.code(),
                message: message.to_string(),
                location: format!("{}:{}", loc.file(), loc.line()),
            },
        });
    }

    /// Record an informational sub-step.
    pub fn note(&mut self, text: impl Into<String>) {
        self.events.push(LogEvent::Note { text: text.into() });
    }

    /// Record a flagged condition.
    pub fn warning(&mut self, text: impl Into<String>) {
        self.events.push(LogEvent::Warning { text: text.into() });
    }

    /// Number of failed steps in the log.
    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    LogEvent::Step {
                        outcome: StepOutcome::Failed { .. },
                        ..
                    }
                )
            })
            .count()
    }

    /// Number of failed steps carrying the given code.
    pub fn error_count_for(&self, code: u8) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    LogEvent::Step {
                        outcome: StepOutcome::Failed { code: c, .. },
                        ..
                    } if *c == code
                )
            })
            .count()
    }

    /// Number of operation steps (successful or failed).
    pub fn step_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, LogEvent::Step { .. }))
            .count()
    }

    /// Render the human-readable transcript.
    pub fn render_text(&self) -> String {
        let mut out = String::from("\n");
        for event in &self.events {
            match event {
                LogEvent::SectionStart { name } => {
                    out.push_str(&format!("> start {}\n", name));
                }
                LogEvent::SectionEnd { name } => {
                    out.push_str(&format!("# end {}\n", name));
                }
                LogEvent::Step {
                    action,
                    target,
                    outcome,
                    ..
                } => match outcome {
                    StepOutcome::Done => {
                        out.push_str(&format!("  > {}: {} ... done\n", action, target));
                    }
                    StepOutcome::Failed {
                        code,
                        message,
                        location,
                    } => {
                        out.push_str(&format!(
                            "  > {}: {} ...  | Error({}) [{}] in {} !!!\n",
                            action, target, code, message, location
                        ));
                    }
                },
                LogEvent::Note { text } => {
                    out.push_str(&format!("    > {}\n", text));
                }
                LogEvent::Warning { text } => {
                    out.push_str(&format!("   > Error: {} !!!\n", text));
                }
            }
        }
        out
    }

    /// Render the log as a JSON array of events.
    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }

    /// Flush the rendered transcript to stdout or append it to a file.
    pub fn flush(&self, output: &LogOutput) -> Result<()> {
        let text = self.render_text();
        match output {
            LogOutput::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            LogOutput::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                file.write_all(text.as_bytes())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text_transcript() {
        let mut log = ImportLog::new();
        log.section("add tables");
        log.done(OpCode::CreateTable, "add table", "widget");
        log.failed(OpCode::CreateIndex, "create index", "widget_name", "boom");
        log.end_section("add tables");

        let text = log.render_text();
        assert!(text.contains("> start add tables\n"));
        assert!(text.contains("  > add table: widget ... done\n"));
        assert!(text.contains("| Error(2) [boom] in "));
        assert!(text.contains(" !!!\n"));
        assert!(text.contains("# end add tables\n"));
    }

    #[test]
    fn test_error_counts() {
        let mut log = ImportLog::new();
        log.done(OpCode::CreateTable, "add table", "a");
        log.failed(OpCode::CreateTable, "add table", "b", "dup");
        log.failed(OpCode::InsertData, "add data to table", "c", "bad row");
        assert_eq!(log.error_count(), 2);
        assert_eq!(log.error_count_for(1), 1);
        assert_eq!(log.error_count_for(5), 1);
        assert_eq!(log.step_count(), 3);
    }

    #[test]
    fn test_render_json_is_parseable() {
        let mut log = ImportLog::new();
        log.section("add tables");
        log.done(OpCode::CreateTable, "add table", "widget");
        let json = log.render_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_flush_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.log");
        let mut log = ImportLog::new();
        log.section("add tables");
        log.flush(&LogOutput::File(path.clone())).unwrap();
        log.flush(&LogOutput::File(path.clone())).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("> start add tables").count(), 2);
    }
}
