//! Turn event emitter with multiple sink support

use chrono::{Local, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::config::{ObservabilityConfig, ObservabilitySink};
use crate::response::AgentOutput;
use crate::scheduler::Turn;

/// One observable turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    /// Timestamp (UTC ISO 8601)
    pub timestamp: String,
    /// Local time for display
    pub local_time: String,
    pub turn: usize,
    pub round: u32,
    pub from: String,
    pub to: String,
    /// structured, text or error
    pub kind: String,
    pub done: bool,
}

impl TurnEvent {
    pub fn from_turn(turn: &Turn, output: &AgentOutput, done: bool) -> Self {
        let now = Utc::now();
        let local = Local::now();

        Self {
            timestamp: now.to_rfc3339(),
            local_time: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            turn: turn.number,
            round: turn.round,
            from: turn.from.to_string(),
            to: turn.to.to_string(),
            kind: output.kind().to_string(),
            done,
        }
    }

    /// Format for stdout display
    pub fn format_display(&self) -> String {
        let kind_colored = match self.kind.as_str() {
            "structured" => self.kind.green(),
            "text" => self.kind.yellow(),
            "error" => self.kind.red(),
            _ => self.kind.normal(),
        };

        let mut parts = vec![
            self.local_time.dimmed().to_string(),
            format!("#{}", self.turn).dimmed().to_string(),
            format!("{} → {}", self.from, self.to).bold().to_string(),
            kind_colored.to_string(),
        ];

        if self.done {
            parts.push("DONE".cyan().bold().to_string());
        }

        parts.join(" ")
    }
}

/// Event emitter that sends to multiple sinks
pub struct EventEmitter {
    config: ObservabilityConfig,
    events_path: PathBuf,
}

impl EventEmitter {
    pub fn new(config: ObservabilityConfig, events_path: PathBuf) -> Self {
        Self { config, events_path }
    }

    /// Emit an event to all configured sinks. Sink failures are logged, never raised.
    pub fn emit(&self, event: &TurnEvent) {
        if !self.config.enabled {
            return;
        }

        for sink in &self.config.sinks {
            match sink {
                ObservabilitySink::File => {
                    if let Err(e) = self.emit_to_file(event) {
                        log::warn!("Failed to emit to file sink: {}", e);
                    }
                }
                ObservabilitySink::Stdout => {
                    self.emit_to_stdout(event);
                }
            }
        }
    }

    /// Append event to the day's JSONL file
    fn emit_to_file(&self, event: &TurnEvent) -> std::io::Result<()> {
        let now = Local::now();
        let month_dir = self.events_path.join(now.format("%Y-%m").to_string());
        fs::create_dir_all(&month_dir)?;

        let log_file = month_dir.join(format!("{}.jsonl", now.format("%Y-%m-%d")));

        let mut file = OpenOptions::new().create(true).append(true).open(log_file)?;

        let json = serde_json::to_string(event).map_err(std::io::Error::other)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    fn emit_to_stdout(&self, event: &TurnEvent) {
        println!("{}", event.format_display());
    }
}
