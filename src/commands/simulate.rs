//! Run a simulation

use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use terminal_size::{Width, terminal_size};

use crate::agent::roster;
use crate::cli::OutputFormat;
use crate::config::{Config, ObservabilitySink};
use crate::observability::EventEmitter;
use crate::orchestrator::{CancelToken, Orchestrator, Outcome, RunOutcome, RunRequest, TranscriptEntry};
use crate::state::{MessageBody, StateStore};
use crate::transport::ChatCompletionsTransport;

pub fn run(
    prompt: Option<String>,
    max_rounds: Option<u32>,
    time_limit: Option<u64>,
    request: Option<PathBuf>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let request = match request {
        Some(path) => read_request(&path)?,
        None => RunRequest {
            prompt: prompt.unwrap_or_else(|| config.simulation.prompt.clone()),
            max_rounds: max_rounds.unwrap_or(config.simulation.max_rounds),
        },
    };

    let transport = ChatCompletionsTransport::from_config(&config.model)?;
    let store = StateStore::new(config.state_path());
    let mut orchestrator = Orchestrator::new(transport, store, &config.niche, roster(&config.niche));

    if config.observability.enabled {
        let mut observability = config.observability.clone();
        // Keep machine-readable output clean
        if format != OutputFormat::Text {
            observability.sinks.retain(|s| *s != ObservabilitySink::Stdout);
        }
        orchestrator = orchestrator.with_emitter(EventEmitter::new(observability, config.events_path()));
    }

    if format == OutputFormat::Text {
        println!(
            "{} Simulating {} for {} round(s)",
            "→".blue(),
            config.niche.cyan(),
            request.max_rounds.max(1)
        );
        println!();
    }

    let cancel = CancelToken::new();
    if let Some(secs) = time_limit {
        cancel_after(cancel.clone(), Duration::from_secs(secs));
    }

    let outcome = orchestrator.run(&request, &cancel)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.into_response())?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&outcome.into_response())?),
        OutputFormat::Text => print_transcript(&outcome, orchestrator.store().path()),
    }

    Ok(())
}

/// Set `cancel` once `limit` has elapsed; the run stops before its next turn
fn cancel_after(cancel: CancelToken, limit: Duration) {
    thread::spawn(move || {
        thread::sleep(limit);
        log::info!("Time limit of {}s reached, cancelling", limit.as_secs());
        cancel.cancel();
    });
}

/// Read a JSON run request from a file, or stdin for "-"
fn read_request(path: &Path) -> Result<RunRequest> {
    let content = if path == Path::new("-") {
        io::read_to_string(io::stdin()).context("Failed to read request from stdin")?
    } else {
        fs::read_to_string(path).context(format!("Failed to read request {}", path.display()))?
    };

    serde_json::from_str(&content).context("Failed to parse run request")
}

/// Get terminal width, defaulting to 80 if not available
fn get_terminal_width() -> usize {
    terminal_size().map(|(Width(w), _)| w as usize).unwrap_or(80)
}

/// Truncate to max_width characters, marking the cut
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Lines shown for one response
fn response_lines(response: &MessageBody) -> Vec<String> {
    match response {
        MessageBody::Text(text) => text.lines().map(str::to_string).collect(),
        MessageBody::Structured(envelope) => {
            let mut lines: Vec<String> = envelope.decision.lines().map(str::to_string).collect();
            lines.extend(envelope.messages.iter().map(|m| format!("• {}", m)));
            if let Some(status) = &envelope.status {
                lines.push(format!("status: {}", status));
            }
            lines
        }
    }
}

fn print_entry(index: usize, entry: &TranscriptEntry, width: usize) {
    println!(
        "{} {}",
        format!("{:>2}.", index + 1).dimmed(),
        format!("{} → {}", entry.from, entry.to).bold()
    );

    let lines = response_lines(&entry.response);
    let is_error = matches!(&entry.response, MessageBody::Text(t) if t.starts_with("ERROR calling "));
    for line in lines {
        let line = truncate(&line, width.saturating_sub(4).max(20));
        if is_error {
            println!("    {}", line.red());
        } else {
            println!("    {}", line);
        }
    }
    println!();
}

fn print_transcript(outcome: &RunOutcome, snapshot: &Path) {
    let width = get_terminal_width();

    for (i, entry) in outcome.conversation.iter().enumerate() {
        print_entry(i, entry, width);
    }

    let summary = format!("{} turns", outcome.conversation.len());
    match outcome.outcome {
        Outcome::Done => println!("{} Done after {}", "✓".green(), summary),
        Outcome::Exhausted => println!("{} Round budget exhausted after {}", "⚠".yellow(), summary),
        Outcome::Cancelled => println!("{} Time limit reached after {}", "✗".red(), summary),
    }
    println!("{}", format!("State saved to {}", snapshot.display()).dimmed());
}
