//! Completion signal detection

use super::AgentOutput;

const DONE: &str = "done";

/// True when a turn explicitly signals that the team is finished.
///
/// Structured answers must say so in `status`; plain text only needs to
/// mention "DONE" anywhere. Transport errors never end a run.
pub fn is_done(output: &AgentOutput) -> bool {
    match output {
        AgentOutput::Structured(envelope) => envelope
            .status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case(DONE))
            .unwrap_or(false),
        AgentOutput::PlainText(text) => text.to_lowercase().contains(DONE),
        AgentOutput::Error(_) => false,
    }
}
