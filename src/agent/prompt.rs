//! Prompt assembly
//!
//! Pure string building: persona, long-term memory, the latest message from
//! each sender, then the answer schema. Same inputs, same prompt.

use super::AgentDescriptor;
use crate::state::Message;

/// Build the full prompt for `descriptor` given the messages it can see
pub fn build_prompt(descriptor: &AgentDescriptor, context: &[Message]) -> String {
    let mut parts = Vec::new();

    parts.push(descriptor.system_prompt.clone());

    let memory = serde_json::to_string_pretty(&descriptor.memory.long_term).unwrap_or_else(|_| "[]".to_string());
    parts.push(format!("Long-term memory: {}", memory));

    let recent = latest_per_sender(descriptor, context);
    if recent.is_empty() {
        parts.push("Recent messages: None".to_string());
    } else {
        for message in recent {
            parts.push(format!("Recent {} message: {}", message.from, message.body.render()));
        }
    }

    parts.push(format!(
        "Respond ONLY in valid JSON format with the following structure:\n{}",
        descriptor.id.response_schema()
    ));

    parts.join("\n")
}

/// Newest message of each distinct sender, newest first, skipping the agent's own
fn latest_per_sender<'a>(descriptor: &AgentDescriptor, context: &'a [Message]) -> Vec<&'a Message> {
    let own_id = descriptor.id.id();
    let mut seen: Vec<&str> = Vec::new();
    let mut recent = Vec::new();

    for message in context.iter().rev() {
        if message.from == own_id || seen.contains(&message.from.as_str()) {
            continue;
        }
        seen.push(&message.from);
        recent.push(message);
    }

    recent
}
