//! Shared simulation state
//!
//! One document holds the team, the named working documents and the
//! append-only chat history. It is persisted as a whole by [`store::StateStore`].

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::agent::roles::DOCUMENTS;
use crate::agent::{AgentDescriptor, Role};
use crate::response::{AgentOutput, Envelope};

pub mod store;

pub use store::{StateError, StateStore};

/// Sender id for messages that did not come from an agent
pub const SYSTEM: &str = "SYSTEM";

/// Message type for ordinary turns
pub const KIND_PROPOSAL: &str = "proposal";

/// Message type for turns whose model call failed
pub const KIND_ERROR: &str = "error";

/// Who a message is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipient {
    One(Role),
    Broadcast(Vec<Role>),
}

impl Recipient {
    pub fn includes(&self, role: Role) -> bool {
        match self {
            Recipient::One(r) => *r == role,
            Recipient::Broadcast(roles) => roles.contains(&role),
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::One(role) => write!(f, "{}", role),
            Recipient::Broadcast(roles) => {
                let ids: Vec<&str> = roles.iter().map(|r| r.id()).collect();
                write!(f, "{}", ids.join(", "))
            }
        }
    }
}

/// Message payload: an envelope object or plain text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Structured(Envelope),
    Text(String),
}

impl MessageBody {
    /// Human-readable rendering (pretty JSON for envelopes)
    pub fn render(&self) -> String {
        match self {
            MessageBody::Structured(envelope) => {
                serde_json::to_string_pretty(envelope).unwrap_or_else(|_| envelope.decision.clone())
            }
            MessageBody::Text(text) => text.clone(),
        }
    }
}

impl From<&AgentOutput> for MessageBody {
    fn from(output: &AgentOutput) -> Self {
        match output {
            AgentOutput::Structured(envelope) => MessageBody::Structured(envelope.clone()),
            AgentOutput::PlainText(text) | AgentOutput::Error(text) => MessageBody::Text(text.clone()),
        }
    }
}

/// One turn record in the chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: Recipient,
    pub timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub body: MessageBody,
}

impl Message {
    /// Record a turn's output
    pub fn from_output(from: &str, to: Recipient, subject: &str, output: &AgentOutput) -> Self {
        Self {
            from: from.to_string(),
            to,
            timestamp: Local::now(),
            kind: if output.is_error() { KIND_ERROR } else { KIND_PROPOSAL }.to_string(),
            subject: subject.to_string(),
            body: MessageBody::from(output),
        }
    }

    /// Reconstruct the turn output this message recorded
    pub fn output(&self) -> AgentOutput {
        match (&self.body, self.kind.as_str()) {
            (MessageBody::Text(text), KIND_ERROR) => AgentOutput::Error(text.clone()),
            (MessageBody::Text(text), _) => AgentOutput::PlainText(text.clone()),
            (MessageBody::Structured(envelope), _) => AgentOutput::Structured(envelope.clone()),
        }
    }
}

/// Run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub created_at: DateTime<Local>,
    pub niche: String,
}

/// The complete persisted simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    pub agents: IndexMap<Role, AgentDescriptor>,
    #[serde(default)]
    pub documents: IndexMap<String, String>,
    #[serde(default)]
    pub chat_history: Vec<Message>,
    pub meta: Meta,
}

impl SharedState {
    /// Fresh state; roles missing from `roster` get bare descriptors
    pub fn new(niche: &str, roster: impl IntoIterator<Item = AgentDescriptor>) -> Self {
        let mut supplied: IndexMap<Role, AgentDescriptor> = roster.into_iter().map(|a| (a.id, a)).collect();

        let agents = Role::ORDER
            .iter()
            .map(|role| {
                let descriptor = supplied
                    .shift_remove(role)
                    .unwrap_or_else(|| AgentDescriptor::bare(*role));
                (*role, descriptor)
            })
            .collect();

        Self {
            agents,
            documents: DOCUMENTS.iter().map(|d| (d.to_string(), String::new())).collect(),
            chat_history: Vec::new(),
            meta: Meta {
                created_at: Local::now(),
                niche: niche.to_string(),
            },
        }
    }

    pub fn agent(&self, role: Role) -> Option<&AgentDescriptor> {
        self.agents.get(&role)
    }

    pub fn agent_mut(&mut self, role: Role) -> Option<&mut AgentDescriptor> {
        self.agents.get_mut(&role)
    }

    /// Append a paragraph to a named document, creating it if needed
    pub fn append_document(&mut self, name: &str, text: &str) {
        let doc = self.documents.entry(name.to_string()).or_default();
        if !doc.is_empty() {
            doc.push_str("\n\n");
        }
        doc.push_str(text);
    }

    /// Latest message sent by `from`
    pub fn last_message_from(&self, from: &str) -> Option<&Message> {
        self.chat_history.iter().rev().find(|m| m.from == from)
    }

    /// Check the fixed-team invariant and restore speaking order
    pub(crate) fn check_roster(&mut self) -> Result<(), String> {
        let missing: Vec<&str> = Role::ORDER
            .iter()
            .filter(|r| !self.agents.contains_key(*r))
            .map(|r| r.id())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing agents: {}", missing.join(", ")));
        }

        if let Some((role, descriptor)) = self.agents.iter().find(|(role, d)| d.id != **role) {
            return Err(format!("agent under key {} claims id {}", role, descriptor.id));
        }

        self.agents.sort_keys();
        Ok(())
    }
}
