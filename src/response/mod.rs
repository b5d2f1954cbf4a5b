//! Agent responses
//!
//! Raw model text is classified once into an [`AgentOutput`]; every variant
//! has a canonical [`Envelope`] view so downstream code never guesses at
//! shapes.

use serde::{Deserialize, Serialize};

pub mod normalize;
pub mod termination;

pub use normalize::{normalize, parse_structured};
pub use termination::is_done;

/// Canonical structured agent answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub artifacts: Vec<serde_json::Value>,
    #[serde(default)]
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Role-specific keys (architecture, campaigns, ...) kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Envelope {
    /// Envelope for text that carried no structure
    pub fn fallback(text: &str) -> Self {
        Self {
            decision: text.trim().to_string(),
            ..Default::default()
        }
    }

    /// Compact JSON form, as forwarded to the next agent
    pub fn to_canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.decision.clone())
    }
}

/// What a single turn produced
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// The model answered with a JSON object (possibly wrapped in prose)
    Structured(Envelope),
    /// The model answered with text only
    PlainText(String),
    /// The transport failed; holds the annotated error line
    Error(String),
}

impl AgentOutput {
    /// Classify raw model text
    pub fn from_raw(raw: &str) -> Self {
        match parse_structured(raw) {
            Some(envelope) => AgentOutput::Structured(envelope),
            None => {
                log::debug!("Response carried no JSON object, keeping {} chars as text", raw.len());
                AgentOutput::PlainText(raw.trim().to_string())
            }
        }
    }

    /// Record a failed call to `agent_id`
    pub fn transport_error(agent_id: &str, cause: &eyre::Report) -> Self {
        AgentOutput::Error(format!("ERROR calling {} agent: {:#}", agent_id, cause))
    }

    /// Canonical envelope view of any output
    pub fn envelope(&self) -> Envelope {
        match self {
            AgentOutput::Structured(envelope) => envelope.clone(),
            AgentOutput::PlainText(text) => normalize(text),
            AgentOutput::Error(text) => Envelope::fallback(text),
        }
    }

    /// Text handed to the next agent
    pub fn forward_text(&self) -> String {
        match self {
            AgentOutput::Structured(envelope) => envelope.to_canonical(),
            AgentOutput::PlainText(text) | AgentOutput::Error(text) => text.clone(),
        }
    }

    /// Short label for logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            AgentOutput::Structured(_) => "structured",
            AgentOutput::PlainText(_) => "text",
            AgentOutput::Error(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentOutput::Error(_))
    }
}
