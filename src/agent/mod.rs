//! Agent registry for the startup team
//!
//! Agents are fixed roles described by data:
//! - Persona and goals (who they are)
//! - Long-term and short-term memory (what they remember)
//! - Answer schema (how they must reply)

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub mod prompt;
pub mod roles;

pub use roles::Role;

/// One remembered fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub title: String,
    pub created: DateTime<Local>,
}

impl MemoryItem {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            created: Local::now(),
        }
    }
}

/// Agent memory, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub long_term: Vec<MemoryItem>,
    #[serde(default)]
    pub short_term: Vec<MemoryItem>,
}

/// A role's identity, persona and memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: Role,
    pub display_name: String,
    pub role: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub memory: Memory,
    pub created_at: DateTime<Local>,
}

impl AgentDescriptor {
    /// Fully populated descriptor from the role tables
    pub fn for_role(role: Role, niche: &str) -> Self {
        let long_term = role
            .seed_memory(niche)
            .iter()
            .map(|(id, title)| MemoryItem::new(id, title))
            .collect();

        Self {
            id: role,
            display_name: role.id().to_string(),
            role: role.description().to_string(),
            system_prompt: role.persona(niche),
            goals: role.goals().iter().map(|g| g.to_string()).collect(),
            memory: Memory {
                long_term,
                short_term: Vec::new(),
            },
            created_at: Local::now(),
        }
    }

    /// Placeholder for a role nobody configured: no persona, goals or memory
    pub fn bare(role: Role) -> Self {
        Self {
            id: role,
            display_name: role.id().to_string(),
            role: role.bare_description().to_string(),
            system_prompt: String::new(),
            goals: Vec::new(),
            memory: Memory::default(),
            created_at: Local::now(),
        }
    }

    /// Append to short-term memory (the only mutation a descriptor allows)
    pub fn remember(&mut self, item: MemoryItem) {
        self.memory.short_term.push(item);
    }

    /// Most recent short-term memory item
    pub fn latest_memory(&self) -> Option<&MemoryItem> {
        self.memory.short_term.last()
    }
}

/// The full team, in speaking order
pub fn roster(niche: &str) -> Vec<AgentDescriptor> {
    Role::ORDER.iter().map(|r| AgentDescriptor::for_role(*r, niche)).collect()
}
