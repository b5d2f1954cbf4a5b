//! The four startup roles
//!
//! Every per-role difference (persona, goals, seed memory, answer schema,
//! owned document) lives in the lookup tables below. There is exactly one
//! code path for all agents.

use serde::{Deserialize, Serialize};

/// A seat at the startup table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "CEO")]
    Ceo,
    #[serde(rename = "CTO")]
    Cto,
    Designer,
    Marketer,
}

impl Role {
    /// Speaking order, cyclic
    pub const ORDER: [Role; 4] = [Role::Ceo, Role::Cto, Role::Designer, Role::Marketer];

    /// Stable identifier used in snapshots and transcripts
    pub fn id(&self) -> &'static str {
        match self {
            Role::Ceo => "CEO",
            Role::Cto => "CTO",
            Role::Designer => "Designer",
            Role::Marketer => "Marketer",
        }
    }

    /// Position in the speaking order
    pub fn index(&self) -> usize {
        match self {
            Role::Ceo => 0,
            Role::Cto => 1,
            Role::Designer => 2,
            Role::Marketer => 3,
        }
    }

    /// The role that speaks after this one
    pub fn next(&self) -> Role {
        Role::ORDER[(self.index() + 1) % Role::ORDER.len()]
    }

    /// Everyone but this role, in speaking order
    pub fn others(&self) -> Vec<Role> {
        Role::ORDER.iter().copied().filter(|r| r != self).collect()
    }

    /// Short role description
    pub fn description(&self) -> &'static str {
        match self {
            Role::Ceo => "Vision and strategy leader",
            Role::Cto => "Technology strategist and product builder",
            Role::Designer => "UX/UI Designer",
            Role::Marketer => "Growth and customer acquisition",
        }
    }

    /// Description used for a bare descriptor that nobody configured
    pub fn bare_description(&self) -> &'static str {
        match self {
            Role::Ceo => "Vision and strategy leader",
            Role::Cto => "Tech strategist",
            Role::Designer => "UX/UI",
            Role::Marketer => "Growth",
        }
    }

    /// Persona instruction text
    pub fn persona(&self, niche: &str) -> String {
        match self {
            Role::Ceo => format!(
                "You are the CEO agent of a startup in the niche: {}. \
                 Define vision, set strategy, and coordinate CTO, Designer, and Marketer. \
                 Always be concise, strategic, and clear.",
                niche
            ),
            Role::Cto => "You are the CTO agent. Your job is to design the tech stack, \
                          plan product architecture, and oversee development. \
                          Be clear, technical, and practical."
                .to_string(),
            Role::Designer => "You are the Designer agent for the startup. \
                               Your role is to create product interface concepts, improve usability, \
                               and ensure visual appeal matches the business vision. \
                               You collaborate with CEO and CTO to produce detailed text-based mockups, \
                               color schemes, and layout suggestions."
                .to_string(),
            Role::Marketer => "You are the Marketer agent of a startup. \
                               Your job is to analyze the target market, create marketing strategies, \
                               design campaigns, and suggest growth tactics. \
                               Always return structured, actionable output."
                .to_string(),
        }
    }

    /// Ordered goal list
    pub fn goals(&self) -> &'static [&'static str] {
        match self {
            Role::Ceo => &[
                "Define startup vision and mission",
                "Coordinate CTO, Designer, and Marketer",
                "Produce business plan and roadmap",
                "Ensure market alignment and feasibility",
            ],
            Role::Cto => &[
                "Select the best tech stack for the startup",
                "Plan the system architecture",
                "Coordinate development timelines",
                "Ensure scalability and security",
            ],
            Role::Designer => &[
                "Create intuitive UI/UX flows",
                "Propose color palettes and typography",
                "Ensure accessibility and responsiveness",
                "Collaborate with CTO on technical feasibility",
            ],
            Role::Marketer => &[
                "Identify target customer segments",
                "Design creative campaigns",
                "Plan social media and content strategy",
                "Suggest growth and distribution tactics",
            ],
        }
    }

    /// Seed long-term memory as (id, title) pairs
    pub fn seed_memory(&self, niche: &str) -> Vec<(String, String)> {
        match self {
            Role::Ceo => vec![
                ("goal_1".to_string(), "Reach 10k MAU in 12 months".to_string()),
                ("context_niche".to_string(), format!("Startup niche: {}", niche)),
            ],
            Role::Cto => vec![("tech_pref".to_string(), "Favor modern, cost-efficient stack".to_string())],
            Role::Designer => vec![("design_pref".to_string(), "Favor minimalistic and modern UI".to_string())],
            Role::Marketer => vec![(
                "marketing_goal".to_string(),
                "Reach 100k impressions in 6 months".to_string(),
            )],
        }
    }

    /// The literal JSON object shape this role must answer with
    pub fn response_schema(&self) -> &'static str {
        match self {
            Role::Ceo => {
                r##"{
  "messages": [],
  "artifacts": [],
  "decision": "your concise decision here",
  "status": "in_progress or done"
}"##
            }
            Role::Cto => {
                r##"{
  "messages": [],
  "artifacts": [],
  "decision": "your concise technical decision here",
  "architecture": "system architecture summary",
  "tools": ["tool1", "tool2"],
  "timeline": "delivery timeline",
  "status": "in_progress or done"
}"##
            }
            Role::Designer => {
                r##"{
  "messages": [],
  "artifacts": [],
  "decision": "your concise design decision here",
  "layout": "layout description",
  "colors": ["#hex1", "#hex2"],
  "typography": "font choices",
  "notes": "feature highlights",
  "status": "in_progress or done"
}"##
            }
            Role::Marketer => {
                r##"{
  "messages": [],
  "artifacts": [],
  "decision": "your concise marketing decision here",
  "campaigns": ["idea1", "idea2"],
  "social_post": "short engaging example post",
  "growth_strategies": ["strategy1", "strategy2"],
  "status": "in_progress or done"
}"##
            }
        }
    }

    /// Shared document this role's decisions accumulate into
    pub fn document(&self) -> &'static str {
        match self {
            Role::Ceo => "business_plan",
            Role::Cto => "roadmap",
            Role::Designer => "designs",
            Role::Marketer => "marketing_plan",
        }
    }
}

/// Document names every fresh state starts with
pub const DOCUMENTS: [&str; 5] = ["business_plan", "swot_analysis", "roadmap", "designs", "marketing_plan"];

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ceo" => Ok(Role::Ceo),
            "cto" => Ok(Role::Cto),
            "designer" => Ok(Role::Designer),
            "marketer" => Ok(Role::Marketer),
            _ => Err(format!("Unknown role: {} (expected CEO, CTO, Designer or Marketer)", s)),
        }
    }
}
