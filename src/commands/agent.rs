//! Agent team commands

use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::agent::prompt::build_prompt;
use crate::agent::{AgentDescriptor, Role, roster};
use crate::cli::{AgentAction, OutputFormat};
use crate::config::Config;
use crate::response::AgentOutput;
use crate::state::{Message, Recipient, SYSTEM};

pub fn run(action: AgentAction, config: &Config) -> Result<()> {
    match action {
        AgentAction::List { format } => list_agents(OutputFormat::resolve(format), config),
        AgentAction::Prompt { role, message } => show_prompt(&role, message.as_deref(), config),
    }
}

fn list_agents(format: OutputFormat, config: &Config) -> Result<()> {
    let team = roster(&config.niche);

    #[derive(Serialize)]
    struct AgentSummary {
        id: String,
        role: String,
        goals: Vec<String>,
        document: String,
        next: String,
    }

    let summaries: Vec<AgentSummary> = team
        .iter()
        .map(|a| AgentSummary {
            id: a.id.to_string(),
            role: a.role.clone(),
            goals: a.goals.clone(),
            document: a.id.document().to_string(),
            next: a.id.next().to_string(),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => {
            println!("{}", "Startup Team (speaking order):".bold());
            println!();

            for agent in &team {
                println!(
                    "  {} {} {}",
                    "●".green(),
                    agent.display_name.bold(),
                    format!("→ {}", agent.id.next()).dimmed()
                );
                println!("    {}", agent.role.dimmed());
                println!("    Document: {}", agent.id.document().magenta());
                for goal in &agent.goals {
                    println!("    - {}", goal);
                }
                println!();
            }
        }
    }

    Ok(())
}

fn show_prompt(role: &str, message: Option<&str>, config: &Config) -> Result<()> {
    let role: Role = role.parse().map_err(|e: String| eyre::eyre!(e))?;
    let descriptor = AgentDescriptor::for_role(role, &config.niche);

    let context: Vec<Message> = message
        .map(|text| {
            Message::from_output(
                SYSTEM,
                Recipient::One(role),
                "Preview",
                &AgentOutput::PlainText(text.to_string()),
            )
        })
        .into_iter()
        .collect();

    println!("{}", build_prompt(&descriptor, &context));

    Ok(())
}
