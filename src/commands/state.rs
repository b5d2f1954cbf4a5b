//! Inspect the persisted simulation state

use colored::*;
use eyre::Result;

use crate::agent::Role;
use crate::cli::{OutputFormat, StateAction};
use crate::config::Config;
use crate::state::{SharedState, StateStore};

/// Messages listed by `state show`
const RECENT_MESSAGES: usize = 5;

pub fn run(action: StateAction, config: &Config) -> Result<()> {
    let store = StateStore::new(config.state_path());

    match action {
        StateAction::Show { format } => show(&store, OutputFormat::resolve(format)),
        StateAction::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
    }
}

fn show(store: &StateStore, format: OutputFormat) -> Result<()> {
    let state = store.load()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&state)?),
        OutputFormat::Text => print_summary(&state),
    }

    Ok(())
}

fn print_summary(state: &SharedState) {
    println!("{}", "Simulation State".bold());
    println!("  niche: {}", state.meta.niche.cyan());
    println!("  created: {}", state.meta.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!();

    println!("{}:", "agents".cyan());
    for role in Role::ORDER {
        if let Some(agent) = state.agent(role) {
            let heard = state.chat_history.iter().filter(|m| m.to.includes(role)).count();
            println!(
                "  {} {} {}",
                "●".green(),
                agent.display_name.bold(),
                format!("({} heard, {} remembered)", heard, agent.memory.short_term.len()).dimmed()
            );
            match state.last_message_from(role.id()) {
                Some(message) => println!("    last: {}", message.subject.dimmed()),
                None => println!("    {}", "(no turns yet)".dimmed()),
            }
            if let Some(memory) = agent.latest_memory() {
                println!("    latest: {}", memory.title);
            }
        }
    }
    println!();

    println!("{}:", "documents".cyan());
    for (name, content) in &state.documents {
        let paragraphs = content.split("\n\n").filter(|p| !p.is_empty()).count();
        println!("  {}: {} paragraph(s)", name, paragraphs);
    }
    println!();

    println!("{}: {} message(s)", "chat_history".cyan(), state.chat_history.len());
    let skip = state.chat_history.len().saturating_sub(RECENT_MESSAGES);
    for message in state.chat_history.iter().skip(skip) {
        let subject = if message.output().is_error() {
            message.subject.red()
        } else {
            message.subject.normal()
        };
        println!("  {} {} → {}: {}", "•".dimmed(), message.from, message.to, subject);
    }
}
