//! Initialize the simulation snapshot

use colored::*;
use eyre::{Context, Result, bail};
use std::fs;

use crate::agent::roster;
use crate::config::Config;
use crate::state::StateStore;

pub fn run(niche: Option<String>, force: bool, config: &Config) -> Result<()> {
    let niche = niche.unwrap_or_else(|| config.niche.clone());
    let store = StateStore::new(config.state_path());

    println!("{} Initializing simulation for {}", "→".blue(), niche.cyan());

    if store.exists() && !force {
        bail!(
            "State already exists at {} (use --force to overwrite)",
            store.path().display()
        );
    }

    let state = store.initialize(&niche, roster(&niche))?;
    println!("  {} Created {}", "✓".green(), store.path().display());
    println!(
        "  {} {} agents, {} documents",
        "✓".green(),
        state.agents.len(),
        state.documents.len()
    );

    // Write a starter config next to the .env file unless one exists
    let startsim_dir = Config::startsim_dir();
    let config_file = startsim_dir.join("startsim.yaml");
    if !config_file.exists() {
        fs::create_dir_all(&startsim_dir).context("Failed to create startsim directory")?;
        let mut starter = config.clone();
        starter.niche = niche;
        let yaml_str = serde_yaml::to_string(&starter).context("Failed to serialize config")?;
        fs::write(&config_file, yaml_str).context("Failed to write startsim.yaml")?;
        println!("  {} Created {}", "✓".green(), config_file.display());
    }

    println!();
    println!("{} Simulation initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Export {} (or put it in {})",
        config.model.api_key_env.cyan(),
        startsim_dir.join(".env").display()
    );
    println!("  2. Run {} to start the team talking", "startsim simulate".cyan());

    Ok(())
}
