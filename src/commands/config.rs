use colored::*;
use eyre::{Result, bail};

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "startsim Configuration".bold());
            println!();
            println!("  niche: {}", config.niche);
            println!("  log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "paths".cyan());
            println!("  state: {}", config.paths.state.display());
            println!("  events: {}", config.paths.events.display());
            println!();

            println!("{}:", "model".cyan());
            println!("  endpoint: {}", config.model.endpoint);
            println!("  model: {}", config.model.model);
            println!("  api_key_env: {}", config.model.api_key_env);
            println!("  timeout_secs: {}", config.model.timeout_secs);
            println!();

            println!("{}:", "simulation".cyan());
            println!("  prompt: {}", config.simulation.prompt);
            println!("  max_rounds: {}", config.simulation.max_rounds);
            println!();

            println!("{}:", "observability".cyan());
            println!("  enabled: {}", config.observability.enabled);
            let sinks: Vec<String> = config.observability.sinks.iter().map(|s| format!("{:?}", s).to_lowercase()).collect();
            println!("  sinks: {}", sinks.join(", "));
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    match key {
        "niche" => Some(config.niche.clone()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        "paths.state" => Some(config.paths.state.display().to_string()),
        "paths.events" => Some(config.paths.events.display().to_string()),
        "model.endpoint" => Some(config.model.endpoint.clone()),
        "model.model" => Some(config.model.model.clone()),
        "model.api_key_env" => Some(config.model.api_key_env.clone()),
        "model.timeout_secs" => Some(config.model.timeout_secs.to_string()),
        "simulation.prompt" => Some(config.simulation.prompt.clone()),
        "simulation.max_rounds" => Some(config.simulation.max_rounds.to_string()),
        "observability.enabled" => Some(config.observability.enabled.to_string()),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => bail!("Unknown config key: {}", key),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_keys() {
        let config = Config::default();
        assert_eq!(lookup("simulation.max_rounds", &config).as_deref(), Some("3"));
        assert_eq!(lookup("model.model", &config).as_deref(), Some("gpt-4o-mini"));
        assert_eq!(lookup("log-level", &config).as_deref(), Some("info"));
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(lookup("hooks.security_enabled", &Config::default()).is_none());
    }
}
