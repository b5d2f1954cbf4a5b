use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "startsim",
    about = "Startup team simulator - CEO, CTO, Designer and Marketer agents taking turns",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/startsim/logs/startsim.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to startsim.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one simulation
    Simulate {
        /// Kickoff prompt for the CEO (defaults to simulation.prompt)
        #[arg(long, short = 'p')]
        prompt: Option<String>,

        /// Number of full rounds (defaults to simulation.max_rounds)
        #[arg(long, short = 'r')]
        max_rounds: Option<u32>,

        /// Stop between turns once this many seconds have passed
        #[arg(long, value_name = "SECS")]
        time_limit: Option<u64>,

        /// Read a JSON run request from a file ("-" for stdin)
        #[arg(long, conflicts_with_all = ["prompt", "max_rounds"])]
        request: Option<PathBuf>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Write a fresh simulation snapshot
    Init {
        /// Market niche (defaults to the configured niche)
        #[arg(long)]
        niche: Option<String>,

        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },

    /// Inspect the persisted simulation state
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Inspect the agent team
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum StateAction {
    /// Show the snapshot
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the snapshot path
    Path,
}

#[derive(Subcommand)]
pub enum AgentAction {
    /// List the team in speaking order
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the prompt a role would receive
    Prompt {
        /// Role (CEO, CTO, Designer, Marketer)
        role: String,

        /// Incoming message text
        #[arg(long, short = 'm')]
        message: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },
}
