use clap::CommandFactory;
use clap_complete::{Shell, generate};
use eyre::Result;
use std::io::{self, Write};

use crate::cli::Cli;

pub fn run(shell: Shell) -> Result<()> {
    io::stdout().write_all(&render(shell))?;
    Ok(())
}

/// Completion script for `shell`, named after the binary
fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, name, &mut script);
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_cover_subcommands() {
        let script = String::from_utf8(render(Shell::Bash)).unwrap();
        assert!(script.contains("startsim"));
        for sub in ["simulate", "init", "state", "agent"] {
            assert!(script.contains(sub), "missing {}", sub);
        }
    }
}
