use {anyhow::Result, clap::Subcommand};

use crate::Cli;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report the first problem found.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn handle_config(action: &ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Check => check(cli),
        ConfigAction::Show => {
            let config = crate::load_config(cli)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        },
    }
}

fn check(cli: &Cli) -> Result<()> {
    match &cli.config {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("Checking discovered config (defaults when none is found)\n"),
    }

    match crate::load_config(cli) {
        Ok(_) => {
            eprintln!("  {BOLD}{GREEN}ok{RESET} no issues found");
            Ok(())
        },
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} {e:#}");
            std::process::exit(1);
        },
    }
}
