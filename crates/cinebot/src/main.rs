// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cinebot - a conversational cinema booking assistant.
//!
//! This is the binary entry point.

mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cinebot_config::CinebotConfig;
use cinebot_tools::DateResolver;

/// Cinebot - a conversational cinema booking assistant.
#[derive(Parser, Debug)]
#[command(name = "cinebot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Start the HTTP gateway (default).
    Serve,
    /// Create or upgrade the database schema, then exit.
    Migrate,
    /// Print the calendar date a phrase such as "ngày mai" or "15-11" refers to.
    ResolveDate {
        /// Date phrase; today when omitted.
        phrase: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<CinebotConfig, ()> {
    let loaded = match path {
        Some(path) => cinebot_config::load_and_validate_path(path),
        None => cinebot_config::load_and_validate(),
    };
    loaded.map_err(|errors| cinebot_config::render_errors(&errors))
}

fn resolve_date(config: &CinebotConfig, phrase: Option<&str>) -> Option<String> {
    let dates = DateResolver::with_offset_hours(config.session.timezone_offset_hours)?;
    Some(dates.resolve_now(phrase).format("%Y-%m-%d").to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Ok(config) = load_config(cli.config.as_ref()) else {
        return ExitCode::FAILURE;
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve::init_tracing(&config.agent.log_level);
            serve::run_serve(config).await
        }
        Commands::Migrate => {
            serve::init_tracing(&config.agent.log_level);
            serve::run_migrate(&config).await
        }
        Commands::ResolveDate { phrase } => match resolve_date(&config, phrase.as_deref()) {
            Some(date) => {
                println!("{date}");
                Ok(())
            }
            None => Err(cinebot_core::CinebotError::Config(format!(
                "session.timezone_offset_hours {} is not a valid offset",
                config.session.timezone_offset_hours
            ))),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["cinebot"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_resolve_date_with_global_config() {
        let cli = Cli::parse_from(["cinebot", "resolve-date", "ngày mai", "--config", "/tmp/c.toml"]);
        assert_eq!(
            cli.command,
            Some(Commands::ResolveDate {
                phrase: Some("ngày mai".into())
            })
        );
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn resolve_date_prints_iso_dates() {
        let config = cinebot_config::load_and_validate_str("").unwrap();
        let date = resolve_date(&config, Some("25-12-2030")).unwrap();
        assert_eq!(date, "2030-12-25");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = cinebot_config::load_and_validate_str("").unwrap();
        assert_eq!(config.agent.name, "CGV-Bot");
        assert_eq!(config.gateway.port, 5001);
    }
}
