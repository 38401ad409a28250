// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cinebot serve` and `cinebot migrate` command implementations.
//!
//! `serve` opens the database, builds the tool registry and provider, wires
//! them into the chat engine and runs the HTTP gateway until Ctrl+C or
//! SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use cinebot_agent::{ChatEngine, EngineSettings};
use cinebot_config::CinebotConfig;
use cinebot_core::{CinebotError, HealthStatus, PluginAdapter};
use cinebot_gateway::{AuthConfig, GatewayState, ServerConfig, start_server};
use cinebot_openai::OpenAiProvider;
use cinebot_storage::Database;
use cinebot_tools::builtin::register_builtins;
use cinebot_tools::{DateResolver, HttpRecommender, ToolRegistry};

/// Crates whose events the configured log level applies to.
const LOG_TARGETS: &[&str] = &[
    "cinebot",
    "cinebot_agent",
    "cinebot_config",
    "cinebot_gateway",
    "cinebot_openai",
    "cinebot_storage",
    "cinebot_tools",
    "tower_http",
];

fn default_filter(log_level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS.iter().map(|t| format!("{t}={log_level}")).collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` wins over `agent.log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Runs the `cinebot migrate` command.
pub async fn run_migrate(config: &CinebotConfig) -> Result<(), CinebotError> {
    let db = Database::open(&config.storage.database_path, config.storage.busy_timeout_ms).await?;
    db.close().await?;
    println!("database ready at {}", config.storage.database_path);
    Ok(())
}

/// Runs the `cinebot serve` command.
pub async fn run_serve(config: CinebotConfig) -> Result<(), CinebotError> {
    info!(agent = %config.agent.name, "starting cinebot serve");

    let db = Database::open(&config.storage.database_path, config.storage.busy_timeout_ms).await?;

    let dates = DateResolver::with_offset_hours(config.session.timezone_offset_hours).ok_or_else(|| {
        CinebotError::Config(format!(
            "session.timezone_offset_hours {} is not a valid offset",
            config.session.timezone_offset_hours
        ))
    })?;

    let recommender = Arc::new(HttpRecommender::new(
        &config.recommendation.base_url,
        Duration::from_secs(config.recommendation.timeout_secs),
    )?);
    // An unreachable recommender only disables one tool.
    match recommender.health_check().await {
        Ok(HealthStatus::Healthy) => info!("recommendation service reachable"),
        Ok(status) => warn!(?status, "recommendation service not healthy, continuing"),
        Err(e) => warn!(error = %e, "recommendation health check failed, continuing"),
    }

    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &db, dates, recommender);
    info!(tools = registry.tool_specs().len(), "tool registry initialized");

    let provider = Arc::new(OpenAiProvider::new(&config).map_err(|e| {
        error!(error = %e, "failed to initialize provider");
        eprintln!("error: provider API key required. Set provider.api_key or CINEBOT_PROVIDER_API_KEY.");
        e
    })?);

    let settings = EngineSettings::from_config(&config).await;
    let engine = Arc::new(ChatEngine::new(
        db.clone(),
        provider.clone(),
        Arc::new(registry),
        dates,
        settings,
    ));

    if config.gateway.jwt_secret.is_none() {
        warn!("gateway.jwt_secret is not set, every caller is anonymous");
    }
    let state = GatewayState::new(
        engine,
        db.clone(),
        AuthConfig {
            jwt_secret: config.gateway.jwt_secret.clone(),
        },
    );
    let server = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    start_server(&server, state, shutdown_signal()).await?;

    if let Err(e) = provider.shutdown().await {
        warn!(error = %e, "provider shutdown failed");
    }
    db.close().await?;
    info!("cinebot serve shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
        _ = terminate => info!("received SIGTERM, initiating shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_workspace_crates() {
        let filter = default_filter("debug");
        assert!(filter.starts_with("cinebot=debug,cinebot_agent=debug"));
        assert!(filter.contains("tower_http=debug"));
        assert!(filter.ends_with(",warn"));
    }

    #[tokio::test]
    async fn migrate_creates_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cinebot.db");
        let toml = format!("[storage]\ndatabase_path = {:?}\n", path.to_string_lossy());
        let config = cinebot_config::load_and_validate_str(&toml).unwrap();
        run_migrate(&config).await.unwrap();
        assert!(path.exists());
    }
}
