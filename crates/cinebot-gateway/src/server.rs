// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cinebot_agent::ChatEngine;
use cinebot_core::CinebotError;
use cinebot_storage::Database;

use crate::auth::{AuthConfig, identify};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ChatEngine>,
    pub db: Database,
    pub auth: AuthConfig,
    /// Process start, for uptime.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<ChatEngine>, db: Database, auth: AuthConfig) -> Self {
        Self {
            engine,
            db,
            auth,
            started: Instant::now(),
        }
    }
}

/// Gateway server configuration (mirrors `GatewayConfig` from cinebot-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// All gateway routes with their layers.
///
/// `/health` is public. Every `/api` route runs [`identify`] first;
/// handlers that need a signed-in user check the resolved caller.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::post_chat))
        .route("/api/chat/history", get(handlers::get_chat_history))
        .route("/api/bookings", post(handlers::post_booking))
        .route("/api/showtimes/{id}/occupied-seats", get(handlers::get_occupied_seats))
        .route("/api/users/bookings", get(handlers::get_user_bookings))
        .route_layer(axum_middleware::from_fn_with_state(state.auth.clone(), identify))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), CinebotError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CinebotError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CinebotError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5001,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(debug.contains("5001"));
    }
}
