/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Lobby admission server entry point.
//!
//! A standalone Axum service that holds visitors in a meeting lobby until the
//! meeting owner admits them, then issues JWT room access tokens for the
//! Media Server.

use lobby_api::config::Config;
use lobby_api::routes;
use lobby_api::state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(&config);
    let app = routes::router().layer(cors).with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!(
        request_ttl_secs = config.lobby.request_ttl.as_secs(),
        retention_secs = config.lobby.retention.as_secs(),
        "Lobby service listening on {}",
        config.listen_addr
    );

    axum::serve(listener, app).await.expect("server error");
}
