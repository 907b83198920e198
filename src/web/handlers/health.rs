//! Health check HTTP handler

use axum::{extract::State, response::IntoResponse};

use crate::web::{
    AppState,
    responses::{HealthResponse, ok},
};

/// Health check endpoint
///
/// Reports the version and how many service handlers are enabled
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    ok(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: state.registry.enabled_len(),
    })
}
