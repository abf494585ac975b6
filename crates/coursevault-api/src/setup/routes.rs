//! Route configuration and setup.

use crate::handlers;
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use coursevault_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>> {
    let cors = setup_cors(config)?;

    // Raw-body uploads need headroom above the declared max size
    let body_limit = config.max_upload_size_bytes + 1024 * 1024;

    let router = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/v1/files/upload/session",
            post(handlers::uploads::create_upload_session),
        )
        .route(
            "/api/v1/files/upload/{upload_token}",
            post(handlers::uploads::upload_file),
        )
        .route(
            "/api/v1/files/{file_id}/access",
            get(handlers::files::get_file_access),
        )
        .route(
            "/api/v1/files/{file_id}/logs",
            get(handlers::files::list_file_access_logs),
        )
        .route("/api/v1/files/mine", get(handlers::files::list_my_files))
        .route(
            "/api/v1/files/{file_id}",
            delete(handlers::files::delete_file),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    if config.cors_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any))
}

#[derive(serde::Serialize)]
struct HealthCheckResponse {
    status: String,
    database: String,
}

/// Readiness probe: process up + database reachable
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match tokio::time::timeout(
        Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.pool),
    )
    .await
    {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => format!("error: {}", e),
        Err(_) => "timeout".to_string(),
    };

    let healthy = database == "healthy";
    let status = if healthy { "ok" } else { "degraded" };

    (
        if healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        },
        Json(HealthCheckResponse {
            status: status.to_string(),
            database,
        }),
    )
}
