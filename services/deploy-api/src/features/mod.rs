pub mod handlers;
pub mod repository;
pub mod websocket;

use crate::utilities::app_state::AppState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn get_routes() -> Router<AppState> {
    Router::new()
        // Deployments
        .route("/api/v1/deployments", post(handlers::trigger_deployment))
        .route(
            "/api/v1/deployments/{deployment_id}",
            get(handlers::get_deployment),
        )
        .route(
            "/api/v1/projects/{project_id}/deployments",
            get(handlers::get_deployments),
        )
        .route(
            "/api/v1/deployments/{deployment_id}/logs/ws",
            get(websocket::ws_build_logs),
        )
}
