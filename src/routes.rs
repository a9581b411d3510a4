use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub fn configure_routes() -> Router<AppState> {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/jobs/{id}", get(crate::modules::job::handler::get_job))
        .route("/videos/{id}", get(crate::modules::video::handler::get_video))
}
