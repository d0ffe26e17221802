//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    // The grant's max_size is the only ceiling on uploads.
    let upload_routes = Router::new()
        .route(
            "/upload",
            get(handlers::assets::upload_form)
                .post(handlers::upload::upload_file)
                .delete(handlers::upload::delete_file),
        )
        .layer(DefaultBodyLimit::disable());

    Router::new()
        .route("/", get(handlers::download::download_file))
        .route("/gen", get(handlers::assets::generate_page))
        .route("/gen/form.css", get(handlers::assets::form_css))
        .route("/health", get(handlers::health::health))
        .merge(upload_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
