use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    bulk_shorten_handler, delete_handler, health_handler, list_handler, redirect_handler,
    shorten_handler, stats_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/{short_code}", get(redirect_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(shorten_handler))
                    .route("/bulk-shorten", post(bulk_shorten_handler))
                    .route("/stats/{short_code}", get(stats_handler))
                    .route("/list", get(list_handler))
                    .route("/delete/{short_code}", delete(delete_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
