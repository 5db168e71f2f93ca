use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::ads::Clock;
use crate::storage::EventStore;

use super::analytics::{ingest_event, query_analytics};
use super::handlers::{health_check, AppState};

pub fn create_api_router(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Router {
    let state = Arc::new(AppState { store, clock });

    let analytics_routes = Router::new()
        .route("/analytics", get(query_analytics).post(ingest_event))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", analytics_routes)
        // Events are posted from pages served on other origins
        .layer(CorsLayer::permissive())
}
