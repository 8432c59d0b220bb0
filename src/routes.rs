// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::post, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{adverts::advert_handler, offers::offer_handler, payments::{gateway_webhook, payment_handler}},
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Protected routes (require auth)
    let protected_routes = Router::new()
        .merge(offer_handler())
        .merge(payment_handler())
        .merge(advert_handler())
        .layer(middleware::from_fn(auth));

    // Public routes (no auth, but signature-verified)
    let public_routes = Router::new()
        .route("/webhooks/gateway", post(gateway_webhook))
        .route("/healthcheck", axum::routing::get(health_check));

    let api_route = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new().nest("/api", api_route)
}
