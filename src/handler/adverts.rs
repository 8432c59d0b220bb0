// handler/adverts.rs
use std::sync::Arc;

use axum::{
    extract::Path, response::IntoResponse, routing::post, Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::offerdtos::ApiResponse, error::HttpError, middleware::JWTAuthMiddleware, AppState,
};

pub fn advert_handler() -> Router {
    Router::new().route("/ads/:campaign_id/cancel", post(cancel_campaign))
}

pub async fn cancel_campaign(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let result = app_state
        .advert_service
        .cancel_campaign(campaign_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Campaign cancelled", result)))
}
