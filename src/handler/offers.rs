// handler/offers.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::offerdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn offer_handler() -> Router {
    Router::new()
        // Bidding
        .route("/requests/:job_request_id/offers", post(create_offer))
        .route("/requests/:job_request_id/offers", get(list_offers))
        // Negotiation
        .route("/offers/:offer_id", get(get_offer))
        .route("/offers/:offer_id/negotiation", put(update_negotiation))
        .route("/offers/:offer_id/negotiation/confirm", post(confirm_negotiation))
        .route("/offers/:offer_id/negotiation/reset", post(reset_negotiation))
        // Resolution
        .route("/offers/:offer_id/accept", put(accept_offer))
        .route("/offers/:offer_id/reject", put(reject_offer))
        .route("/offers/:offer_id/withdraw", put(withdraw_offer))
}

pub async fn create_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(job_request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .negotiation_service
        .create_offer(job_request_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Offer created successfully", offer)))
}

pub async fn list_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(_auth): Extension<JWTAuthMiddleware>,
    Path(job_request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    use crate::db::offerdb::OfferExt;

    let offers = app_state
        .db_client
        .get_offers_for_job_request(job_request_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Offers retrieved successfully", offers)))
}

pub async fn get_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(_auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state.negotiation_service.get_offer(offer_id).await?;

    Ok(Json(ApiResponse::success("Offer retrieved successfully", offer)))
}

pub async fn update_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<UpdateNegotiationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let offer = app_state
        .negotiation_service
        .update_negotiation_terms(offer_id, auth.user_id, body.into())
        .await?;

    Ok(Json(ApiResponse::success(
        "Negotiation terms updated successfully",
        offer,
    )))
}

pub async fn confirm_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .negotiation_service
        .confirm_negotiation(offer_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Negotiation confirmed successfully",
        offer,
    )))
}

pub async fn reset_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .negotiation_service
        .reset_negotiation_confirmation(offer_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Negotiation confirmations reset",
        offer,
    )))
}

pub async fn accept_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let result = app_state
        .negotiation_service
        .accept_offer(offer_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Offer accepted successfully", result)))
}

pub async fn reject_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .negotiation_service
        .reject_offer(offer_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Offer rejected", offer)))
}

pub async fn withdraw_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .negotiation_service
        .withdraw_offer(offer_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Offer withdrawn", offer)))
}
