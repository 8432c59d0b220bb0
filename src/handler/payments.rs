// handler/payments.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::paymentdb::PaymentExt,
    dtos::{offerdtos::ApiResponse, paymentdtos::*},
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
    utils::currency::to_minor_units,
    AppState,
};

pub fn payment_handler() -> Router {
    Router::new()
        .route("/payments/escrow", post(create_escrow_payment))
        .route("/payments/:payment_id", get(get_payment))
        .route("/payments/:payment_id/release", post(release_funds))
        .route("/payments/:payment_id/cancel", post(request_cancellation))
        .route("/payments/:payment_id/status", get(check_payment_status))
}

pub async fn create_escrow_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateEscrowPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let init = app_state
        .escrow_service
        .initiate_escrow_payment(
            body.offer_id,
            auth.user_id,
            to_minor_units(body.amount),
            &auth.email,
        )
        .await?;

    Ok(Json(ApiResponse::success(
        "Escrow checkout session created",
        init,
    )))
}

pub async fn get_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .db_client
        .get_payment_by_id(payment_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Payment not found"))?;

    if auth.user_id != payment.seeker_id && auth.user_id != payment.provider_id {
        return Err(HttpError::unauthorized(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    Ok(Json(ApiResponse::success(
        "Payment retrieved successfully",
        payment,
    )))
}

pub async fn release_funds(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .settlement_service
        .release_funds(payment_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Funds released from escrow",
        payment,
    )))
}

pub async fn request_cancellation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
    Json(body): Json<CancelPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .settlement_service
        .request_cancellation(payment_id, auth.user_id, body.reason)
        .await?;

    Ok(Json(ApiResponse::success(
        "Cancellation processed",
        result,
    )))
}

/// Polling fallback: re-query the gateway for a payment stuck in pending
/// and apply the same completion handlers a webhook delivery would.
pub async fn check_payment_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .db_client
        .get_payment_by_id(payment_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Payment not found"))?;

    if auth.user_id != payment.seeker_id && auth.user_id != payment.provider_id {
        return Err(HttpError::unauthorized(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let payment = app_state
        .webhook_service
        .check_payment_status(payment_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Payment status checked",
        payment,
    )))
}

// Gateway Webhook Handler
pub async fn gateway_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, HttpError> {
    // Verify webhook signature
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new(
                "Missing or invalid gateway signature".to_string(),
                StatusCode::BAD_REQUEST,
            )
        })?;

    let webhook_secret = &app_state.env.gateway_webhook_secret;

    if !verify_gateway_signature(&body, signature, webhook_secret) {
        tracing::warn!("Invalid gateway webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event_type = body["type"].as_str().ok_or_else(|| {
        HttpError::new(
            "Missing event type in webhook payload".to_string(),
            StatusCode::BAD_REQUEST,
        )
    })?;

    let data = &body["data"]["object"];

    app_state
        .webhook_service
        .process_event(event_type, data)
        .await?;

    Ok(Json(serde_json::json!({"status": "success"})))
}

fn verify_gateway_signature(payload: &Value, signature: &str, secret: &str) -> bool {
    let payload_string = payload.to_string();

    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload_string.as_bytes());

    let expected_signature = mac.finalize().into_bytes();
    let expected_signature_hex = hex::encode(expected_signature);

    // Compare signatures in constant time to prevent timing attacks
    ConstantTimeEq::ct_eq(signature.as_bytes(), expected_signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sign(payload: &Value, secret: &str) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = json!({"type": "checkout.session.completed", "data": {"object": {}}});
        let signature = sign(&payload, "whsec_test");
        assert!(verify_gateway_signature(&payload, &signature, "whsec_test"));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let payload = json!({"type": "checkout.session.completed"});
        let signature = sign(&payload, "whsec_test");

        let tampered = json!({"type": "payout.paid"});
        assert!(!verify_gateway_signature(&tampered, &signature, "whsec_test"));
        assert!(!verify_gateway_signature(&payload, &signature, "other_secret"));
        assert!(!verify_gateway_signature(&payload, "deadbeef", "whsec_test"));
    }
}
