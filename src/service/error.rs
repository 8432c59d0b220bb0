use crate::{
    error::HttpError,
    models::{offermodel::OfferStatus, paymentmodel::PaymentStatus},
};
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Offer {0} not found")]
    OfferNotFound(Uuid),

    #[error("Payment {0} not found")]
    PaymentNotFound(Uuid),

    #[error("Job request {0} not found")]
    JobRequestNotFound(Uuid),

    #[error("Ad campaign {0} not found")]
    CampaignNotFound(Uuid),

    #[error("User {0} is not a party to offer {1}")]
    UnauthorizedOfferAccess(Uuid, Uuid),

    #[error("User {0} is not authorized to act on payment {1}")]
    UnauthorizedPaymentAccess(Uuid, Uuid),

    #[error("User {0} does not own ad campaign {1}")]
    UnauthorizedCampaignAccess(Uuid, Uuid),

    #[error("Offer {0} is not in status {1:?}")]
    InvalidOfferStatus(Uuid, OfferStatus),

    #[error("Payment {0} is not in status {1:?}")]
    InvalidPaymentStatus(Uuid, PaymentStatus),

    #[error("Operation conflicts with current state: {0}")]
    StateConflict(String),

    #[error("Negotiation term '{0}' must be set before confirming")]
    MissingNegotiationField(&'static str),

    #[error("No negotiation fields were changed")]
    NoChanges,

    #[error("Payment amount {provided} does not match the agreed price {expected}")]
    AmountMismatch { expected: i64, provided: i64 },

    #[error("Offer {0} already has an active payment")]
    ActivePaymentExists(Uuid),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::OfferNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::JobRequestNotFound(_)
            | ServiceError::CampaignNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::MissingNegotiationField(_)
            | ServiceError::NoChanges
            | ServiceError::AmountMismatch { .. }
            | ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::InvalidOfferStatus(_, _)
            | ServiceError::InvalidPaymentStatus(_, _)
            | ServiceError::StateConflict(_)
            | ServiceError::ActivePaymentExists(_) => HttpError::conflict(error.to_string()),

            ServiceError::UnauthorizedOfferAccess(_, _)
            | ServiceError::UnauthorizedPaymentAccess(_, _)
            | ServiceError::UnauthorizedCampaignAccess(_, _) => {
                HttpError::unauthorized(error.to_string())
            }

            ServiceError::Gateway(_) => HttpError::payment_required(error.to_string()),

            _ => HttpError::server_error(error.to_string()),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::OfferNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::JobRequestNotFound(_)
            | ServiceError::CampaignNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::MissingNegotiationField(_)
            | ServiceError::NoChanges
            | ServiceError::AmountMismatch { .. }
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::InvalidOfferStatus(_, _)
            | ServiceError::InvalidPaymentStatus(_, _)
            | ServiceError::StateConflict(_)
            | ServiceError::ActivePaymentExists(_) => StatusCode::CONFLICT,

            ServiceError::UnauthorizedOfferAccess(_, _)
            | ServiceError::UnauthorizedPaymentAccess(_, _)
            | ServiceError::UnauthorizedCampaignAccess(_, _) => StatusCode::UNAUTHORIZED,

            ServiceError::Gateway(_) => StatusCode::PAYMENT_REQUIRED,

            ServiceError::Database(_) | ServiceError::Notification(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
