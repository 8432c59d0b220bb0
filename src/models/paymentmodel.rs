use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::offermodel::CancellationStatus;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Escrowed,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    PartialRefund,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Escrowed => "escrowed",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartialRefund => "partial_refund",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "escrow_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Pending,
    Held,
    Released,
    Refunded,
    PartialRefund,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

/// One escrow transaction, 1:1 with an accepted Offer. The sparse gateway
/// reference columns (session/intent/payout/refund ids) are written exactly
/// once and double as idempotency keys for webhook reprocessing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub job_request_id: Uuid,
    pub offer_id: Uuid,
    pub seeker_id: Uuid,
    pub provider_id: Uuid,

    // Gateway references
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub payout_id: Option<String>,
    pub refund_id: Option<String>,

    // Money, minor units
    pub amount_minor: i64,
    pub currency: String,
    pub original_amount_minor: i64,
    pub original_currency: String,

    pub status: Option<PaymentStatus>, // Database has DEFAULT 'pending', can be NULL

    // Escrow sub-state
    pub escrow_status: Option<EscrowStatus>,
    pub held_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub release_reason: Option<String>,

    // Payout sub-state
    pub payout_status: Option<PayoutStatus>,
    pub payout_amount_minor: Option<i64>,
    pub payout_processed_at: Option<DateTime<Utc>>,
    pub payout_failed_at: Option<DateTime<Utc>>,
    pub payout_failure_reason: Option<String>,

    // Cancellation sub-state
    pub cancellation_status: Option<CancellationStatus>,
    pub cancellation_requested_by: Option<Uuid>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund_amount_minor: Option<i64>,
    pub refund_percentage: Option<f64>,
    pub cancellation_processed_at: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn current_status(&self) -> PaymentStatus {
        self.status.unwrap_or(PaymentStatus::Pending)
    }

    /// Active payments block a second checkout for the same offer.
    pub fn is_active(&self) -> bool {
        matches!(
            self.current_status(),
            PaymentStatus::Pending | PaymentStatus::Escrowed
        )
    }

    pub fn is_held(&self) -> bool {
        self.current_status() == PaymentStatus::Escrowed
            && self.escrow_status == Some(EscrowStatus::Held)
    }

    pub fn is_refunded(&self) -> bool {
        self.refund_id.is_some()
    }
}
