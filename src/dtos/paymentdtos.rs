use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Escrow payment DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateEscrowPaymentDto {
    pub offer_id: Uuid,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CancelPaymentDto {
    #[validate(length(min = 3, max = 500, message = "Reason must be between 3 and 500 characters"))]
    pub reason: String,
}
