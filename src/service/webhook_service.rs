// service/webhook_service.rs
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, paymentdb::PaymentExt},
    models::paymentmodel::{Payment, PaymentStatus},
    service::{
        error::ServiceError, payment_gateway::PaymentGatewayService,
        settlement_service::SettlementService,
    },
};

/// Gateway event types this engine consumes. Everything else is
/// acknowledged and logged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GatewayEventType {
    CheckoutSessionCompleted,
    PaymentIntentSucceeded,
    PaymentIntentFailed,
    PayoutCreated,
    PayoutPaid,
    PayoutFailed,
    ChargeRefunded,
}

impl GatewayEventType {
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "checkout.session.completed" => Some(Self::CheckoutSessionCompleted),
            "payment_intent.succeeded" => Some(Self::PaymentIntentSucceeded),
            "payment_intent.payment_failed" => Some(Self::PaymentIntentFailed),
            "payout.created" => Some(Self::PayoutCreated),
            "payout.paid" => Some(Self::PayoutPaid),
            "payout.failed" => Some(Self::PayoutFailed),
            "charge.refunded" => Some(Self::ChargeRefunded),
            _ => None,
        }
    }
}

/// Consumes verified gateway events and drives the settlement transitions.
/// Delivery is at-least-once: every handler tolerates replays because the
/// underlying transitions are status-guarded, so a duplicate dies as a
/// no-op instead of double-applying.
#[derive(Clone)]
pub struct WebhookService {
    db_client: Arc<DBClient>,
    gateway: Arc<PaymentGatewayService>,
    settlement_service: Arc<SettlementService>,
}

impl WebhookService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateway: Arc<PaymentGatewayService>,
        settlement_service: Arc<SettlementService>,
    ) -> Self {
        Self {
            db_client,
            gateway,
            settlement_service,
        }
    }

    pub async fn process_event(&self, event_type: &str, data: &Value) -> Result<(), ServiceError> {
        let Some(event) = GatewayEventType::parse(event_type) else {
            tracing::info!("Unhandled gateway event: {}", event_type);
            return Ok(());
        };

        match event {
            GatewayEventType::CheckoutSessionCompleted => {
                self.handle_session_completed(data).await?;
            }
            GatewayEventType::PaymentIntentSucceeded => {
                // The session-completed event is the authoritative trigger;
                // the intent-level success is informational.
                tracing::debug!(
                    "payment_intent.succeeded for {}",
                    data["id"].as_str().unwrap_or("<unknown>")
                );
            }
            GatewayEventType::PaymentIntentFailed => {
                self.handle_payment_failed(data).await?;
            }
            GatewayEventType::PayoutCreated => {
                tracing::debug!(
                    "payout.created for {}",
                    data["id"].as_str().unwrap_or("<unknown>")
                );
            }
            GatewayEventType::PayoutPaid => {
                if let Some(payment_id) = metadata_payment_id(data) {
                    self.settlement_service.payout_paid(payment_id).await?;
                } else {
                    tracing::warn!("payout.paid without a payment_id in metadata");
                }
            }
            GatewayEventType::PayoutFailed => {
                if let Some(payment_id) = metadata_payment_id(data) {
                    let reason = data["failure_message"]
                        .as_str()
                        .unwrap_or("payout failed at the gateway");
                    self.settlement_service
                        .payout_failed(payment_id, reason)
                        .await?;
                } else {
                    tracing::warn!("payout.failed without a payment_id in metadata");
                }
            }
            GatewayEventType::ChargeRefunded => {
                // Refunds are applied synchronously when the cancellation is
                // processed; the charge-level event is an acknowledgement.
                tracing::info!(
                    "charge.refunded acknowledged for {}",
                    data["id"].as_str().unwrap_or("<unknown>")
                );
            }
        }

        Ok(())
    }

    /// Polling fallback for a payment stuck in pending: re-query the
    /// gateway and, if the session was paid, run the exact same completion
    /// handlers a webhook would have run.
    pub async fn check_payment_status(&self, payment_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if payment.current_status() != PaymentStatus::Pending {
            return Ok(payment);
        }

        let session = self
            .gateway
            .retrieve_checkout_session(&payment.session_id)
            .await?;

        if session.payment_status == "paid" {
            let intent_id = session.payment_intent_id.as_deref().unwrap_or_default();
            let payment_type = session
                .metadata
                .as_ref()
                .and_then(|m| m["payment_type"].as_str())
                .unwrap_or("escrow");

            tracing::info!(
                "Reconciling paid session {} for payment {} via polling",
                payment.session_id,
                payment.id
            );

            if payment_type == "escrow" {
                self.settlement_service
                    .escrow_funded(&payment.session_id, intent_id)
                    .await?;
            } else {
                self.settlement_service
                    .direct_payment_completed(&payment.session_id, intent_id)
                    .await?;
            }
        }

        self.db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))
    }

    async fn handle_session_completed(&self, data: &Value) -> Result<(), ServiceError> {
        let session_id = data["id"]
            .as_str()
            .ok_or_else(|| ServiceError::Validation("missing session id in event".to_string()))?;
        let payment_intent_id = data["payment_intent"].as_str().unwrap_or_default();
        let payment_type = data["metadata"]["payment_type"].as_str().unwrap_or("");

        if payment_type == "escrow" {
            self.settlement_service
                .escrow_funded(session_id, payment_intent_id)
                .await?;
        } else {
            self.settlement_service
                .direct_payment_completed(session_id, payment_intent_id)
                .await?;
        }
        Ok(())
    }

    async fn handle_payment_failed(&self, data: &Value) -> Result<(), ServiceError> {
        let Some(intent_id) = data["id"].as_str() else {
            tracing::warn!("payment_intent.payment_failed without an id");
            return Ok(());
        };

        match self.db_client.mark_payment_failed(intent_id).await? {
            Some(payment) => {
                tracing::info!("Payment {} marked failed from gateway event", payment.id);
            }
            None => {
                tracing::debug!(
                    "payment_intent.payment_failed for {} matched no pending payment",
                    intent_id
                );
            }
        }
        Ok(())
    }
}

fn metadata_payment_id(data: &Value) -> Option<Uuid> {
    data["metadata"]["payment_id"]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_event_types_parse() {
        assert_eq!(
            GatewayEventType::parse("checkout.session.completed"),
            Some(GatewayEventType::CheckoutSessionCompleted)
        );
        assert_eq!(
            GatewayEventType::parse("payout.paid"),
            Some(GatewayEventType::PayoutPaid)
        );
        assert_eq!(
            GatewayEventType::parse("charge.refunded"),
            Some(GatewayEventType::ChargeRefunded)
        );
        assert_eq!(GatewayEventType::parse("customer.created"), None);
    }

    #[test]
    fn payment_id_is_read_from_event_metadata() {
        let id = Uuid::new_v4();
        let data = json!({ "id": "po_123", "metadata": { "payment_id": id.to_string() } });
        assert_eq!(metadata_payment_id(&data), Some(id));

        let missing = json!({ "id": "po_123", "metadata": {} });
        assert_eq!(metadata_payment_id(&missing), None);

        let garbage = json!({ "metadata": { "payment_id": "not-a-uuid" } });
        assert_eq!(metadata_payment_id(&garbage), None);
    }
}
