// service/notification_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, notificationdb::NotificationExt},
    models::{offermodel::Offer, paymentmodel::Payment},
    service::{error::ServiceError, realtime_service::RealtimeService},
    utils::currency::format_amount,
};

/// Persists notification rows and pushes a best-effort realtime event.
/// Callers treat every method as a secondary effect: failures are logged
/// by the caller and never roll back the triggering mutation.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
    realtime: Arc<RealtimeService>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>, realtime: Arc<RealtimeService>) -> Self {
        Self { db_client, realtime }
    }

    pub async fn notify_terms_updated(
        &self,
        recipient_id: Uuid,
        offer: &Offer,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            recipient_id,
            "negotiation_updated",
            "The offer terms were updated. Review and re-confirm.".to_string(),
            offer.conversation_id,
        )
        .await
    }

    pub async fn notify_agreement_reached(
        &self,
        seeker_id: Uuid,
        provider_id: Uuid,
        offer: &Offer,
    ) -> Result<(), ServiceError> {
        tracing::info!("Agreement reached on offer {}", offer.id);

        self.store_notification(
            seeker_id,
            "agreement_reached",
            "Both parties confirmed the terms. You can now accept the offer.".to_string(),
            offer.conversation_id,
        )
        .await?;

        self.store_notification(
            provider_id,
            "agreement_reached",
            "Both parties confirmed the terms. Waiting for the seeker to accept.".to_string(),
            offer.conversation_id,
        )
        .await
    }

    pub async fn notify_offer_accepted(
        &self,
        provider_id: Uuid,
        offer: &Offer,
    ) -> Result<(), ServiceError> {
        tracing::info!("Offer {} accepted", offer.id);

        self.store_notification(
            provider_id,
            "offer_accepted",
            "Your offer was accepted. The seeker will fund the escrow next.".to_string(),
            offer.conversation_id,
        )
        .await
    }

    pub async fn notify_offer_rejected(
        &self,
        provider_id: Uuid,
        offer: &Offer,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            provider_id,
            "offer_rejected",
            "Your offer was not selected for this request.".to_string(),
            offer.conversation_id,
        )
        .await
    }

    pub async fn notify_escrow_funded(
        &self,
        provider_id: Uuid,
        payment: &Payment,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Escrow funded for payment {} ({})",
            payment.id,
            format_amount(payment.amount_minor, &payment.currency)
        );

        self.store_notification(
            provider_id,
            "escrow_funded",
            format!(
                "Payment of {} is held in escrow. You can start the work.",
                format_amount(payment.amount_minor, &payment.currency)
            ),
            payment.conversation_id,
        )
        .await
    }

    pub async fn notify_funds_released(
        &self,
        provider_id: Uuid,
        payment: &Payment,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            provider_id,
            "funds_released",
            format!(
                "The seeker released {} from escrow. Your payout is on the way.",
                format_amount(payment.amount_minor, &payment.currency)
            ),
            payment.conversation_id,
        )
        .await
    }

    pub async fn notify_cancellation_processed(
        &self,
        recipient_id: Uuid,
        payment: &Payment,
        refund_amount_minor: i64,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            recipient_id,
            "cancellation_processed",
            format!(
                "The engagement was cancelled. Refund issued: {}.",
                format_amount(refund_amount_minor, &payment.currency)
            ),
            payment.conversation_id,
        )
        .await
    }

    pub async fn notify_payout_settled(
        &self,
        provider_id: Uuid,
        payment: &Payment,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            provider_id,
            "payout_settled",
            format!(
                "Your payout of {} was processed.",
                format_amount(
                    payment.payout_amount_minor.unwrap_or(payment.amount_minor),
                    &payment.currency
                )
            ),
            payment.conversation_id,
        )
        .await
    }

    pub async fn notify_payout_failed(
        &self,
        provider_id: Uuid,
        payment: &Payment,
        reason: &str,
    ) -> Result<(), ServiceError> {
        tracing::warn!("Payout failed for payment {}: {}", payment.id, reason);

        self.store_notification(
            provider_id,
            "payout_failed",
            "Your payout could not be processed. Support has been notified.".to_string(),
            payment.conversation_id,
        )
        .await
    }

    pub async fn notify_campaign_cancelled(
        &self,
        advertiser_id: Uuid,
        refund_amount_minor: i64,
        currency: &str,
    ) -> Result<(), ServiceError> {
        let message = if refund_amount_minor > 0 {
            format!(
                "Your campaign was cancelled. Refund issued: {}.",
                format_amount(refund_amount_minor, currency)
            )
        } else {
            "Your campaign was cancelled. It was outside the refund window.".to_string()
        };
        self.store_notification(advertiser_id, "campaign_cancelled", message, None)
            .await
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        notification_type: &str,
        message: String,
        related_conversation_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let notification = self
            .db_client
            .create_notification(
                user_id,
                notification_type,
                &message,
                related_conversation_id,
            )
            .await?;

        self.realtime.emit_to_user(
            user_id,
            "notification",
            &serde_json::json!({
                "id": notification.id,
                "type": notification.notification_type,
                "message": notification.message,
            }),
        );

        Ok(())
    }
}
