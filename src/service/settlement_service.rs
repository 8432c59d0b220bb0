// service/settlement_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobrequestdb::JobRequestExt, offerdb::OfferExt, paymentdb::PaymentExt},
    models::{
        jobrequestmodel::JobRequestStatus,
        paymentmodel::Payment,
    },
    service::{
        chat_service::ChatService,
        error::ServiceError,
        escrow_service::EscrowService,
        notification_service::NotificationService,
        refund_policy::{self, RefundDecision},
    },
};

/// Sequences the multi-entity effects a single business event produces.
/// The ordering contract is fixed: authoritative Payment/Offer/JobRequest
/// mutations first, secondary effects (notifications, realtime push,
/// payout) after. A failed secondary effect is logged and swallowed; it
/// never rolls back the primary mutation.
#[derive(Clone)]
pub struct SettlementService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
    chat_service: Arc<ChatService>,
}

#[derive(Debug, Serialize)]
pub struct CancellationResult {
    pub payment: Payment,
    pub refund_percentage: f64,
    pub refund_amount_minor: i64,
}

impl SettlementService {
    pub fn new(
        db_client: Arc<DBClient>,
        escrow_service: Arc<EscrowService>,
        notification_service: Arc<NotificationService>,
        chat_service: Arc<ChatService>,
    ) -> Self {
        Self {
            db_client,
            escrow_service,
            notification_service,
            chat_service,
        }
    }

    /// "Escrow funded": the gateway confirmed the checkout session was
    /// paid. Applies the payment transition, then cascades Offer and
    /// JobRequest into in_progress and notifies the provider. A duplicate
    /// event short-circuits at the payment row and touches nothing else.
    pub async fn escrow_funded(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, ServiceError> {
        let Some(payment) = self
            .escrow_service
            .mark_escrowed(session_id, payment_intent_id)
            .await?
        else {
            return Ok(None);
        };

        if self
            .db_client
            .mark_offer_escrowed(payment.offer_id, payment.id)
            .await?
            .is_none()
        {
            tracing::warn!(
                "Offer {} was not in an escrowable status while funding payment {}",
                payment.offer_id,
                payment.id
            );
        }

        self.db_client
            .update_job_request_status(payment.job_request_id, JobRequestStatus::InProgress, None)
            .await?;

        if let Err(e) = self
            .notification_service
            .notify_escrow_funded(payment.provider_id, &payment)
            .await
        {
            tracing::warn!(
                "Failed to notify escrow funding for payment {}: {}",
                payment.id,
                e
            );
        }

        Ok(Some(payment))
    }

    /// Non-escrow checkout completion: the payment settles directly, the
    /// request closes and its conversation goes quiet.
    pub async fn direct_payment_completed(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, ServiceError> {
        let Some(payment) = self
            .db_client
            .mark_payment_completed_direct(session_id, payment_intent_id)
            .await?
        else {
            tracing::info!(
                "Direct payment completion for session {} was already applied or unknown",
                session_id
            );
            return Ok(None);
        };

        self.db_client
            .update_job_request_status(payment.job_request_id, JobRequestStatus::Completed, None)
            .await?;

        if let Some(conversation_id) = payment.conversation_id {
            if let Err(e) = self.chat_service.deactivate_conversation(conversation_id).await {
                tracing::warn!(
                    "Failed to deactivate conversation {}: {}",
                    conversation_id,
                    e
                );
            }
        }

        Ok(Some(payment))
    }

    /// The seeker releases held funds: payment completes, the offer and the
    /// request close, then the provider payout is attempted best-effort.
    pub async fn release_funds(
        &self,
        payment_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        let payment = self
            .escrow_service
            .release_from_escrow(payment_id, actor_id)
            .await?;

        if self
            .db_client
            .mark_offer_released(payment.offer_id)
            .await?
            .is_none()
        {
            tracing::warn!(
                "Offer {} was not in progress while releasing payment {}",
                payment.offer_id,
                payment.id
            );
        }

        self.db_client
            .update_job_request_status(payment.job_request_id, JobRequestStatus::Completed, None)
            .await?;

        self.escrow_service
            .attempt_provider_payout(&payment, payment.amount_minor)
            .await;

        if let Err(e) = self
            .notification_service
            .notify_funds_released(payment.provider_id, &payment)
            .await
        {
            tracing::warn!(
                "Failed to notify release of payment {}: {}",
                payment.id,
                e
            );
        }

        // Re-read so the caller sees the payout outcome.
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        Ok(payment)
    }

    /// Either party cancels an escrowed engagement. Single-phase: the
    /// refund tier is computed from the agreed schedule, settled against
    /// the gateway, and every dependent entity is updated in one request.
    pub async fn request_cancellation(
        &self,
        payment_id: Uuid,
        actor_id: Uuid,
        reason: String,
    ) -> Result<CancellationResult, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if actor_id != payment.seeker_id && actor_id != payment.provider_id {
            return Err(ServiceError::UnauthorizedPaymentAccess(actor_id, payment_id));
        }

        let offer = self
            .db_client
            .get_offer_by_id(payment.offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(payment.offer_id))?;

        let decision: RefundDecision = refund_policy::service_cancellation_refund(
            offer.scheduled_datetime(),
            Utc::now(),
            payment.amount_minor,
        );

        let payment = self
            .escrow_service
            .process_cancellation(&payment, decision, actor_id, &reason)
            .await?;

        if self
            .db_client
            .record_offer_cancellation(
                offer.id,
                actor_id,
                reason,
                decision.refund_amount_minor,
                decision.percentage,
            )
            .await?
            .is_none()
        {
            tracing::warn!(
                "Offer {} was already closed while cancelling payment {}",
                offer.id,
                payment.id
            );
        }

        self.db_client
            .update_job_request_status(payment.job_request_id, JobRequestStatus::Cancelled, None)
            .await?;

        for recipient in [payment.seeker_id, payment.provider_id] {
            if let Err(e) = self
                .notification_service
                .notify_cancellation_processed(recipient, &payment, decision.refund_amount_minor)
                .await
            {
                tracing::warn!(
                    "Failed to notify cancellation of payment {}: {}",
                    payment.id,
                    e
                );
            }
        }

        Ok(CancellationResult {
            refund_percentage: decision.percentage,
            refund_amount_minor: decision.refund_amount_minor,
            payment,
        })
    }

    /// Gateway reported the provider payout as settled.
    pub async fn payout_paid(&self, payment_id: Uuid) -> Result<Option<Payment>, ServiceError> {
        let Some(payment) = self.db_client.mark_payout_processed(payment_id).await? else {
            tracing::info!(
                "Duplicate or out-of-order payout.paid for payment {}",
                payment_id
            );
            return Ok(None);
        };

        if let Err(e) = self
            .notification_service
            .notify_payout_settled(payment.provider_id, &payment)
            .await
        {
            tracing::warn!(
                "Failed to notify payout settlement for payment {}: {}",
                payment.id,
                e
            );
        }

        Ok(Some(payment))
    }

    /// Gateway reported the provider payout as failed. The completed
    /// release stays authoritative; remediation is out of band.
    pub async fn payout_failed(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<Option<Payment>, ServiceError> {
        let Some(payment) = self
            .db_client
            .mark_payout_failed(payment_id, reason)
            .await?
        else {
            tracing::info!(
                "Duplicate or out-of-order payout.failed for payment {}",
                payment_id
            );
            return Ok(None);
        };

        if let Err(e) = self
            .notification_service
            .notify_payout_failed(payment.provider_id, &payment, reason)
            .await
        {
            tracing::warn!(
                "Failed to notify payout failure for payment {}: {}",
                payment.id,
                e
            );
        }

        Ok(Some(payment))
    }
}
