// service/escrow_service.rs
use std::sync::Arc;

use num_traits::ToPrimitive;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::Config,
    db::{db::DBClient, jobrequestdb::JobRequestExt, offerdb::OfferExt, paymentdb::PaymentExt},
    models::{
        jobrequestmodel::JobRequest,
        offermodel::{Offer, OfferStatus},
        paymentmodel::{EscrowStatus, Payment, PaymentStatus},
    },
    service::{
        error::ServiceError, payment_gateway::PaymentGatewayService, refund_policy::RefundDecision,
    },
};

/// Acceptable drift between the checkout amount and the agreed price, in
/// minor units. Covers rounding on the client side, nothing more.
const AMOUNT_TOLERANCE_MINOR: i64 = 1;

/// Snapshot handed to checkout-session creation after validation.
#[derive(Debug)]
pub struct EscrowCheckoutContext {
    pub offer: Offer,
    pub job_request: JobRequest,
}

#[derive(Debug, Serialize)]
pub struct EscrowPaymentInit {
    pub payment: Payment,
    pub checkout_url: String,
}

/// Owns the Payment lifecycle: pending -> escrowed -> completed/refunded/
/// partial_refund/failed, with the escrow and payout sub-states. All
/// webhook-driven transitions are guarded at the SQL layer so repeated
/// deliveries cannot double-apply.
#[derive(Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
    gateway: Arc<PaymentGatewayService>,
    config: Config,
}

impl EscrowService {
    pub fn new(db_client: Arc<DBClient>, gateway: Arc<PaymentGatewayService>, config: Config) -> Self {
        Self {
            db_client,
            gateway,
            config,
        }
    }

    /// Checks every precondition for funding an escrow on an offer:
    /// the caller is the request's seeker, the offer is accepted, there is
    /// no other active payment, and the amount matches the agreed price.
    pub async fn validate_escrow_payment_request(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        amount_minor: i64,
    ) -> Result<EscrowCheckoutContext, ServiceError> {
        let offer = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        let job_request = self
            .db_client
            .get_job_request(offer.job_request_id)
            .await?
            .ok_or(ServiceError::JobRequestNotFound(offer.job_request_id))?;

        if job_request.seeker_id != user_id {
            return Err(ServiceError::UnauthorizedOfferAccess(user_id, offer_id));
        }

        if offer.current_status() != OfferStatus::Accepted {
            return Err(ServiceError::InvalidOfferStatus(
                offer_id,
                offer.current_status(),
            ));
        }

        if self
            .db_client
            .get_active_payment_for_offer(offer_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::ActivePaymentExists(offer_id));
        }

        let price_minor = offer.price_minor.ok_or(ServiceError::Validation(
            "the offer has no agreed price".to_string(),
        ))?;

        if (amount_minor - price_minor).abs() > AMOUNT_TOLERANCE_MINOR {
            return Err(ServiceError::AmountMismatch {
                expected: price_minor,
                provided: amount_minor,
            });
        }

        // The agreed price can legitimately drift from the posted budget
        // ceiling through negotiation; flag it for support visibility.
        if let Some(budget_max) = job_request.budget_max.to_f64() {
            if crate::utils::currency::to_major_units(amount_minor) > budget_max {
                tracing::warn!(
                    "Escrow amount for offer {} exceeds the request's budget ceiling",
                    offer_id
                );
            }
        }

        Ok(EscrowCheckoutContext { offer, job_request })
    }

    /// Validate, open a gateway checkout session, then persist the pending
    /// payment. The gateway call comes first: a failed session must leave
    /// no local row behind.
    pub async fn initiate_escrow_payment(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        amount_minor: i64,
        customer_email: &str,
    ) -> Result<EscrowPaymentInit, ServiceError> {
        let context = self
            .validate_escrow_payment_request(offer_id, user_id, amount_minor)
            .await?;

        let metadata = serde_json::json!({
            "payment_type": "escrow",
            "offer_id": context.offer.id,
            "job_request_id": context.job_request.id,
            "seeker_id": context.job_request.seeker_id,
            "provider_id": context.offer.provider_id,
        });

        let session = self
            .gateway
            .create_checkout_session(
                &context.job_request.title,
                amount_minor,
                &context.offer.currency,
                &self.config.checkout_success_url,
                &self.config.checkout_cancel_url,
                customer_email,
                &metadata,
            )
            .await?;

        let payment = self
            .db_client
            .create_payment(
                context.offer.conversation_id,
                context.job_request.id,
                context.offer.id,
                context.job_request.seeker_id,
                context.offer.provider_id,
                session.session_id,
                amount_minor,
                context.offer.currency.clone(),
            )
            .await?;

        tracing::info!(
            "Created pending escrow payment {} for offer {}",
            payment.id,
            offer_id
        );

        Ok(EscrowPaymentInit {
            payment,
            checkout_url: session.url,
        })
    }

    /// Apply a verified "session paid" event to the payment row. Returns
    /// the payment only when this call performed the transition; a
    /// duplicate delivery (already escrowed or completed) returns None so
    /// the caller skips the cascade.
    pub async fn mark_escrowed(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, ServiceError> {
        if let Some(payment) = self
            .db_client
            .mark_payment_escrowed(session_id, payment_intent_id)
            .await?
        {
            return Ok(Some(payment));
        }

        match self.db_client.get_payment_by_session_id(session_id).await? {
            Some(payment)
                if matches!(
                    payment.current_status(),
                    PaymentStatus::Escrowed | PaymentStatus::Completed
                ) =>
            {
                tracing::info!(
                    "Duplicate escrow funding event for session {}; payment {} already {:?}",
                    session_id,
                    payment.id,
                    payment.current_status()
                );
                Ok(None)
            }
            Some(payment) => Err(ServiceError::InvalidPaymentStatus(
                payment.id,
                payment.current_status(),
            )),
            None => {
                tracing::warn!("Escrow funding event for unknown session {}", session_id);
                Ok(None)
            }
        }
    }

    /// The seeker releases held funds to the provider. Only the payment
    /// row moves here; cross-entity cascades belong to the settlement
    /// coordinator.
    pub async fn release_from_escrow(
        &self,
        payment_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if payment.seeker_id != actor_id {
            return Err(ServiceError::UnauthorizedPaymentAccess(actor_id, payment_id));
        }

        if !payment.is_held() {
            return Err(ServiceError::InvalidPaymentStatus(
                payment_id,
                payment.current_status(),
            ));
        }

        self.db_client
            .release_payment(payment_id)
            .await?
            .ok_or_else(|| {
                // Lost a race with another release or a cancellation.
                ServiceError::StateConflict("escrow is no longer held".to_string())
            })
    }

    /// Best-effort payout of the given amount to the provider. Failure is
    /// recorded on the payout sub-state and logged, never propagated: the
    /// release/refund that triggered it stays authoritative.
    pub async fn attempt_provider_payout(&self, payment: &Payment, amount_minor: i64) {
        let metadata = serde_json::json!({
            "payment_id": payment.id,
            "offer_id": payment.offer_id,
            "provider_id": payment.provider_id,
            "purpose": "provider_payout",
        });

        match self
            .gateway
            .create_payout(amount_minor, &payment.currency, &metadata)
            .await
        {
            Ok(payout) => {
                tracing::info!(
                    "Payout {} created for payment {} ({} minor units)",
                    payout.payout_id,
                    payment.id,
                    amount_minor
                );
                if let Err(e) = self
                    .db_client
                    .set_payout_reference(payment.id, &payout.payout_id)
                    .await
                {
                    tracing::error!(
                        "Failed to store payout reference for payment {}: {}",
                        payment.id,
                        e
                    );
                }
            }
            Err(e) => {
                tracing::error!("Payout failed for payment {}: {}", payment.id, e);
                if let Err(db_err) = self
                    .db_client
                    .mark_payout_failed(payment.id, &e.to_string())
                    .await
                {
                    tracing::error!(
                        "Failed to record payout failure for payment {}: {}",
                        payment.id,
                        db_err
                    );
                }
            }
        }
    }

    /// Settle a cancellation against the held escrow: refund the seeker's
    /// share through the gateway, then record the outcome. The stored
    /// refund id makes a second settlement attempt fail fast.
    pub async fn process_cancellation(
        &self,
        payment: &Payment,
        decision: RefundDecision,
        requested_by: Uuid,
        reason: &str,
    ) -> Result<Payment, ServiceError> {
        if payment.is_refunded() {
            return Err(ServiceError::StateConflict(format!(
                "payment {} was already refunded",
                payment.id
            )));
        }

        if !payment.is_held() {
            return Err(ServiceError::InvalidPaymentStatus(
                payment.id,
                payment.current_status(),
            ));
        }

        let refund_amount = decision.refund_amount_minor.clamp(0, payment.amount_minor);
        let full_refund = refund_amount == payment.amount_minor;

        let refund_id = if refund_amount > 0 {
            let payment_intent_id =
                payment
                    .payment_intent_id
                    .as_deref()
                    .ok_or(ServiceError::StateConflict(
                        "payment has no captured charge to refund".to_string(),
                    ))?;

            let metadata = serde_json::json!({
                "payment_id": payment.id,
                "offer_id": payment.offer_id,
                "requested_by": requested_by,
                "reason": reason,
            });

            let refund = self
                .gateway
                .create_refund(payment_intent_id, refund_amount, &metadata)
                .await?;
            Some(refund.refund_id)
        } else {
            None
        };

        let (status, escrow_status) = if full_refund {
            (PaymentStatus::Refunded, EscrowStatus::Refunded)
        } else {
            (PaymentStatus::PartialRefund, EscrowStatus::PartialRefund)
        };

        let updated = self
            .db_client
            .record_refund(
                payment.id,
                refund_id.as_deref(),
                status,
                escrow_status,
                refund_amount,
                decision.percentage,
                requested_by,
                reason,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::StateConflict(format!(
                    "payment {} was already refunded",
                    payment.id
                ))
            })?;

        // The provider keeps the remainder of a partial refund.
        let provider_amount = payment.amount_minor - refund_amount;
        if !full_refund && provider_amount > 0 {
            if let Err(e) = self.db_client.begin_payout(payment.id, provider_amount).await {
                tracing::error!(
                    "Failed to open remainder payout for payment {}: {}",
                    payment.id,
                    e
                );
            } else {
                self.attempt_provider_payout(&updated, provider_amount).await;
            }
        }

        tracing::info!(
            "Cancellation settled for payment {}: {}% refunded ({} minor units)",
            payment.id,
            decision.percentage,
            refund_amount
        );

        Ok(updated)
    }
}
