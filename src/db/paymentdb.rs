// db/paymentdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

#[async_trait]
pub trait PaymentExt {
    #[allow(clippy::too_many_arguments)]
    async fn create_payment(
        &self,
        conversation_id: Option<Uuid>,
        job_request_id: Uuid,
        offer_id: Uuid,
        seeker_id: Uuid,
        provider_id: Uuid,
        session_id: String,
        amount_minor: i64,
        currency: String,
    ) -> Result<Payment, Error>;

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_session_id(&self, session_id: &str) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, Error>;

    /// The single active (pending|escrowed) payment for an offer, if any.
    async fn get_active_payment_for_offer(&self, offer_id: Uuid)
        -> Result<Option<Payment>, Error>;

    /// pending -> escrowed/held, keyed by checkout session. Guarded on the
    /// current status so a redelivered webhook is a no-op (returns None).
    async fn mark_payment_escrowed(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, Error>;

    /// Non-escrow checkout completion: pending -> completed.
    async fn mark_payment_completed_direct(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, Error>;

    /// pending -> failed, keyed by payment intent.
    async fn mark_payment_failed(&self, intent_id: &str) -> Result<Option<Payment>, Error>;

    /// escrowed/held -> completed/released with the payout moved to
    /// processing. Guarded; None when the escrow was not held.
    async fn release_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    /// Store the gateway payout reference; written exactly once.
    async fn set_payout_reference(
        &self,
        payment_id: Uuid,
        payout_id: &str,
    ) -> Result<Option<Payment>, Error>;

    async fn mark_payout_processed(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn mark_payout_failed(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<Option<Payment>, Error>;

    /// Move the payout to processing for the given amount (the provider's
    /// share after a partial refund).
    async fn begin_payout(
        &self,
        payment_id: Uuid,
        amount_minor: i64,
    ) -> Result<Option<Payment>, Error>;

    /// Record a processed refund. Guarded on refund_id IS NULL: the stored
    /// refund id is the idempotency key against double settlement.
    #[allow(clippy::too_many_arguments)]
    async fn record_refund(
        &self,
        payment_id: Uuid,
        refund_id: Option<&str>,
        status: PaymentStatus,
        escrow_status: EscrowStatus,
        refund_amount_minor: i64,
        refund_percentage: f64,
        requested_by: Uuid,
        reason: &str,
    ) -> Result<Option<Payment>, Error>;

    /// Pending payments older than the given number of minutes, for the
    /// polling reconciliation sweep.
    async fn get_stale_pending_payments(
        &self,
        older_than_minutes: i64,
        limit: i64,
    ) -> Result<Vec<Payment>, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment(
        &self,
        conversation_id: Option<Uuid>,
        job_request_id: Uuid,
        offer_id: Uuid,
        seeker_id: Uuid,
        provider_id: Uuid,
        session_id: String,
        amount_minor: i64,
        currency: String,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
            (conversation_id, job_request_id, offer_id, seeker_id, provider_id,
             session_id, amount_minor, currency, original_amount_minor, original_currency,
             status, escrow_status, payout_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $7, $8, 'pending', 'pending', 'pending')
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(job_request_id)
        .bind(offer_id)
        .bind(seeker_id)
        .bind(provider_id)
        .bind(session_id)
        .bind(amount_minor)
        .bind(currency)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_payment_by_session_id(&self, session_id: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_payment_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_intent_id = $1")
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_active_payment_for_offer(
        &self,
        offer_id: Uuid,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE offer_id = $1 AND status IN ('pending', 'escrowed')
            LIMIT 1
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_payment_escrowed(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'escrowed',
                escrow_status = 'held',
                held_at = NOW(),
                payment_intent_id = COALESCE(payment_intent_id, NULLIF($2, '')),
                updated_at = NOW()
            WHERE session_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_payment_completed_direct(
        &self,
        session_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'completed',
                completed_at = NOW(),
                payment_intent_id = COALESCE(payment_intent_id, NULLIF($2, '')),
                updated_at = NOW()
            WHERE session_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_payment_failed(&self, intent_id: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'failed', updated_at = NOW()
            WHERE payment_intent_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn release_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'completed',
                escrow_status = 'released',
                released_at = NOW(),
                release_reason = 'service_completed',
                completed_at = NOW(),
                payout_status = 'processing',
                payout_amount_minor = amount_minor,
                updated_at = NOW()
            WHERE id = $1 AND status = 'escrowed' AND escrow_status = 'held'
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_payout_reference(
        &self,
        payment_id: Uuid,
        payout_id: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET payout_id = $2, updated_at = NOW()
            WHERE id = $1 AND payout_id IS NULL
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(payout_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_payout_processed(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET payout_status = 'processed',
                payout_processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND payout_status IN ('pending', 'processing')
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_payout_failed(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET payout_status = 'failed',
                payout_failed_at = NOW(),
                payout_failure_reason = $2,
                updated_at = NOW()
            WHERE id = $1 AND payout_status IN ('pending', 'processing')
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn begin_payout(
        &self,
        payment_id: Uuid,
        amount_minor: i64,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET payout_status = 'processing',
                payout_amount_minor = $2,
                updated_at = NOW()
            WHERE id = $1 AND payout_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(amount_minor)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_refund(
        &self,
        payment_id: Uuid,
        refund_id: Option<&str>,
        status: PaymentStatus,
        escrow_status: EscrowStatus,
        refund_amount_minor: i64,
        refund_percentage: f64,
        requested_by: Uuid,
        reason: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $3,
                escrow_status = $4,
                refunded_at = NOW(),
                refund_id = $2,
                refund_amount_minor = $5,
                refund_percentage = $6,
                cancellation_status = 'processed',
                cancellation_requested_by = $7,
                cancellation_requested_at = COALESCE(cancellation_requested_at, NOW()),
                cancellation_reason = $8,
                cancellation_processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND refund_id IS NULL
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(refund_id)
        .bind(status)
        .bind(escrow_status)
        .bind(refund_amount_minor)
        .bind(refund_percentage)
        .bind(requested_by)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_stale_pending_payments(
        &self,
        older_than_minutes: i64,
        limit: i64,
    ) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE status = 'pending'
              AND created_at < NOW() - ($1 * INTERVAL '1 minute')
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(older_than_minutes)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
