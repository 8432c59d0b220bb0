// db/offerdb.rs
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::offermodel::*;

#[async_trait]
pub trait OfferExt {
    async fn create_offer(
        &self,
        job_request_id: Uuid,
        provider_id: Uuid,
        conversation_id: Uuid,
        currency: String,
    ) -> Result<Offer, Error>;

    async fn get_offer_by_id(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    async fn get_offers_for_job_request(&self, job_request_id: Uuid) -> Result<Vec<Offer>, Error>;

    /// A provider may only hold one live (non-terminal, pre-acceptance)
    /// offer per job request.
    async fn get_live_offer_by_provider(
        &self,
        job_request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<Offer>, Error>;

    /// Row-locked read for negotiation read-modify-write sequences. The
    /// lock is what guarantees a confirmation-flag reset is never lost to a
    /// concurrent edit.
    async fn lock_offer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        offer_id: Uuid,
    ) -> Result<Option<Offer>, Error>;

    /// Persist the negotiable surface of an offer (terms, flags, history,
    /// status) inside the transaction that locked it.
    async fn persist_negotiation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        offer: &Offer,
    ) -> Result<Offer, Error>;

    /// Auto-reject every still-open competing offer on the request.
    /// Returns the rejected offers so callers can notify their providers.
    async fn reject_competing_offers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_request_id: Uuid,
        accepted_offer_id: Uuid,
    ) -> Result<Vec<Offer>, Error>;

    /// Status-guarded transition; returns None when the offer was not in
    /// any of the expected statuses (caller decides whether that is a
    /// conflict or an idempotent no-op).
    async fn update_offer_status_guarded(
        &self,
        offer_id: Uuid,
        from: &[OfferStatus],
        to: OfferStatus,
    ) -> Result<Option<Offer>, Error>;

    async fn mark_offer_escrowed(
        &self,
        offer_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Offer>, Error>;

    async fn mark_offer_released(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    async fn record_offer_cancellation(
        &self,
        offer_id: Uuid,
        requested_by: Uuid,
        reason: String,
        refund_amount_minor: i64,
        refund_percentage: f64,
    ) -> Result<Option<Offer>, Error>;
}

#[async_trait]
impl OfferExt for DBClient {
    async fn create_offer(
        &self,
        job_request_id: Uuid,
        provider_id: Uuid,
        conversation_id: Uuid,
        currency: String,
    ) -> Result<Offer, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            INSERT INTO offers
            (job_request_id, provider_id, conversation_id, currency, status, negotiation_history)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *
            "#,
        )
        .bind(job_request_id)
        .bind(provider_id)
        .bind(conversation_id)
        .bind(currency)
        .bind(Json(Vec::<NegotiationHistoryEntry>::new()))
        .fetch_one(&self.pool)
        .await
    }

    async fn get_offer_by_id(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_offers_for_job_request(&self, job_request_id: Uuid) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            "SELECT * FROM offers WHERE job_request_id = $1 ORDER BY created_at ASC",
        )
        .bind(job_request_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_live_offer_by_provider(
        &self,
        job_request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            SELECT * FROM offers
            WHERE job_request_id = $1
              AND provider_id = $2
              AND status IN ('pending', 'negotiating', 'agreement_reached', 'accepted', 'in_progress')
            LIMIT 1
            "#,
        )
        .bind(job_request_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn lock_offer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        offer_id: Uuid,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1 FOR UPDATE")
            .bind(offer_id)
            .fetch_optional(&mut **tx)
            .await
    }

    async fn persist_negotiation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        offer: &Offer,
    ) -> Result<Offer, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET price_minor = $2,
                service_date = $3,
                service_time = $4,
                materials = $5,
                scope = $6,
                seeker_confirmed = $7,
                provider_confirmed = $8,
                negotiation_history = $9,
                last_modified_by = $10,
                last_modified_at = $11,
                status = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(offer.id)
        .bind(offer.price_minor)
        .bind(offer.service_date)
        .bind(offer.service_time.as_deref())
        .bind(offer.materials.as_deref())
        .bind(offer.scope.as_deref())
        .bind(offer.seeker_confirmed)
        .bind(offer.provider_confirmed)
        .bind(&offer.negotiation_history)
        .bind(offer.last_modified_by)
        .bind(offer.last_modified_at)
        .bind(offer.status)
        .fetch_one(&mut **tx)
        .await
    }

    async fn reject_competing_offers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_request_id: Uuid,
        accepted_offer_id: Uuid,
    ) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = 'rejected', updated_at = NOW()
            WHERE job_request_id = $1
              AND id != $2
              AND status IN ('pending', 'negotiating', 'agreement_reached')
            RETURNING *
            "#,
        )
        .bind(job_request_id)
        .bind(accepted_offer_id)
        .fetch_all(&mut **tx)
        .await
    }

    async fn update_offer_status_guarded(
        &self,
        offer_id: Uuid,
        from: &[OfferStatus],
        to: OfferStatus,
    ) -> Result<Option<Offer>, Error> {
        let from: Vec<&str> = from.iter().map(|s| s.to_str()).collect();
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status::TEXT = ANY($2)
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .bind(&from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_offer_escrowed(
        &self,
        offer_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET payment_status = 'escrowed',
                payment_id = $2,
                escrowed_at = NOW(),
                status = 'in_progress',
                updated_at = NOW()
            WHERE id = $1 AND status IN ('accepted', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_offer_released(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET payment_status = 'released',
                released_at = NOW(),
                status = 'completed',
                updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_offer_cancellation(
        &self,
        offer_id: Uuid,
        requested_by: Uuid,
        reason: String,
        refund_amount_minor: i64,
        refund_percentage: f64,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = 'cancelled',
                payment_status = 'refunded',
                cancellation_status = 'processed',
                cancellation_requested_by = $2,
                cancellation_requested_at = NOW(),
                cancellation_reason = $3,
                refund_amount_minor = $4,
                refund_percentage = $5,
                updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('cancelled', 'completed')
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .bind(requested_by)
        .bind(reason)
        .bind(refund_amount_minor)
        .bind(refund_percentage)
        .fetch_optional(&self.pool)
        .await
    }
}
