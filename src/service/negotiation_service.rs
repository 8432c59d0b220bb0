// service/negotiation_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobrequestdb::JobRequestExt, offerdb::OfferExt},
    models::{
        jobrequestmodel::JobRequest,
        offermodel::{NegotiationTermsUpdate, Offer, OfferStatus},
    },
    service::{
        chat_service::ChatService, error::ServiceError, notification_service::NotificationService,
    },
};

/// Which side of the engagement an authenticated user is acting as.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Party {
    Seeker,
    Provider,
}

#[derive(Debug, Clone)]
pub struct NegotiationService {
    db_client: Arc<DBClient>,
    chat_service: Arc<ChatService>,
    notification_service: Arc<NotificationService>,
}

impl NegotiationService {
    pub fn new(
        db_client: Arc<DBClient>,
        chat_service: Arc<ChatService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            chat_service,
            notification_service,
        }
    }

    /// A provider bids on an open request. Creates the pending offer and
    /// its conversation in one step.
    pub async fn create_offer(
        &self,
        job_request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Offer, ServiceError> {
        let job_request = self
            .db_client
            .get_job_request(job_request_id)
            .await?
            .ok_or(ServiceError::JobRequestNotFound(job_request_id))?;

        if !job_request.is_open() {
            return Err(ServiceError::StateConflict(format!(
                "job request {} is no longer open for offers",
                job_request_id
            )));
        }

        if job_request.seeker_id == provider_id {
            return Err(ServiceError::Validation(
                "you cannot bid on your own request".to_string(),
            ));
        }

        if self
            .db_client
            .get_live_offer_by_provider(job_request_id, provider_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::StateConflict(
                "you already have a live offer on this request".to_string(),
            ));
        }

        let conversation = self
            .chat_service
            .get_or_create_conversation(job_request_id, job_request.seeker_id, provider_id)
            .await?;

        let offer = self
            .db_client
            .create_offer(
                job_request_id,
                provider_id,
                conversation.id,
                job_request.currency.clone(),
            )
            .await?;

        tracing::info!(
            "Provider {} opened offer {} on request {}",
            provider_id,
            offer.id,
            job_request_id
        );

        Ok(offer)
    }

    pub async fn get_offer(&self, offer_id: Uuid) -> Result<Offer, ServiceError> {
        self.db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))
    }

    /// Edit the negotiable terms. Any accepted edit while both parties had
    /// confirmed clears both flags, so nobody is ever bound to terms they
    /// did not see.
    pub async fn update_negotiation_terms(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        update: NegotiationTermsUpdate,
    ) -> Result<Offer, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let mut offer = self
            .db_client
            .lock_offer(&mut tx, offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        let job_request = self.job_request_for(&offer).await?;
        let party = authorize_party(&offer, &job_request, user_id)?;

        if !offer.can_edit_terms() {
            return Err(ServiceError::InvalidOfferStatus(
                offer_id,
                offer.current_status(),
            ));
        }

        let changed = offer.apply_term_updates(user_id, &update, Utc::now());
        if changed == 0 {
            return Err(ServiceError::NoChanges);
        }

        // The first accepted edit takes a fresh offer into negotiation.
        // An edit never demotes agreement_reached on its own; the cleared
        // flags make any stale confirmation fail over in confirm below.
        if offer.current_status() == OfferStatus::Pending {
            offer.status = Some(OfferStatus::Negotiating);
        }

        let offer = self.db_client.persist_negotiation(&mut tx, &offer).await?;
        tx.commit().await?;

        let counterparty = match party {
            Party::Seeker => offer.provider_id,
            Party::Provider => job_request.seeker_id,
        };
        if let Err(e) = self
            .notification_service
            .notify_terms_updated(counterparty, &offer)
            .await
        {
            tracing::warn!("Failed to notify terms update on offer {}: {}", offer.id, e);
        }

        Ok(offer)
    }

    /// Confirm the current terms for the calling party. Promotes to
    /// agreement_reached when both flags line up; demotes a stale
    /// agreement when the other party's flag was cleared by an edit.
    pub async fn confirm_negotiation(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
    ) -> Result<Offer, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let mut offer = self
            .db_client
            .lock_offer(&mut tx, offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        let job_request = self.job_request_for(&offer).await?;
        let party = authorize_party(&offer, &job_request, user_id)?;

        let status = offer.current_status();
        if !matches!(
            status,
            OfferStatus::Pending | OfferStatus::Negotiating | OfferStatus::AgreementReached
        ) {
            return Err(ServiceError::InvalidOfferStatus(offer_id, status));
        }

        if let Some(field) = offer.missing_negotiation_field() {
            return Err(ServiceError::MissingNegotiationField(field));
        }

        let is_seeker = party == Party::Seeker;
        let already_confirmed = if is_seeker {
            offer.seeker_confirmed()
        } else {
            offer.provider_confirmed()
        };
        if already_confirmed {
            // Re-confirmation changes nothing: no duplicate history entry,
            // no duplicate promotion or notification.
            return Ok(offer);
        }

        offer.record_confirmation(user_id, is_seeker, Utc::now());

        let promoted = offer.both_confirmed();
        if promoted {
            offer.status = Some(OfferStatus::AgreementReached);
        } else if status == OfferStatus::AgreementReached {
            // The other party's flag was cleared by an edit; this lone
            // confirmation cannot hold the agreement up.
            offer.status = Some(OfferStatus::Negotiating);
        }

        let offer = self.db_client.persist_negotiation(&mut tx, &offer).await?;
        tx.commit().await?;

        if promoted {
            if let Err(e) = self
                .notification_service
                .notify_agreement_reached(job_request.seeker_id, offer.provider_id, &offer)
                .await
            {
                tracing::warn!("Failed to notify agreement on offer {}: {}", offer.id, e);
            }
        }

        Ok(offer)
    }

    /// Explicitly clear both confirmation flags, auditing prior values.
    pub async fn reset_negotiation_confirmation(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
    ) -> Result<Offer, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let mut offer = self
            .db_client
            .lock_offer(&mut tx, offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        let job_request = self.job_request_for(&offer).await?;
        authorize_party(&offer, &job_request, user_id)?;

        let status = offer.current_status();
        if status.is_terminal() {
            return Err(ServiceError::InvalidOfferStatus(offer_id, status));
        }

        offer.clear_confirmations(user_id, Utc::now(), "confirmation reset requested");

        if matches!(
            status,
            OfferStatus::AgreementReached | OfferStatus::Accepted
        ) {
            offer.status = Some(OfferStatus::Negotiating);
        }

        let offer = self.db_client.persist_negotiation(&mut tx, &offer).await?;
        tx.commit().await?;

        Ok(offer)
    }

    /// The seeker locks in the agreed offer: the request is assigned to the
    /// provider and every competing offer is auto-rejected.
    pub async fn accept_offer(
        &self,
        offer_id: Uuid,
        seeker_id: Uuid,
    ) -> Result<AcceptOfferResult, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let mut offer = self
            .db_client
            .lock_offer(&mut tx, offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        let job_request = self.job_request_for(&offer).await?;
        if job_request.seeker_id != seeker_id {
            return Err(ServiceError::UnauthorizedOfferAccess(seeker_id, offer_id));
        }

        if offer.current_status() == OfferStatus::Accepted {
            // Repeated acceptance is a no-op.
            return Ok(AcceptOfferResult {
                offer,
                job_request,
                rejected_offers: Vec::new(),
            });
        }

        // A fully confirmed offer that never saw its promotion (e.g. racing
        // confirmations) is promoted on the way in.
        if offer.current_status() != OfferStatus::AgreementReached && offer.both_confirmed() {
            let status = offer.current_status();
            if !matches!(status, OfferStatus::Pending | OfferStatus::Negotiating) {
                return Err(ServiceError::InvalidOfferStatus(offer_id, status));
            }
            offer.status = Some(OfferStatus::AgreementReached);
        }

        if !offer.both_confirmed() || offer.current_status() != OfferStatus::AgreementReached {
            return Err(ServiceError::StateConflict(
                "both parties must confirm the negotiated terms before acceptance".to_string(),
            ));
        }
        if let Some(field) = offer.missing_negotiation_field() {
            return Err(ServiceError::MissingNegotiationField(field));
        }

        offer.status = Some(OfferStatus::Accepted);
        let offer = self.db_client.persist_negotiation(&mut tx, &offer).await?;

        let job_request = self
            .db_client
            .assign_job_request(&mut tx, job_request.id, offer.provider_id)
            .await?;

        let rejected_offers = self
            .db_client
            .reject_competing_offers(&mut tx, job_request.id, offer.id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Offer {} accepted; {} competing offers auto-rejected",
            offer.id,
            rejected_offers.len()
        );

        if let Err(e) = self
            .notification_service
            .notify_offer_accepted(offer.provider_id, &offer)
            .await
        {
            tracing::warn!("Failed to notify acceptance of offer {}: {}", offer.id, e);
        }
        for rejected in &rejected_offers {
            if let Err(e) = self
                .notification_service
                .notify_offer_rejected(rejected.provider_id, rejected)
                .await
            {
                tracing::warn!("Failed to notify rejection of offer {}: {}", rejected.id, e);
            }
        }

        Ok(AcceptOfferResult {
            offer,
            job_request,
            rejected_offers,
        })
    }

    /// The seeker declines a fresh offer outright.
    pub async fn reject_offer(&self, offer_id: Uuid, seeker_id: Uuid) -> Result<Offer, ServiceError> {
        let offer = self.get_offer(offer_id).await?;
        let job_request = self.job_request_for(&offer).await?;
        if job_request.seeker_id != seeker_id {
            return Err(ServiceError::UnauthorizedOfferAccess(seeker_id, offer_id));
        }

        if offer.current_status() != OfferStatus::Pending {
            return Err(ServiceError::InvalidOfferStatus(
                offer_id,
                offer.current_status(),
            ));
        }

        let offer = self
            .db_client
            .update_offer_status_guarded(offer_id, &[OfferStatus::Pending], OfferStatus::Rejected)
            .await?
            .ok_or_else(|| {
                ServiceError::StateConflict("offer left pending before rejection".to_string())
            })?;

        if let Err(e) = self
            .notification_service
            .notify_offer_rejected(offer.provider_id, &offer)
            .await
        {
            tracing::warn!("Failed to notify rejection of offer {}: {}", offer.id, e);
        }

        Ok(offer)
    }

    /// A provider pulls an offer that has not yet been accepted.
    pub async fn withdraw_offer(
        &self,
        offer_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Offer, ServiceError> {
        let offer = self.get_offer(offer_id).await?;
        if offer.provider_id != provider_id {
            return Err(ServiceError::UnauthorizedOfferAccess(provider_id, offer_id));
        }

        let status = offer.current_status();
        if !matches!(status, OfferStatus::Pending | OfferStatus::Negotiating) {
            return Err(ServiceError::InvalidOfferStatus(offer_id, status));
        }

        let offer = self
            .db_client
            .update_offer_status_guarded(
                offer_id,
                &[OfferStatus::Pending, OfferStatus::Negotiating],
                OfferStatus::Withdrawn,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::StateConflict("offer changed state before withdrawal".to_string())
            })?;

        tracing::info!("Provider {} withdrew offer {}", provider_id, offer.id);

        Ok(offer)
    }

    async fn job_request_for(&self, offer: &Offer) -> Result<JobRequest, ServiceError> {
        self.db_client
            .get_job_request(offer.job_request_id)
            .await?
            .ok_or(ServiceError::JobRequestNotFound(offer.job_request_id))
    }
}

fn authorize_party(
    offer: &Offer,
    job_request: &JobRequest,
    user_id: Uuid,
) -> Result<Party, ServiceError> {
    if user_id == job_request.seeker_id {
        Ok(Party::Seeker)
    } else if user_id == offer.provider_id {
        Ok(Party::Provider)
    } else {
        Err(ServiceError::UnauthorizedOfferAccess(user_id, offer.id))
    }
}

// Result types for service methods
#[derive(Debug, Serialize)]
pub struct AcceptOfferResult {
    pub offer: Offer,
    pub job_request: JobRequest,
    pub rejected_offers: Vec<Offer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{
        notification_service::NotificationService, realtime_service::RealtimeService,
    };

    #[tokio::test]
    async fn service_graph_constructs() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/worklink").unwrap();
        let db_client = Arc::new(DBClient::new(pool));
        let realtime = Arc::new(RealtimeService::new());
        let notifications = Arc::new(NotificationService::new(db_client.clone(), realtime));
        let chat = Arc::new(ChatService::new(db_client.clone()));

        let _svc = NegotiationService::new(db_client, chat, notifications);
    }
}
