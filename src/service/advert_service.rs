// service/advert_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{addb::AdvertExt, db::DBClient},
    models::admodel::AdCampaign,
    service::{
        error::ServiceError, notification_service::NotificationService,
        payment_gateway::PaymentGatewayService, refund_policy,
    },
};

#[derive(Debug, Serialize)]
pub struct AdCancellationResult {
    pub campaign: AdCampaign,
    pub refund_percentage: f64,
    pub refund_amount_minor: i64,
    pub tier: String,
}

/// Cancellation of paid ad campaigns: the secondary consumer of the tiered
/// refund engine. Same single-phase settlement shape as service
/// cancellations, against a single entity.
#[derive(Clone)]
pub struct AdvertService {
    db_client: Arc<DBClient>,
    gateway: Arc<PaymentGatewayService>,
    notification_service: Arc<NotificationService>,
}

impl AdvertService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateway: Arc<PaymentGatewayService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            gateway,
            notification_service,
        }
    }

    pub async fn cancel_campaign(
        &self,
        campaign_id: Uuid,
        advertiser_id: Uuid,
    ) -> Result<AdCancellationResult, ServiceError> {
        let campaign = self
            .db_client
            .get_ad_campaign(campaign_id)
            .await?
            .ok_or(ServiceError::CampaignNotFound(campaign_id))?;

        if campaign.advertiser_id != advertiser_id {
            return Err(ServiceError::UnauthorizedCampaignAccess(
                advertiser_id,
                campaign_id,
            ));
        }

        if !campaign.is_active() {
            return Err(ServiceError::StateConflict(format!(
                "campaign {} is not active",
                campaign_id
            )));
        }

        let decision = refund_policy::ad_cancellation_refund(
            campaign.duration,
            campaign.starts_at,
            Utc::now(),
            campaign.amount_minor,
        );

        // Gateway refund first; a refused refund must not cancel locally.
        if decision.refund_amount_minor > 0 {
            let payment_intent_id =
                campaign
                    .payment_intent_id
                    .as_deref()
                    .ok_or(ServiceError::StateConflict(
                        "campaign has no captured charge to refund".to_string(),
                    ))?;

            let metadata = serde_json::json!({
                "campaign_id": campaign.id,
                "advertiser_id": campaign.advertiser_id,
                "reason": "campaign_cancellation",
            });

            self.gateway
                .create_refund(payment_intent_id, decision.refund_amount_minor, &metadata)
                .await?;
        }

        let campaign = self
            .db_client
            .cancel_ad_campaign(
                campaign_id,
                decision.refund_amount_minor,
                decision.percentage,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::StateConflict(format!("campaign {} is not active", campaign_id))
            })?;

        tracing::info!(
            "Campaign {} cancelled: {} tier, {} minor units refunded",
            campaign.id,
            decision.tier.to_str(),
            decision.refund_amount_minor
        );

        if let Err(e) = self
            .notification_service
            .notify_campaign_cancelled(
                campaign.advertiser_id,
                decision.refund_amount_minor,
                &campaign.currency,
            )
            .await
        {
            tracing::warn!(
                "Failed to notify cancellation of campaign {}: {}",
                campaign.id,
                e
            );
        }

        Ok(AdCancellationResult {
            refund_percentage: decision.percentage,
            refund_amount_minor: decision.refund_amount_minor,
            tier: decision.tier.to_str().to_string(),
            campaign,
        })
    }
}
