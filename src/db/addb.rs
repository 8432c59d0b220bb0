// db/addb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::admodel::AdCampaign;

#[async_trait]
pub trait AdvertExt {
    async fn get_ad_campaign(&self, campaign_id: Uuid) -> Result<Option<AdCampaign>, Error>;

    /// active -> cancelled with the refund outcome recorded. Guarded on the
    /// current status so a repeated cancellation returns None.
    async fn cancel_ad_campaign(
        &self,
        campaign_id: Uuid,
        refund_amount_minor: i64,
        refund_percentage: f64,
    ) -> Result<Option<AdCampaign>, Error>;
}

#[async_trait]
impl AdvertExt for DBClient {
    async fn get_ad_campaign(&self, campaign_id: Uuid) -> Result<Option<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            SELECT id, advertiser_id, title, duration, amount_minor, currency,
                   payment_intent_id, starts_at, status, cancelled_at,
                   refund_amount_minor, refund_percentage, created_at
            FROM ad_campaigns
            WHERE id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn cancel_ad_campaign(
        &self,
        campaign_id: Uuid,
        refund_amount_minor: i64,
        refund_percentage: f64,
    ) -> Result<Option<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            UPDATE ad_campaigns
            SET status = 'cancelled',
                cancelled_at = NOW(),
                refund_amount_minor = $2,
                refund_percentage = $3
            WHERE id = $1 AND status = 'active'
            RETURNING id, advertiser_id, title, duration, amount_minor, currency,
                      payment_intent_id, starts_at, status, cancelled_at,
                      refund_amount_minor, refund_percentage, created_at
            "#,
        )
        .bind(campaign_id)
        .bind(refund_amount_minor)
        .bind(refund_percentage)
        .fetch_optional(&self.pool)
        .await
    }
}
