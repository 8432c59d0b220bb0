use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "ad_duration", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdDuration {
    Daily,
    Weekly,
    Monthly,
}

impl AdDuration {
    pub fn total_days(&self) -> i64 {
        match self {
            AdDuration::Daily => 1,
            AdDuration::Weekly => 7,
            AdDuration::Monthly => 30,
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            AdDuration::Daily => "daily",
            AdDuration::Weekly => "weekly",
            AdDuration::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "ad_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Active,
    Cancelled,
    Expired,
}

/// A paid advertising campaign. Cancellation refunds run through the same
/// tiered policy engine as service cancellations.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdCampaign {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub title: String,
    pub duration: AdDuration,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub status: Option<AdStatus>, // Database has DEFAULT 'active', can be NULL
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refund_amount_minor: Option<i64>,
    pub refund_percentage: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl AdCampaign {
    pub fn is_active(&self) -> bool {
        matches!(self.status, Some(AdStatus::Active) | None)
    }

    /// Whole days elapsed since the campaign started (floor).
    pub fn days_since_start(&self, now: DateTime<Utc>) -> i64 {
        (now - self.starts_at).num_days().max(0)
    }
}
