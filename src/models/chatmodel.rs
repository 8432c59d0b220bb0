use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation between the seeker and one provider about a job request.
/// Message transport lives outside this engine; we only own the link row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub job_request_id: Uuid,
    pub seeker_id: Uuid,
    pub provider_id: Uuid,
    pub is_active: Option<bool>, // Database has DEFAULT TRUE, can be NULL
    pub created_at: Option<DateTime<Utc>>,
}
