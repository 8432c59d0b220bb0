use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub message: String,
    pub related_conversation_id: Option<Uuid>,
    pub is_read: Option<bool>, // Database has DEFAULT FALSE, can be NULL
    pub created_at: Option<DateTime<Utc>>,
}
