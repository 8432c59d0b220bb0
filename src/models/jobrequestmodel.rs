use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobRequestStatus {
    Open,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobRequestStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobRequestStatus::Open => "open",
            JobRequestStatus::Assigned => "assigned",
            JobRequestStatus::InProgress => "in_progress",
            JobRequestStatus::Completed => "completed",
            JobRequestStatus::Cancelled => "cancelled",
        }
    }
}

/// A seeker's published request for a service. Offers bid against it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRequest {
    pub id: Uuid,
    pub seeker_id: Uuid,
    pub title: String,
    pub description: String,
    pub location_state: String,
    pub location_city: String,
    pub budget_min: BigDecimal,
    pub budget_max: BigDecimal,
    pub currency: String,
    pub status: Option<JobRequestStatus>, // Database has DEFAULT 'open', can be NULL
    pub assigned_to: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobRequest {
    pub fn is_open(&self) -> bool {
        matches!(self.status, Some(JobRequestStatus::Open) | None)
    }
}
