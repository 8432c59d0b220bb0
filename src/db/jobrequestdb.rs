// db/jobrequestdb.rs
use async_trait::async_trait;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobrequestmodel::{JobRequest, JobRequestStatus};

#[async_trait]
pub trait JobRequestExt {
    async fn get_job_request(&self, job_request_id: Uuid) -> Result<Option<JobRequest>, Error>;

    async fn update_job_request_status(
        &self,
        job_request_id: Uuid,
        status: JobRequestStatus,
        assigned_to: Option<Uuid>,
    ) -> Result<JobRequest, Error>;

    /// Assign the request to the accepted offer's provider, inside the same
    /// transaction that accepts the offer.
    async fn assign_job_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<JobRequest, Error>;
}

#[async_trait]
impl JobRequestExt for DBClient {
    async fn get_job_request(&self, job_request_id: Uuid) -> Result<Option<JobRequest>, Error> {
        sqlx::query_as::<_, JobRequest>(
            r#"
            SELECT id, seeker_id, title, description, location_state, location_city,
                   budget_min, budget_max, currency, status, assigned_to,
                   created_at, updated_at
            FROM job_requests
            WHERE id = $1
            "#,
        )
        .bind(job_request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_job_request_status(
        &self,
        job_request_id: Uuid,
        status: JobRequestStatus,
        assigned_to: Option<Uuid>,
    ) -> Result<JobRequest, Error> {
        sqlx::query_as::<_, JobRequest>(
            r#"
            UPDATE job_requests
            SET status = $2,
                assigned_to = COALESCE($3, assigned_to),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, seeker_id, title, description, location_state, location_city,
                      budget_min, budget_max, currency, status, assigned_to,
                      created_at, updated_at
            "#,
        )
        .bind(job_request_id)
        .bind(status)
        .bind(assigned_to)
        .fetch_one(&self.pool)
        .await
    }

    async fn assign_job_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<JobRequest, Error> {
        sqlx::query_as::<_, JobRequest>(
            r#"
            UPDATE job_requests
            SET status = 'assigned',
                assigned_to = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, seeker_id, title, description, location_state, location_city,
                      budget_min, budget_max, currency, status, assigned_to,
                      created_at, updated_at
            "#,
        )
        .bind(job_request_id)
        .bind(provider_id)
        .fetch_one(&mut **tx)
        .await
    }
}
