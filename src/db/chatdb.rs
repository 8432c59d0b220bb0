// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodel::Conversation;

#[async_trait]
pub trait ChatExt {
    /// One conversation per (job request, provider) pair.
    async fn get_or_create_conversation(
        &self,
        job_request_id: Uuid,
        seeker_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Conversation, Error>;

    async fn set_conversation_active(
        &self,
        conversation_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Conversation>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn get_or_create_conversation(
        &self,
        job_request_id: Uuid,
        seeker_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Conversation, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (job_request_id, seeker_id, provider_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_request_id, provider_id)
            DO UPDATE SET is_active = TRUE
            RETURNING id, job_request_id, seeker_id, provider_id, is_active, created_at
            "#,
        )
        .bind(job_request_id)
        .bind(seeker_id)
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_conversation_active(
        &self,
        conversation_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            UPDATE conversations
            SET is_active = $2
            WHERE id = $1
            RETURNING id, job_request_id, seeker_id, provider_id, is_active, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
    }
}
