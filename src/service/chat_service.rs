// service/chat_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, db::DBClient},
    models::chatmodel::Conversation,
    service::error::ServiceError,
};

/// Owns the conversation link rows between seekers and providers. Message
/// transport itself is an external collaborator.
#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn get_or_create_conversation(
        &self,
        job_request_id: Uuid,
        seeker_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Conversation, ServiceError> {
        let conversation = self
            .db_client
            .get_or_create_conversation(job_request_id, seeker_id, provider_id)
            .await?;
        Ok(conversation)
    }

    pub async fn deactivate_conversation(&self, conversation_id: Uuid) -> Result<(), ServiceError> {
        self.db_client
            .set_conversation_active(conversation_id, false)
            .await?;
        Ok(())
    }
}
