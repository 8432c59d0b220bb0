// db/notificationdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::notificationmodel::Notification;

#[async_trait]
pub trait NotificationExt {
    async fn create_notification(
        &self,
        user_id: Uuid,
        notification_type: &str,
        message: &str,
        related_conversation_id: Option<Uuid>,
    ) -> Result<Notification, Error>;

    async fn get_notifications_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn create_notification(
        &self,
        user_id: Uuid,
        notification_type: &str,
        message: &str,
        related_conversation_id: Option<Uuid>,
    ) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, message, related_conversation_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, notification_type, message, related_conversation_id, is_read, created_at
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(message)
        .bind(related_conversation_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_notifications_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, notification_type, message, related_conversation_id, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
