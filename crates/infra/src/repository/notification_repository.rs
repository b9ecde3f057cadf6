//! # NotificationRepository
//!
//! アプリ内通知を保存するリポジトリ。
//!
//! 呼び出し側（`NotificationService`）は失敗を握りつぶすため、
//! 遷移のトランザクションとは独立してプールに直接書き込む。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use simawa_domain::{
    notification::{Notification, NotificationId},
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 通知リポジトリトレイト
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 通知を保存する
    async fn insert(&self, notification: &Notification) -> Result<(), InfraError>;

    /// 受信者の通知を新しい順に取得する
    async fn find_by_recipient(
        &self,
        recipient: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, InfraError>;
}

/// PostgreSQL 実装の NotificationRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id:           Uuid,
    recipient_id: Uuid,
    title:        String,
    body:         String,
    data:         JsonValue,
    read_at:      Option<DateTime<Utc>>,
    created_at:   DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id:         NotificationId::from_uuid(row.id),
            recipient:  UserId::from_uuid(row.recipient_id),
            title:      row.title,
            body:       row.body,
            data:       row.data,
            read_at:    row.read_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(recipient = %notification.recipient))]
    async fn insert(&self, notification: &Notification) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, title, body, data, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.recipient.as_uuid())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.data)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%recipient))]
    async fn find_by_recipient(
        &self,
        recipient: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, InfraError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, title, body, data, read_at, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }
}
