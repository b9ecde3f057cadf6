//! # AuditLogRepository
//!
//! 監査ログの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **追記のみ**: ワークフローは書き込むだけで、判定のために読み返さない
//! - **遷移と同じトランザクション**: 書き込み失敗は遷移ごとロールバックさせる

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use simawa_domain::{
    audit_log::{AuditAction, AuditLog, AuditLogId},
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 監査ログリポジトリトレイト
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// 監査ログを記録する
    async fn record(&self, tx: &mut TxContext, log: &AuditLog) -> Result<(), InfraError>;

    /// エンティティの監査ログを古い順に取得する（閲覧用）
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &Uuid,
    ) -> Result<Vec<AuditLog>, InfraError>;
}

/// PostgreSQL 実装の AuditLogRepository
#[derive(Debug, Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id:          Uuid,
    actor_id:    Uuid,
    action:      String,
    entity_type: String,
    entity_id:   Uuid,
    metadata:    JsonValue,
    created_at:  DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLog {
    type Error = InfraError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id:          AuditLogId::from_uuid(row.id),
            actor_id:    UserId::from_uuid(row.actor_id),
            action:      row
                .action
                .parse::<AuditAction>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            entity_type: row.entity_type,
            entity_id:   row.entity_id,
            metadata:    row.metadata,
            created_at:  row.created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(action = %log.action))]
    async fn record(&self, tx: &mut TxContext, log: &AuditLog) -> Result<(), InfraError> {
        let action: &str = log.action.into();

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.actor_id.as_uuid())
        .bind(action)
        .bind(&log.entity_type)
        .bind(log.entity_id)
        .bind(&log.metadata)
        .bind(log.created_at)
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%entity_type, %entity_id))]
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &Uuid,
    ) -> Result<Vec<AuditLog>, InfraError> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id, metadata, created_at
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditLog::try_from).collect()
    }
}
