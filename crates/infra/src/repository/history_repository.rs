//! # HistoryRepository
//!
//! 活動・LPJ の操作履歴を追記するリポジトリ。更新・削除の操作は持たない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simawa_domain::{
    history::{HistoryAction, HistoryEntry, HistoryEntryId, HistorySubject},
    organization::OrganizationId,
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 履歴リポジトリトレイト
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// 履歴を追記する
    async fn insert(&self, tx: &mut TxContext, entry: &HistoryEntry) -> Result<(), InfraError>;

    /// 対象エンティティの履歴を古い順に取得する
    async fn find_by_subject(
        &self,
        subject: &HistorySubject,
    ) -> Result<Vec<HistoryEntry>, InfraError>;
}

/// PostgreSQL 実装の HistoryRepository
#[derive(Debug, Clone)]
pub struct PostgresHistoryRepository {
    pool: PgPool,
}

impl PostgresHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id:           Uuid,
    subject_kind: String,
    subject_id:   Uuid,
    org_id:       Uuid,
    actor_id:     Uuid,
    action:       String,
    note:         String,
    created_at:   DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = InfraError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let subject = HistorySubject::from_parts(&row.subject_kind, row.subject_id)
            .ok_or_else(|| {
                InfraError::unexpected(format!("不正な履歴対象種別: {}", row.subject_kind))
            })?;
        let action = row
            .action
            .parse::<HistoryAction>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?;

        Ok(HistoryEntry {
            id: HistoryEntryId::from_uuid(row.id),
            subject,
            org_id: OrganizationId::from_uuid(row.org_id),
            actor: UserId::from_uuid(row.actor_id),
            action,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl HistoryRepository for PostgresHistoryRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(subject = entry.subject.kind()))]
    async fn insert(&self, tx: &mut TxContext, entry: &HistoryEntry) -> Result<(), InfraError> {
        let action: &str = entry.action.into();

        sqlx::query(
            r#"
            INSERT INTO entity_histories (
                id, subject_kind, subject_id, org_id, actor_id, action, note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.subject.kind())
        .bind(entry.subject.entity_uuid())
        .bind(entry.org_id.as_uuid())
        .bind(entry.actor.as_uuid())
        .bind(action)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(subject = subject.kind()))]
    async fn find_by_subject(
        &self,
        subject: &HistorySubject,
    ) -> Result<Vec<HistoryEntry>, InfraError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, subject_kind, subject_id, org_id, actor_id, action, note, created_at
            FROM entity_histories
            WHERE subject_kind = $1 AND subject_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(subject.kind())
        .bind(subject.entity_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }
}
