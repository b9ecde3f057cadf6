//! # RoleRepository
//!
//! ロール割り当ての永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **upsert**: `(user_id, role_code, org_id)` は `NULLS NOT DISTINCT` の一意制約。
//!   同じ組の再割り当ては何もしない
//! - **接頭辞検索**: `LIKE` は `_` をワイルドカードとして扱うため、`starts_with` を使う
//! - **空の接頭辞は拒否**: 全ロールに一致してしまうため `InvalidInput` とする

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simawa_domain::{
    organization::OrganizationId,
    role::{RoleAssignment, RoleCode},
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ロールリポジトリトレイト
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// ロールを割り当てる（既に存在する場合は何もしない）
    async fn assign(
        &self,
        tx: &mut TxContext,
        assignment: &RoleAssignment,
    ) -> Result<(), InfraError>;

    /// ユーザーのロール割り当てをすべて取得する
    async fn find_assignments_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RoleAssignment>, InfraError>;

    /// 指定組織にスコープされた特定ロールを持つか
    async fn has_role_for_org(
        &self,
        user_id: &UserId,
        role_code: &RoleCode,
        org_id: &OrganizationId,
    ) -> Result<bool, InfraError>;

    /// 指定組織にスコープされた、接頭辞に一致するロールを持つか
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::InvalidInput`: 接頭辞が空
    async fn has_any_role_for_org_prefix(
        &self,
        user_id: &UserId,
        org_id: &OrganizationId,
        prefix: &str,
    ) -> Result<bool, InfraError>;

    /// スコープを問わず、接頭辞に一致するロールを持つか
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::InvalidInput`: 接頭辞が空
    async fn has_any_role_prefix(&self, user_id: &UserId, prefix: &str)
    -> Result<bool, InfraError>;
}

pub(crate) fn require_prefix(prefix: &str) -> Result<&str, InfraError> {
    if prefix.is_empty() {
        return Err(InfraError::invalid_input("ロール接頭辞が空です"));
    }
    Ok(prefix)
}

/// PostgreSQL 実装の RoleRepository
#[derive(Debug, Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RoleAssignmentRow {
    user_id:    Uuid,
    role_code:  String,
    org_id:     Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<RoleAssignmentRow> for RoleAssignment {
    fn from(row: RoleAssignmentRow) -> Self {
        RoleAssignment::from_db(
            UserId::from_uuid(row.user_id),
            RoleCode::new(row.role_code),
            row.org_id.map(OrganizationId::from_uuid),
            row.created_at,
        )
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(user_id = %assignment.user_id()))]
    async fn assign(
        &self,
        tx: &mut TxContext,
        assignment: &RoleAssignment,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_code, org_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT user_roles_key DO NOTHING
            "#,
        )
        .bind(assignment.user_id().as_uuid())
        .bind(assignment.role_code().as_str())
        .bind(assignment.org_id().map(|id| *id.as_uuid()))
        .bind(assignment.created_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_assignments_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RoleAssignment>, InfraError> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT user_id, role_code, org_id, created_at
            FROM user_roles
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id, %org_id))]
    async fn has_role_for_org(
        &self,
        user_id: &UserId,
        role_code: &RoleCode,
        org_id: &OrganizationId,
    ) -> Result<bool, InfraError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles
                WHERE user_id = $1 AND role_code = $2 AND org_id = $3
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_code.as_str())
        .bind(org_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id, %org_id))]
    async fn has_any_role_for_org_prefix(
        &self,
        user_id: &UserId,
        org_id: &OrganizationId,
        prefix: &str,
    ) -> Result<bool, InfraError> {
        let prefix = require_prefix(prefix)?;
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles
                WHERE user_id = $1 AND org_id = $2 AND starts_with(role_code, $3)
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(org_id.as_uuid())
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn has_any_role_prefix(
        &self,
        user_id: &UserId,
        prefix: &str,
    ) -> Result<bool, InfraError> {
        let prefix = require_prefix(prefix)?;
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles
                WHERE user_id = $1 AND starts_with(role_code, $2)
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InfraErrorKind;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn RoleRepository>>();
    }

    #[test]
    fn test_空の接頭辞は入力エラーになる() {
        let err = require_prefix("").unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::InvalidInput(_)));
        assert_eq!(require_prefix("ORG_").unwrap(), "ORG_");
    }
}
