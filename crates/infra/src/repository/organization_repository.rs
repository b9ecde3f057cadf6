//! # OrganizationRepository
//!
//! 組織の参照を担当するリポジトリ。ワークフローが読むのは種別と ID だけなので、
//! 作成・更新はこのクレートの範囲外とする。

use async_trait::async_trait;
use simawa_domain::organization::{Organization, OrganizationId, OrganizationType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 組織リポジトリトレイト
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// ID で組織を取得する
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, InfraError>;
}

/// PostgreSQL 実装の OrganizationRepository
#[derive(Debug, Clone)]
pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id:       Uuid,
    name:     String,
    slug:     String,
    org_type: String,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = InfraError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let org_type = row
            .org_type
            .parse::<OrganizationType>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?;
        Ok(Organization::new(
            OrganizationId::from_uuid(row.id),
            row.name,
            row.slug,
            org_type,
        ))
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, InfraError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, slug, org_type
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Organization::try_from).transpose()
    }
}
