//! # SuratRepository
//!
//! 公文書の永続化と、受信箱・アーカイブの一覧取得を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **受信箱は認可述語の射影**: [`SuratScope`] を SQL の条件にそのまま変換する。
//!   `SuratInboxFilter::matches` と同じ 3 条件（発信元・宛先組織・宛先ロール）を使う
//! - **空のフィルタは何も返さない**: 組織もロールも持たない利用者に全件を見せない
//! - **条件付き更新**: 二重決裁を `status = $expected` で防ぐ

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simawa_domain::{
    access::SuratScope,
    organization::OrganizationId,
    surat::{Surat, SuratId, SuratRecord, SuratStatus, SuratVariant},
    user::UserId,
};
use simawa_shared::paginated_response::{Page, Paginated};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 受信箱の問い合わせ条件
#[derive(Debug, Clone)]
pub struct SuratInboxQuery {
    pub scope:  SuratScope,
    /// 指定がなければ全ステータス
    pub status: Option<SuratStatus>,
    pub page:   Page,
}

/// アーカイブの問い合わせ条件
///
/// 参加組織（発信元または宛先）の決裁済み公文書を返す。
#[derive(Debug, Clone)]
pub struct SuratArchiveQuery {
    /// `None` は全組織
    pub org_ids: Option<BTreeSet<OrganizationId>>,
    pub page:    Page,
}

/// 公文書リポジトリトレイト
#[async_trait]
pub trait SuratRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, surat: &Surat) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &SuratId) -> Result<Option<Surat>, InfraError>;

    /// 現在のステータスが `expected` の場合に限り更新する
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: 該当行がない、またはステータスが変わっていた
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        surat: &Surat,
        expected: SuratStatus,
    ) -> Result<(), InfraError>;

    /// 受信箱（新しい順）
    async fn find_inbox(&self, query: &SuratInboxQuery) -> Result<Paginated<Surat>, InfraError>;

    /// アーカイブ（新しい順）
    async fn find_archive(
        &self,
        query: &SuratArchiveQuery,
    ) -> Result<Paginated<Surat>, InfraError>;
}

/// PostgreSQL 実装の SuratRepository
#[derive(Debug, Clone)]
pub struct PostgresSuratRepository {
    pool: PgPool,
}

impl PostgresSuratRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, org_id, target_org_id, target_role, variant, number, subject,
        to_name, to_place, to_city, file_key, status, approval_note,
        created_by, submitted_by, decided_by, decided_at, created_at, updated_at
    FROM surats
"#;

/// 受信箱の条件
///
/// `$1`: 全件フラグ、`$2`: 組織 ID 配列、`$3`: 大文字化したロールコード配列、
/// `$4`: ステータス（NULL なら全件）
const INBOX_CONDITION: &str = r#"
    WHERE (
        $1
        OR org_id = ANY($2)
        OR target_org_id = ANY($2)
        OR (target_role IS NOT NULL AND UPPER(BTRIM(target_role)) = ANY($3))
    )
    AND ($4::text IS NULL OR status = $4)
"#;

/// アーカイブの条件
///
/// `$1`: 全件フラグ、`$2`: 組織 ID 配列、`$3`: 決裁済みステータス配列
const ARCHIVE_CONDITION: &str = r#"
    WHERE ($1 OR org_id = ANY($2) OR target_org_id = ANY($2))
    AND status = ANY($3)
"#;

#[derive(sqlx::FromRow)]
struct SuratRow {
    id:            Uuid,
    org_id:        Uuid,
    target_org_id: Option<Uuid>,
    target_role:   Option<String>,
    variant:       String,
    number:        String,
    subject:       String,
    to_name:       String,
    to_place:      String,
    to_city:       String,
    file_key:      Option<String>,
    status:        String,
    approval_note: Option<String>,
    created_by:    Uuid,
    submitted_by:  Option<Uuid>,
    decided_by:    Option<Uuid>,
    decided_at:    Option<DateTime<Utc>>,
    created_at:    DateTime<Utc>,
    updated_at:    DateTime<Utc>,
}

impl TryFrom<SuratRow> for Surat {
    type Error = InfraError;

    fn try_from(row: SuratRow) -> Result<Self, Self::Error> {
        Ok(Surat::from_db(SuratRecord {
            id:            SuratId::from_uuid(row.id),
            org_id:        OrganizationId::from_uuid(row.org_id),
            target_org_id: row.target_org_id.map(OrganizationId::from_uuid),
            target_role:   row.target_role,
            variant:       row
                .variant
                .parse::<SuratVariant>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            number:        row.number,
            subject:       row.subject,
            to_name:       row.to_name,
            to_place:      row.to_place,
            to_city:       row.to_city,
            file_key:      row.file_key,
            status:        row
                .status
                .parse::<SuratStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            approval_note: row.approval_note,
            created_by:    UserId::from_uuid(row.created_by),
            submitted_by:  row.submitted_by.map(UserId::from_uuid),
            decided_by:    row.decided_by.map(UserId::from_uuid),
            decided_at:    row.decided_at,
            created_at:    row.created_at,
            updated_at:    row.updated_at,
        }))
    }
}

/// スコープを SQL パラメータ（全件フラグ、組織 ID、ロールコード）に分解する
fn scope_params(scope: &SuratScope) -> (bool, Vec<Uuid>, Vec<String>) {
    match scope {
        SuratScope::All => (true, Vec::new(), Vec::new()),
        SuratScope::Filtered(filter) => (
            false,
            filter.org_ids.iter().map(|id| *id.as_uuid()).collect(),
            filter
                .roles
                .iter()
                .map(|code| code.as_str().to_string())
                .collect(),
        ),
    }
}

fn org_params(org_ids: Option<&BTreeSet<OrganizationId>>) -> (bool, Vec<Uuid>) {
    match org_ids {
        None => (true, Vec::new()),
        Some(ids) => (false, ids.iter().map(|id| *id.as_uuid()).collect()),
    }
}

#[async_trait]
impl SuratRepository for PostgresSuratRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(surat_id = %surat.id()))]
    async fn insert(&self, tx: &mut TxContext, surat: &Surat) -> Result<(), InfraError> {
        let variant: &str = surat.variant().into();
        let status: &str = surat.status().into();

        sqlx::query(
            r#"
            INSERT INTO surats (
                id, org_id, target_org_id, target_role, variant, number, subject,
                to_name, to_place, to_city, file_key, status, approval_note,
                created_by, submitted_by, decided_by, decided_at, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            "#,
        )
        .bind(surat.id().as_uuid())
        .bind(surat.org_id().as_uuid())
        .bind(surat.target_org_id().map(|id| *id.as_uuid()))
        .bind(surat.target_role())
        .bind(variant)
        .bind(surat.number())
        .bind(surat.subject())
        .bind(surat.to_name())
        .bind(surat.to_place())
        .bind(surat.to_city())
        .bind(surat.file_key())
        .bind(status)
        .bind(surat.approval_note())
        .bind(surat.created_by().as_uuid())
        .bind(surat.submitted_by().map(|id| *id.as_uuid()))
        .bind(surat.decided_by().map(|id| *id.as_uuid()))
        .bind(surat.decided_at())
        .bind(surat.created_at())
        .bind(surat.updated_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &SuratId) -> Result<Option<Surat>, InfraError> {
        let row = sqlx::query_as::<_, SuratRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Surat::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(surat_id = %surat.id()))]
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        surat: &Surat,
        expected: SuratStatus,
    ) -> Result<(), InfraError> {
        let status: &str = surat.status().into();
        let expected: &str = expected.into();

        let result = sqlx::query(
            r#"
            UPDATE surats SET
                status = $3,
                approval_note = $4,
                submitted_by = $5,
                decided_by = $6,
                decided_at = $7,
                updated_at = $8
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(surat.id().as_uuid())
        .bind(expected)
        .bind(status)
        .bind(surat.approval_note())
        .bind(surat.submitted_by().map(|id| *id.as_uuid()))
        .bind(surat.decided_by().map(|id| *id.as_uuid()))
        .bind(surat.decided_at())
        .bind(surat.updated_at())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Surat", surat.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_inbox(&self, query: &SuratInboxQuery) -> Result<Paginated<Surat>, InfraError> {
        let (all, org_ids, roles) = scope_params(&query.scope);
        let status: Option<&str> = query.status.map(Into::into);

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM surats {INBOX_CONDITION}"))
                .bind(all)
                .bind(&org_ids)
                .bind(&roles)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, SuratRow>(&format!(
            "{SELECT_COLUMNS} {INBOX_CONDITION}
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6"
        ))
        .bind(all)
        .bind(&org_ids)
        .bind(&roles)
        .bind(status)
        .bind(query.page.limit())
        .bind(query.page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Surat::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, total, query.page))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_archive(
        &self,
        query: &SuratArchiveQuery,
    ) -> Result<Paginated<Surat>, InfraError> {
        let (all, org_ids) = org_params(query.org_ids.as_ref());
        let statuses: Vec<&str> = SuratStatus::DECIDED.iter().map(|s| (*s).into()).collect();

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM surats {ARCHIVE_CONDITION}"))
                .bind(all)
                .bind(&org_ids)
                .bind(&statuses)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, SuratRow>(&format!(
            "{SELECT_COLUMNS} {ARCHIVE_CONDITION}
            ORDER BY updated_at DESC, id DESC
            LIMIT $4 OFFSET $5"
        ))
        .bind(all)
        .bind(&org_ids)
        .bind(&statuses)
        .bind(query.page.limit())
        .bind(query.page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Surat::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, total, query.page))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use simawa_domain::{role::RoleCode, surat::SuratInboxFilter};

    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn SuratRepository>>();
    }

    #[test]
    fn test_全件スコープは組織とロールの条件を持たない() {
        let (all, org_ids, roles) = scope_params(&SuratScope::All);

        assert!(all);
        assert!(org_ids.is_empty());
        assert!(roles.is_empty());
    }

    #[test]
    fn test_絞り込みスコープは組織idとロールコードに分解される() {
        let org = OrganizationId::new();
        let scope = SuratScope::Filtered(SuratInboxFilter {
            org_ids: BTreeSet::from([org.clone()]),
            roles:   BTreeSet::from([RoleCode::new("kemahasiswaan")]),
        });

        let (all, org_ids, roles) = scope_params(&scope);

        assert!(!all);
        assert_eq!(org_ids, vec![*org.as_uuid()]);
        assert_eq!(roles, vec!["KEMAHASISWAAN".to_string()]);
    }
}
