//! # LpjRepository
//!
//! LPJ の永続化を担当するリポジトリ。
//!
//! 1 つの活動に紐づく LPJ は 1 件で、再提出は同じ行を条件付きで更新する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simawa_domain::{
    activity::ActivityId,
    lpj::{Lpj, LpjContent, LpjId, LpjRecord, LpjStatus},
    organization::OrganizationId,
    user::UserId,
};
use simawa_shared::paginated_response::{Page, Paginated};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// LPJ リポジトリトレイト
#[async_trait]
pub trait LpjRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, lpj: &Lpj) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &LpjId) -> Result<Option<Lpj>, InfraError>;

    /// 活動に紐づく LPJ を取得する
    async fn find_by_activity(&self, activity_id: &ActivityId) -> Result<Option<Lpj>, InfraError>;

    /// 組織の LPJ を新しい順に取得する（`status` が `None` なら全ステータス）
    async fn find_by_org(
        &self,
        org_id: &OrganizationId,
        status: Option<LpjStatus>,
        page: Page,
    ) -> Result<Paginated<Lpj>, InfraError>;

    /// 現在のステータスが `expected` の場合に限り更新する
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: 該当行がない、またはステータスが変わっていた
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        lpj: &Lpj,
        expected: LpjStatus,
    ) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の LpjRepository
#[derive(Debug, Clone)]
pub struct PostgresLpjRepository {
    pool: PgPool,
}

impl PostgresLpjRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, activity_id, org_id, summary, budget_plan, budget_real, report_key,
        file_size, photos, status, note, submitted_by, revision_no,
        reviewed_by, reviewed_at, created_at, updated_at
    FROM lpjs
"#;

#[derive(sqlx::FromRow)]
struct LpjRow {
    id:           Uuid,
    activity_id:  Option<Uuid>,
    org_id:       Uuid,
    summary:      String,
    budget_plan:  i64,
    budget_real:  i64,
    report_key:   String,
    file_size:    i64,
    photos:       Vec<String>,
    status:       String,
    note:         Option<String>,
    submitted_by: Uuid,
    revision_no:  i32,
    reviewed_by:  Option<Uuid>,
    reviewed_at:  Option<DateTime<Utc>>,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

impl TryFrom<LpjRow> for Lpj {
    type Error = InfraError;

    fn try_from(row: LpjRow) -> Result<Self, Self::Error> {
        Ok(Lpj::from_db(LpjRecord {
            id:           LpjId::from_uuid(row.id),
            activity_id:  row.activity_id.map(ActivityId::from_uuid),
            org_id:       OrganizationId::from_uuid(row.org_id),
            content:      LpjContent {
                summary:     row.summary,
                budget_plan: row.budget_plan,
                budget_real: row.budget_real,
                report_key:  row.report_key,
                file_size:   row.file_size,
                photos:      row.photos,
            },
            status:       row
                .status
                .parse::<LpjStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            note:         row.note,
            submitted_by: UserId::from_uuid(row.submitted_by),
            revision_no:  row.revision_no,
            reviewed_by:  row.reviewed_by.map(UserId::from_uuid),
            reviewed_at:  row.reviewed_at,
            created_at:   row.created_at,
            updated_at:   row.updated_at,
        }))
    }
}

#[async_trait]
impl LpjRepository for PostgresLpjRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(lpj_id = %lpj.id()))]
    async fn insert(&self, tx: &mut TxContext, lpj: &Lpj) -> Result<(), InfraError> {
        let status: &str = lpj.status().into();
        let content = lpj.content();

        sqlx::query(
            r#"
            INSERT INTO lpjs (
                id, activity_id, org_id, summary, budget_plan, budget_real, report_key,
                file_size, photos, status, note, submitted_by, revision_no,
                reviewed_by, reviewed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(lpj.id().as_uuid())
        .bind(lpj.activity_id().map(|id| *id.as_uuid()))
        .bind(lpj.org_id().as_uuid())
        .bind(&content.summary)
        .bind(content.budget_plan)
        .bind(content.budget_real)
        .bind(&content.report_key)
        .bind(content.file_size)
        .bind(&content.photos)
        .bind(status)
        .bind(lpj.note())
        .bind(lpj.submitted_by().as_uuid())
        .bind(lpj.revision_no())
        .bind(lpj.reviewed_by().map(|id| *id.as_uuid()))
        .bind(lpj.reviewed_at())
        .bind(lpj.created_at())
        .bind(lpj.updated_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &LpjId) -> Result<Option<Lpj>, InfraError> {
        let row = sqlx::query_as::<_, LpjRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Lpj::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%activity_id))]
    async fn find_by_activity(&self, activity_id: &ActivityId) -> Result<Option<Lpj>, InfraError> {
        let row =
            sqlx::query_as::<_, LpjRow>(&format!("{SELECT_COLUMNS} WHERE activity_id = $1"))
                .bind(activity_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Lpj::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%org_id))]
    async fn find_by_org(
        &self,
        org_id: &OrganizationId,
        status: Option<LpjStatus>,
        page: Page,
    ) -> Result<Paginated<Lpj>, InfraError> {
        let status: Option<&str> = status.map(Into::into);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lpjs WHERE org_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(org_id.as_uuid())
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LpjRow>(&format!(
            "{SELECT_COLUMNS}
            WHERE org_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4"
        ))
        .bind(org_id.as_uuid())
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Lpj::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, total, page))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(lpj_id = %lpj.id()))]
    async fn update_with_status_check(
        &self,
        tx: &mut TxContext,
        lpj: &Lpj,
        expected: LpjStatus,
    ) -> Result<(), InfraError> {
        let status: &str = lpj.status().into();
        let expected: &str = expected.into();
        let content = lpj.content();

        let result = sqlx::query(
            r#"
            UPDATE lpjs SET
                summary = $3,
                budget_plan = $4,
                budget_real = $5,
                report_key = $6,
                file_size = $7,
                photos = $8,
                status = $9,
                note = $10,
                submitted_by = $11,
                revision_no = $12,
                reviewed_by = $13,
                reviewed_at = $14,
                updated_at = $15
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(lpj.id().as_uuid())
        .bind(expected)
        .bind(&content.summary)
        .bind(content.budget_plan)
        .bind(content.budget_real)
        .bind(&content.report_key)
        .bind(content.file_size)
        .bind(&content.photos)
        .bind(status)
        .bind(lpj.note())
        .bind(lpj.submitted_by().as_uuid())
        .bind(lpj.revision_no())
        .bind(lpj.reviewed_by().map(|id| *id.as_uuid()))
        .bind(lpj.reviewed_at())
        .bind(lpj.updated_at())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Lpj", lpj.id().to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn LpjRepository>>();
    }
}
