//! # ActivityRepository
//!
//! 活動の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **楽観的ロック**: `UPDATE ... WHERE id = $1 AND version = $expected`。
//!   0 行なら `InfraError::conflict` を返し、二重遷移を防ぐ
//! - **ステータス以外の変更も同じ経路**: ギャラリーやカバー承認もバージョンを
//!   進めるため、古いコピーからの上書きは競合になる
//! - **一覧は開始日時の昇順**: 組織別一覧は総件数付きでページ分割する

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use simawa_domain::{
    activity::{Activity, ActivityId, ActivityRecord, ActivityStatus, CollabType},
    organization::OrganizationId,
    reminder::{LPJ_DUE_WINDOW_HOURS, UPCOMING_WINDOW_HOURS},
    user::UserId,
    version::Version,
};
use simawa_shared::paginated_response::{Page, Paginated};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 組織別一覧の問い合わせ条件
#[derive(Debug, Clone)]
pub struct ActivityListQuery {
    pub org_id:        OrganizationId,
    pub status:        Option<ActivityStatus>,
    pub activity_type: Option<String>,
    /// `true` なら公開の活動だけ
    pub public_only:   bool,
    /// 開始日時の範囲（両端を含む）
    pub start_from:    Option<DateTime<Utc>>,
    pub start_until:   Option<DateTime<Utc>>,
    pub page:          Page,
}

impl ActivityListQuery {
    /// 絞り込みなしの条件
    pub fn for_org(org_id: OrganizationId, page: Page) -> Self {
        Self {
            org_id,
            status: None,
            activity_type: None,
            public_only: false,
            start_from: None,
            start_until: None,
            page,
        }
    }

    /// インメモリ実装用の判定
    pub fn matches(&self, activity: &Activity) -> bool {
        activity.org_id() == &self.org_id
            && self.status.is_none_or(|status| activity.status() == status)
            && self
                .activity_type
                .as_deref()
                .is_none_or(|t| activity.activity_type() == t)
            && (!self.public_only || activity.is_public())
            && self.start_from.is_none_or(|from| activity.start_at() >= from)
            && self.start_until.is_none_or(|until| activity.start_at() <= until)
    }
}

/// 活動リポジトリトレイト
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, activity: &Activity) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &ActivityId) -> Result<Option<Activity>, InfraError>;

    /// 保存済みのバージョンが `expected` の場合に限り更新する
    ///
    /// `activity` は進めた後のバージョンを持っていること。
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: 該当行がない、または別の更新が先行した
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        activity: &Activity,
        expected: Version,
    ) -> Result<(), InfraError>;

    /// 組織の活動を開始日時の昇順で取得する
    async fn find_by_org(
        &self,
        query: &ActivityListQuery,
    ) -> Result<Paginated<Activity>, InfraError>;

    /// `from` 以降に開始する公開・承認済みの活動を開始日時の昇順で取得する
    async fn find_public_from(&self, from: DateTime<Utc>) -> Result<Vec<Activity>, InfraError>;

    /// リマインダー判定の候補を取得する
    ///
    /// 公開かつ APPROVED / COMPLETED で、開始が `now + 72h` 以前、
    /// 終了が `now - 24h` 以降の活動。
    async fn find_public_for_reminder(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, InfraError>;

    /// `now` より前に終了した APPROVED の活動を取得する
    async fn find_approved_ended_before(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, InfraError>;
}

/// PostgreSQL 実装の ActivityRepository
#[derive(Debug, Clone)]
pub struct PostgresActivityRepository {
    pool: PgPool,
}

impl PostgresActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, org_id, title, description, location, activity_type, collab_type,
        collaborator_org_ids, public, status, version, approval_note, start_at, end_at,
        cover_key, cover_approved, proposal_key, gallery_urls, metadata,
        created_by, updated_by, created_at, updated_at
    FROM activities
"#;

/// 組織別一覧の条件
///
/// `$1`: 組織 ID、`$2`: ステータス、`$3`: 種別、`$4`: 公開のみ、
/// `$5` / `$6`: 開始日時の下限 / 上限（NULL は無条件）
const LIST_CONDITION: &str = r#"
    WHERE org_id = $1
    AND ($2::text IS NULL OR status = $2)
    AND ($3::text IS NULL OR activity_type = $3)
    AND (NOT $4 OR public)
    AND ($5::timestamptz IS NULL OR start_at >= $5)
    AND ($6::timestamptz IS NULL OR start_at <= $6)
"#;

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id:                   Uuid,
    org_id:               Uuid,
    title:                String,
    description:          String,
    location:             String,
    activity_type:        String,
    collab_type:          String,
    collaborator_org_ids: Vec<Uuid>,
    public:               bool,
    status:               String,
    version:              i32,
    approval_note:        Option<String>,
    start_at:             DateTime<Utc>,
    end_at:               DateTime<Utc>,
    cover_key:            Option<String>,
    cover_approved:       bool,
    proposal_key:         Option<String>,
    gallery_urls:         Vec<String>,
    metadata:             JsonValue,
    created_by:           Uuid,
    updated_by:           Uuid,
    created_at:           DateTime<Utc>,
    updated_at:           DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = InfraError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(Activity::from_db(ActivityRecord {
            id:                   ActivityId::from_uuid(row.id),
            org_id:               OrganizationId::from_uuid(row.org_id),
            title:                row.title,
            description:          row.description,
            location:             row.location,
            activity_type:        row.activity_type,
            collab_type:          row
                .collab_type
                .parse::<CollabType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            collaborator_org_ids: row
                .collaborator_org_ids
                .into_iter()
                .map(OrganizationId::from_uuid)
                .collect(),
            public:               row.public,
            status:               row
                .status
                .parse::<ActivityStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            version:              Version::try_from(row.version)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            approval_note:        row.approval_note,
            start_at:             row.start_at,
            end_at:               row.end_at,
            cover_key:            row.cover_key,
            cover_approved:       row.cover_approved,
            proposal_key:         row.proposal_key,
            gallery_urls:         row.gallery_urls,
            metadata:             row.metadata,
            created_by:           UserId::from_uuid(row.created_by),
            updated_by:           UserId::from_uuid(row.updated_by),
            created_at:           row.created_at,
            updated_at:           row.updated_at,
        }))
    }
}

fn collaborator_uuids(activity: &Activity) -> Vec<Uuid> {
    activity
        .collaborator_org_ids()
        .iter()
        .map(|id| *id.as_uuid())
        .collect()
}

#[async_trait]
impl ActivityRepository for PostgresActivityRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(activity_id = %activity.id()))]
    async fn insert(&self, tx: &mut TxContext, activity: &Activity) -> Result<(), InfraError> {
        let status: &str = activity.status().into();
        let collab_type: &str = activity.collab_type().into();

        sqlx::query(
            r#"
            INSERT INTO activities (
                id, org_id, title, description, location, activity_type, collab_type,
                collaborator_org_ids, public, status, version, approval_note, start_at, end_at,
                cover_key, cover_approved, proposal_key, gallery_urls, metadata,
                created_by, updated_by, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            "#,
        )
        .bind(activity.id().as_uuid())
        .bind(activity.org_id().as_uuid())
        .bind(activity.title())
        .bind(activity.description())
        .bind(activity.location())
        .bind(activity.activity_type())
        .bind(collab_type)
        .bind(collaborator_uuids(activity))
        .bind(activity.is_public())
        .bind(status)
        .bind(activity.version().as_i32())
        .bind(activity.approval_note())
        .bind(activity.start_at())
        .bind(activity.end_at())
        .bind(activity.cover_key())
        .bind(activity.is_cover_approved())
        .bind(activity.proposal_key())
        .bind(activity.gallery_urls())
        .bind(activity.metadata())
        .bind(activity.created_by().as_uuid())
        .bind(activity.updated_by().as_uuid())
        .bind(activity.created_at())
        .bind(activity.updated_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ActivityId) -> Result<Option<Activity>, InfraError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Activity::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(activity_id = %activity.id()))]
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        activity: &Activity,
        expected: Version,
    ) -> Result<(), InfraError> {
        let status: &str = activity.status().into();

        let result = sqlx::query(
            r#"
            UPDATE activities SET
                status = $3,
                version = $4,
                approval_note = $5,
                cover_approved = $6,
                gallery_urls = $7,
                updated_by = $8,
                updated_at = $9
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(activity.id().as_uuid())
        .bind(expected.as_i32())
        .bind(status)
        .bind(activity.version().as_i32())
        .bind(activity.approval_note())
        .bind(activity.is_cover_approved())
        .bind(activity.gallery_urls())
        .bind(activity.updated_by().as_uuid())
        .bind(activity.updated_at())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Activity", activity.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(org_id = %query.org_id))]
    async fn find_by_org(
        &self,
        query: &ActivityListQuery,
    ) -> Result<Paginated<Activity>, InfraError> {
        let status: Option<&str> = query.status.map(Into::into);

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM activities {LIST_CONDITION}"))
                .bind(query.org_id.as_uuid())
                .bind(status)
                .bind(query.activity_type.as_deref())
                .bind(query.public_only)
                .bind(query.start_from)
                .bind(query.start_until)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_COLUMNS} {LIST_CONDITION}
            ORDER BY start_at ASC, id ASC
            LIMIT $7 OFFSET $8"
        ))
        .bind(query.org_id.as_uuid())
        .bind(status)
        .bind(query.activity_type.as_deref())
        .bind(query.public_only)
        .bind(query.start_from)
        .bind(query.start_until)
        .bind(query.page.limit())
        .bind(query.page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Activity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, total, query.page))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_public_from(&self, from: DateTime<Utc>) -> Result<Vec<Activity>, InfraError> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_COLUMNS}
            WHERE public = true AND status = 'APPROVED' AND start_at >= $1
            ORDER BY start_at ASC"
        ))
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_public_for_reminder(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, InfraError> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_COLUMNS}
            WHERE public = true
              AND status IN ('APPROVED', 'COMPLETED')
              AND start_at <= $1
              AND end_at >= $2
            ORDER BY start_at ASC"
        ))
        .bind(now + Duration::hours(UPCOMING_WINDOW_HOURS))
        .bind(now - Duration::hours(LPJ_DUE_WINDOW_HOURS))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_approved_ended_before(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, InfraError> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_COLUMNS}
            WHERE status = 'APPROVED' AND end_at < $1
            ORDER BY end_at ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }
}
