//! # 活動（Activity）
//!
//! 組織が実施するイベントの企画書（プロポーザル）を表す。
//!
//! ## ステータス遷移
//!
//! ```text
//! DRAFT ──Submit──▶ PENDING ──Approve──▶ APPROVED ──Complete──▶ COMPLETED
//!                      │
//!                      └──Reject───▶ REJECTED
//! ```
//!
//! COMPLETED への遷移は終了日時を過ぎた活動を定期処理が進めるもので、
//! 承認権限による判定は行わない。
//!
//! ギャラリー写真とカバー画像の承認フラグはステータスとは独立して変更できる。
//! どの変更も [`Version`] を 1 つ進め、古いコピーからの上書きを防ぐ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{
    DomainError,
    organization::OrganizationId,
    user::UserId,
    version::Version,
    workflow::{TransitionContext, TransitionRule, TransitionTable, WorkflowEntity},
};

define_uuid_id! {
    /// 活動 ID
    pub struct ActivityId;
}

/// 活動ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    /// 下書き
    Draft,
    /// 承認待ち
    Pending,
    /// 承認済み
    Approved,
    /// 却下
    Rejected,
    /// 実施完了
    Completed,
}

impl_status_from_str!(ActivityStatus, "活動ステータス", {
    "DRAFT" => Draft,
    "PENDING" => Pending,
    "APPROVED" => Approved,
    "REJECTED" => Rejected,
    "COMPLETED" => Completed,
});

/// 活動に対するステータス変更操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum ActivityOperation {
    Submit,
    Approve,
    Reject,
    Complete,
}

/// 共催の形態
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CollabType {
    /// 組織単独
    #[default]
    Internal,
    /// 他組織との共催
    Collab,
    /// 学内全体
    Campus,
}

impl_status_from_str!(CollabType, "共催形態", {
    "INTERNAL" => Internal,
    "COLLAB" => Collab,
    "CAMPUS" => Campus,
});

static ACTIVITY_TRANSITIONS: TransitionTable<ActivityOperation, ActivityStatus> =
    TransitionTable::new(&[
        TransitionRule {
            operation: ActivityOperation::Submit,
            from:      &[ActivityStatus::Draft],
            to:        ActivityStatus::Pending,
            rejection: "only draft can be submitted",
        },
        TransitionRule {
            operation: ActivityOperation::Approve,
            from:      &[ActivityStatus::Pending],
            to:        ActivityStatus::Approved,
            rejection: "not pending",
        },
        TransitionRule {
            operation: ActivityOperation::Reject,
            from:      &[ActivityStatus::Pending],
            to:        ActivityStatus::Rejected,
            rejection: "not pending",
        },
        TransitionRule {
            operation: ActivityOperation::Complete,
            from:      &[ActivityStatus::Approved],
            to:        ActivityStatus::Completed,
            rejection: "only approved activity can be completed",
        },
    ]);

/// 活動エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    id:                   ActivityId,
    org_id:               OrganizationId,
    title:                String,
    description:          String,
    location:             String,
    activity_type:        String,
    collab_type:          CollabType,
    collaborator_org_ids: Vec<OrganizationId>,
    public:               bool,
    status:               ActivityStatus,
    version:              Version,
    approval_note:        Option<String>,
    start_at:             DateTime<Utc>,
    end_at:               DateTime<Utc>,
    cover_key:            Option<String>,
    cover_approved:       bool,
    proposal_key:         Option<String>,
    gallery_urls:         Vec<String>,
    metadata:             JsonValue,
    created_by:           UserId,
    updated_by:           UserId,
    created_at:           DateTime<Utc>,
    updated_at:           DateTime<Utc>,
}

/// 活動の新規作成パラメータ
pub struct NewActivity {
    pub id:                   ActivityId,
    pub org_id:               OrganizationId,
    pub title:                String,
    pub description:          String,
    pub location:             String,
    pub activity_type:        String,
    pub collab_type:          Option<CollabType>,
    pub collaborator_org_ids: Vec<OrganizationId>,
    pub public:               bool,
    pub start_at:             DateTime<Utc>,
    pub end_at:               DateTime<Utc>,
    pub cover_key:            Option<String>,
    pub proposal_key:         Option<String>,
    pub metadata:             JsonValue,
    pub created_by:           UserId,
    pub now:                  DateTime<Utc>,
}

/// 活動の DB 復元パラメータ
pub struct ActivityRecord {
    pub id:                   ActivityId,
    pub org_id:               OrganizationId,
    pub title:                String,
    pub description:          String,
    pub location:             String,
    pub activity_type:        String,
    pub collab_type:          CollabType,
    pub collaborator_org_ids: Vec<OrganizationId>,
    pub public:               bool,
    pub status:               ActivityStatus,
    pub version:              Version,
    pub approval_note:        Option<String>,
    pub start_at:             DateTime<Utc>,
    pub end_at:               DateTime<Utc>,
    pub cover_key:            Option<String>,
    pub cover_approved:       bool,
    pub proposal_key:         Option<String>,
    pub gallery_urls:         Vec<String>,
    pub metadata:             JsonValue,
    pub created_by:           UserId,
    pub updated_by:           UserId,
    pub created_at:           DateTime<Utc>,
    pub updated_at:           DateTime<Utc>,
}

impl Activity {
    /// 新しい活動を下書きとして作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: タイトルが空、または終了日時が開始日時より前
    pub fn new(params: NewActivity) -> Result<Self, DomainError> {
        let title = params.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("title required".to_string()));
        }
        if params.end_at < params.start_at {
            return Err(DomainError::Validation(
                "end_at must not be before start_at".to_string(),
            ));
        }

        Ok(Self {
            id: params.id,
            org_id: params.org_id,
            title,
            description: params.description,
            location: params.location,
            activity_type: params.activity_type,
            collab_type: params.collab_type.unwrap_or_default(),
            collaborator_org_ids: params.collaborator_org_ids,
            public: params.public,
            status: ActivityStatus::Draft,
            version: Version::initial(),
            approval_note: None,
            start_at: params.start_at,
            end_at: params.end_at,
            cover_key: params.cover_key,
            cover_approved: false,
            proposal_key: params.proposal_key,
            gallery_urls: Vec::new(),
            metadata: params.metadata,
            created_by: params.created_by.clone(),
            updated_by: params.created_by,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// 既存のデータから復元する
    pub fn from_db(record: ActivityRecord) -> Self {
        Self {
            id: record.id,
            org_id: record.org_id,
            title: record.title,
            description: record.description,
            location: record.location,
            activity_type: record.activity_type,
            collab_type: record.collab_type,
            collaborator_org_ids: record.collaborator_org_ids,
            public: record.public,
            status: record.status,
            version: record.version,
            approval_note: record.approval_note,
            start_at: record.start_at,
            end_at: record.end_at,
            cover_key: record.cover_key,
            cover_approved: record.cover_approved,
            proposal_key: record.proposal_key,
            gallery_urls: record.gallery_urls,
            metadata: record.metadata,
            created_by: record.created_by,
            updated_by: record.updated_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &ActivityId {
        &self.id
    }

    pub fn org_id(&self) -> &OrganizationId {
        &self.org_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    pub fn collab_type(&self) -> CollabType {
        self.collab_type
    }

    pub fn collaborator_org_ids(&self) -> &[OrganizationId] {
        &self.collaborator_org_ids
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn status(&self) -> ActivityStatus {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn approval_note(&self) -> Option<&str> {
        self.approval_note.as_deref()
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }

    pub fn cover_key(&self) -> Option<&str> {
        self.cover_key.as_deref()
    }

    pub fn is_cover_approved(&self) -> bool {
        self.cover_approved
    }

    pub fn proposal_key(&self) -> Option<&str> {
        self.proposal_key.as_deref()
    }

    pub fn gallery_urls(&self) -> &[String] {
        &self.gallery_urls
    }

    pub fn metadata(&self) -> &JsonValue {
        &self.metadata
    }

    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    pub fn updated_by(&self) -> &UserId {
        &self.updated_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ステータス以外の変更

    /// ギャラリーに写真 URL を追加した新しい活動を返す
    pub fn with_gallery_photo_added(
        self,
        url: impl Into<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(DomainError::Validation("url required".to_string()));
        }
        let mut gallery_urls = self.gallery_urls;
        gallery_urls.push(url);
        Ok(Self {
            gallery_urls,
            version: self.version.next(),
            updated_by: actor,
            updated_at: now,
            ..self
        })
    }

    /// ギャラリーから写真 URL を取り除いた新しい活動を返す
    ///
    /// 指定した URL が存在しない場合は `None`（変更なし）。
    pub fn with_gallery_photo_removed(
        &self,
        url: &str,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !self.gallery_urls.iter().any(|existing| existing == url) {
            return None;
        }
        let gallery_urls = self
            .gallery_urls
            .iter()
            .filter(|existing| existing.as_str() != url)
            .cloned()
            .collect();
        Some(Self {
            gallery_urls,
            version: self.version.next(),
            updated_by: actor,
            updated_at: now,
            ..self.clone()
        })
    }

    /// カバー画像の承認フラグを変更した新しい活動を返す
    pub fn with_cover_approval(self, approved: bool, actor: UserId, now: DateTime<Utc>) -> Self {
        Self {
            cover_approved: approved,
            version: self.version.next(),
            updated_by: actor,
            updated_at: now,
            ..self
        }
    }
}

impl WorkflowEntity for Activity {
    type Operation = ActivityOperation;
    type Status = ActivityStatus;

    const ENTITY_TYPE: &'static str = "activity";

    fn transition_table() -> &'static TransitionTable<ActivityOperation, ActivityStatus> {
        &ACTIVITY_TRANSITIONS
    }

    fn status(&self) -> ActivityStatus {
        self.status
    }

    fn organization_id(&self) -> &OrganizationId {
        &self.org_id
    }

    fn entity_uuid(&self) -> Uuid {
        *self.id.as_uuid()
    }

    fn apply_transition(
        self,
        operation: ActivityOperation,
        to: ActivityStatus,
        ctx: &TransitionContext,
    ) -> Self {
        let approval_note = match operation {
            ActivityOperation::Approve | ActivityOperation::Reject => ctx.note.clone(),
            ActivityOperation::Submit | ActivityOperation::Complete => self.approval_note,
        };
        Self {
            status: to,
            version: self.version.next(),
            approval_note,
            updated_by: ctx.actor.clone(),
            updated_at: ctx.now,
            ..self
        }
    }
}
