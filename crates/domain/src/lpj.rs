//! # 活動報告書（LPJ）
//!
//! 活動終了後に提出する会計・実施報告書。活動への紐付けは任意。
//!
//! ## ステータス遷移
//!
//! ```text
//! (作成) ─▶ PENDING ──Approve──▶ APPROVED
//!              ├──Reject──────────▶ REJECTED ───────────┐
//!              └──RequestRevision─▶ REVISION_REQUESTED ─┤
//!              ▲                                          │
//!              └──────────────Resubmit────────────────────┘
//! ```
//!
//! 再提出のたびに `revision_no` が 1 増え、審査者とノートはクリアされる。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{
    DomainError,
    activity::ActivityId,
    organization::OrganizationId,
    user::UserId,
    workflow::{TransitionContext, TransitionRule, TransitionTable, WorkflowEntity},
};

define_uuid_id! {
    /// LPJ ID
    pub struct LpjId;
}

/// LPJ ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LpjStatus {
    Pending,
    Approved,
    Rejected,
    RevisionRequested,
}

impl_status_from_str!(LpjStatus, "LPJ ステータス", {
    "PENDING" => Pending,
    "APPROVED" => Approved,
    "REJECTED" => Rejected,
    "REVISION_REQUESTED" => RevisionRequested,
});

/// LPJ に対するステータス変更操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum LpjOperation {
    Approve,
    Reject,
    RequestRevision,
    Resubmit,
}

static LPJ_TRANSITIONS: TransitionTable<LpjOperation, LpjStatus> = TransitionTable::new(&[
    TransitionRule {
        operation: LpjOperation::Approve,
        from:      &[LpjStatus::Pending],
        to:        LpjStatus::Approved,
        rejection: "lpj not pending",
    },
    TransitionRule {
        operation: LpjOperation::Reject,
        from:      &[LpjStatus::Pending],
        to:        LpjStatus::Rejected,
        rejection: "lpj not pending",
    },
    TransitionRule {
        operation: LpjOperation::RequestRevision,
        from:      &[LpjStatus::Pending],
        to:        LpjStatus::RevisionRequested,
        rejection: "lpj not pending",
    },
    TransitionRule {
        operation: LpjOperation::Resubmit,
        from:      &[LpjStatus::Rejected, LpjStatus::RevisionRequested],
        to:        LpjStatus::Pending,
        rejection: "lpj already submitted",
    },
]);

/// 提出内容（初回提出と再提出で共通）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpjContent {
    pub summary:     String,
    /// 予算計画（ルピア、整数）
    pub budget_plan: i64,
    /// 実支出（ルピア、整数）
    pub budget_real: i64,
    /// 報告書ファイルの参照キー
    pub report_key:  String,
    pub file_size:   i64,
    pub photos:      Vec<String>,
}

impl LpjContent {
    fn validated(self) -> Result<Self, DomainError> {
        if self.report_key.trim().is_empty() {
            return Err(DomainError::Validation("report_key required".to_string()));
        }
        if self.budget_plan < 0 || self.budget_real < 0 {
            return Err(DomainError::Validation(
                "budget must not be negative".to_string(),
            ));
        }
        Ok(self)
    }
}

/// LPJ エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lpj {
    id:           LpjId,
    activity_id:  Option<ActivityId>,
    org_id:       OrganizationId,
    content:      LpjContent,
    status:       LpjStatus,
    note:         Option<String>,
    submitted_by: UserId,
    revision_no:  i32,
    reviewed_by:  Option<UserId>,
    reviewed_at:  Option<DateTime<Utc>>,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

/// LPJ の新規提出パラメータ
pub struct NewLpj {
    pub id:           LpjId,
    pub activity_id:  Option<ActivityId>,
    pub org_id:       OrganizationId,
    pub content:      LpjContent,
    pub submitted_by: UserId,
    pub now:          DateTime<Utc>,
}

/// LPJ の DB 復元パラメータ
pub struct LpjRecord {
    pub id:           LpjId,
    pub activity_id:  Option<ActivityId>,
    pub org_id:       OrganizationId,
    pub content:      LpjContent,
    pub status:       LpjStatus,
    pub note:         Option<String>,
    pub submitted_by: UserId,
    pub revision_no:  i32,
    pub reviewed_by:  Option<UserId>,
    pub reviewed_at:  Option<DateTime<Utc>>,
    pub created_at:   DateTime<Utc>,
    pub updated_at:   DateTime<Utc>,
}

impl Lpj {
    /// 新しい LPJ を PENDING（改訂番号 0）で作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: `report_key` が空、または予算が負数
    pub fn new(params: NewLpj) -> Result<Self, DomainError> {
        Ok(Self {
            id: params.id,
            activity_id: params.activity_id,
            org_id: params.org_id,
            content: params.content.validated()?,
            status: LpjStatus::Pending,
            note: None,
            submitted_by: params.submitted_by,
            revision_no: 0,
            reviewed_by: None,
            reviewed_at: None,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// 既存のデータから復元する
    pub fn from_db(record: LpjRecord) -> Self {
        Self {
            id: record.id,
            activity_id: record.activity_id,
            org_id: record.org_id,
            content: record.content,
            status: record.status,
            note: record.note,
            submitted_by: record.submitted_by,
            revision_no: record.revision_no,
            reviewed_by: record.reviewed_by,
            reviewed_at: record.reviewed_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// 差し戻し・却下された LPJ を新しい内容で再提出する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 内容が不正
    /// - `DomainError::InvalidTransition`: REJECTED / REVISION_REQUESTED 以外（"lpj already submitted"）
    pub fn resubmitted(
        self,
        content: LpjContent,
        ctx: &TransitionContext,
    ) -> Result<Self, DomainError> {
        let content = content.validated()?;
        let resubmitted = self.transitioned(LpjOperation::Resubmit, ctx)?;
        Ok(Self {
            content,
            ..resubmitted
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &LpjId {
        &self.id
    }

    pub fn activity_id(&self) -> Option<&ActivityId> {
        self.activity_id.as_ref()
    }

    pub fn org_id(&self) -> &OrganizationId {
        &self.org_id
    }

    pub fn content(&self) -> &LpjContent {
        &self.content
    }

    pub fn status(&self) -> LpjStatus {
        self.status
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn submitted_by(&self) -> &UserId {
        &self.submitted_by
    }

    pub fn revision_no(&self) -> i32 {
        self.revision_no
    }

    pub fn reviewed_by(&self) -> Option<&UserId> {
        self.reviewed_by.as_ref()
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl WorkflowEntity for Lpj {
    type Operation = LpjOperation;
    type Status = LpjStatus;

    const ENTITY_TYPE: &'static str = "lpj";

    fn transition_table() -> &'static TransitionTable<LpjOperation, LpjStatus> {
        &LPJ_TRANSITIONS
    }

    fn status(&self) -> LpjStatus {
        self.status
    }

    fn organization_id(&self) -> &OrganizationId {
        &self.org_id
    }

    fn entity_uuid(&self) -> Uuid {
        *self.id.as_uuid()
    }

    fn apply_transition(self, operation: LpjOperation, to: LpjStatus, ctx: &TransitionContext) -> Self {
        match operation {
            LpjOperation::Resubmit => Self {
                status: to,
                note: None,
                submitted_by: ctx.actor.clone(),
                revision_no: self.revision_no + 1,
                reviewed_by: None,
                reviewed_at: None,
                updated_at: ctx.now,
                ..self
            },
            LpjOperation::Approve | LpjOperation::Reject | LpjOperation::RequestRevision => Self {
                status: to,
                note: ctx.note.clone(),
                reviewed_by: Some(ctx.actor.clone()),
                reviewed_at: Some(ctx.now),
                updated_at: ctx.now,
                ..self
            },
        }
    }
}
