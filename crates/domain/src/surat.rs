//! # 公文書（Surat）
//!
//! 組織間でやり取りされる公式文書を表す。発信元組織（`org_id`）に加えて、
//! 宛先組織（`target_org_id`）と宛先ロール（`target_role`）を任意で持ち、
//! 受信者の受信箱への振り分けに使う。
//!
//! ## ステータス遷移
//!
//! ```text
//! DRAFT ──Submit──▶ PENDING ──Approve──▶ APPROVED
//!                      ├──Reject───▶ REJECTED
//!                      └──RequestRevision──▶ REVISION
//! ```
//!
//! REVISION は現時点で終端。再提出は新しい文書として扱う。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{
    DomainError,
    organization::OrganizationId,
    role::RoleCode,
    user::UserId,
    workflow::{TransitionContext, TransitionRule, TransitionTable, WorkflowEntity},
};

define_uuid_id! {
    /// 公文書 ID
    pub struct SuratId;
}

/// 公文書ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SuratStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Revision,
}

impl_status_from_str!(SuratStatus, "公文書ステータス", {
    "DRAFT" => Draft,
    "PENDING" => Pending,
    "APPROVED" => Approved,
    "REJECTED" => Rejected,
    "REVISION" => Revision,
});

impl SuratStatus {
    /// 決裁済み（アーカイブ対象）のステータス
    pub const DECIDED: [SuratStatus; 3] = [Self::Approved, Self::Rejected, Self::Revision];

    /// 決裁・差し戻しが済んでいるか
    pub fn is_decided(self) -> bool {
        Self::DECIDED.contains(&self)
    }
}

/// 公文書に対するステータス変更操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum SuratOperation {
    Submit,
    Approve,
    Reject,
    RequestRevision,
}

/// 文書の種類
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SuratVariant {
    /// 貸出申請
    Peminjaman,
    /// 提出
    Pengajuan,
    /// 依頼
    Permohonan,
    /// 招待状
    Undangan,
}

impl_status_from_str!(SuratVariant, "文書種別", {
    "PEMINJAMAN" => Peminjaman,
    "PENGAJUAN" => Pengajuan,
    "PERMOHONAN" => Permohonan,
    "UNDANGAN" => Undangan,
});

static SURAT_TRANSITIONS: TransitionTable<SuratOperation, SuratStatus> = TransitionTable::new(&[
    TransitionRule {
        operation: SuratOperation::Submit,
        from:      &[SuratStatus::Draft],
        to:        SuratStatus::Pending,
        rejection: "only draft can be submitted",
    },
    TransitionRule {
        operation: SuratOperation::Approve,
        from:      &[SuratStatus::Pending],
        to:        SuratStatus::Approved,
        rejection: "only pending can be decided",
    },
    TransitionRule {
        operation: SuratOperation::Reject,
        from:      &[SuratStatus::Pending],
        to:        SuratStatus::Rejected,
        rejection: "only pending can be decided",
    },
    TransitionRule {
        operation: SuratOperation::RequestRevision,
        from:      &[SuratStatus::Pending],
        to:        SuratStatus::Revision,
        rejection: "only pending can be revised",
    },
]);

/// 公文書エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surat {
    id:            SuratId,
    org_id:        OrganizationId,
    target_org_id: Option<OrganizationId>,
    target_role:   Option<String>,
    variant:       SuratVariant,
    number:        String,
    subject:       String,
    to_name:       String,
    to_place:      String,
    to_city:       String,
    file_key:      Option<String>,
    status:        SuratStatus,
    approval_note: Option<String>,
    created_by:    UserId,
    submitted_by:  Option<UserId>,
    decided_by:    Option<UserId>,
    decided_at:    Option<DateTime<Utc>>,
    created_at:    DateTime<Utc>,
    updated_at:    DateTime<Utc>,
}

/// 公文書の新規作成パラメータ
pub struct NewSurat {
    pub id:            SuratId,
    pub org_id:        OrganizationId,
    pub target_org_id: Option<OrganizationId>,
    pub target_role:   Option<String>,
    pub variant:       SuratVariant,
    pub number:        String,
    pub subject:       String,
    pub to_name:       String,
    pub to_place:      String,
    pub to_city:       String,
    pub file_key:      Option<String>,
    /// `true` の場合は DRAFT で作成する（既定は PENDING）
    pub as_draft:      bool,
    pub created_by:    UserId,
    pub now:           DateTime<Utc>,
}

/// 公文書の DB 復元パラメータ
pub struct SuratRecord {
    pub id:            SuratId,
    pub org_id:        OrganizationId,
    pub target_org_id: Option<OrganizationId>,
    pub target_role:   Option<String>,
    pub variant:       SuratVariant,
    pub number:        String,
    pub subject:       String,
    pub to_name:       String,
    pub to_place:      String,
    pub to_city:       String,
    pub file_key:      Option<String>,
    pub status:        SuratStatus,
    pub approval_note: Option<String>,
    pub created_by:    UserId,
    pub submitted_by:  Option<UserId>,
    pub decided_by:    Option<UserId>,
    pub decided_at:    Option<DateTime<Utc>>,
    pub created_at:    DateTime<Utc>,
    pub updated_at:    DateTime<Utc>,
}

impl Surat {
    /// 新しい公文書を作成する
    ///
    /// 既定のステータスは PENDING で、作成者が提出者になる。
    /// 下書きとして作成した場合は提出者を持たない。
    pub fn new(params: NewSurat) -> Result<Self, DomainError> {
        let subject = params.subject.trim().to_string();
        if subject.is_empty() {
            return Err(DomainError::Validation("subject required".to_string()));
        }
        let target_role = params
            .target_role
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty());

        let (status, submitted_by) = if params.as_draft {
            (SuratStatus::Draft, None)
        } else {
            (SuratStatus::Pending, Some(params.created_by.clone()))
        };

        Ok(Self {
            id: params.id,
            org_id: params.org_id,
            target_org_id: params.target_org_id,
            target_role,
            variant: params.variant,
            number: params.number,
            subject,
            to_name: params.to_name,
            to_place: params.to_place,
            to_city: params.to_city,
            file_key: params.file_key,
            status,
            approval_note: None,
            created_by: params.created_by,
            submitted_by,
            decided_by: None,
            decided_at: None,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// 既存のデータから復元する
    pub fn from_db(record: SuratRecord) -> Self {
        Self {
            id: record.id,
            org_id: record.org_id,
            target_org_id: record.target_org_id,
            target_role: record.target_role,
            variant: record.variant,
            number: record.number,
            subject: record.subject,
            to_name: record.to_name,
            to_place: record.to_place,
            to_city: record.to_city,
            file_key: record.file_key,
            status: record.status,
            approval_note: record.approval_note,
            created_by: record.created_by,
            submitted_by: record.submitted_by,
            decided_by: record.decided_by,
            decided_at: record.decided_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &SuratId {
        &self.id
    }

    pub fn org_id(&self) -> &OrganizationId {
        &self.org_id
    }

    pub fn target_org_id(&self) -> Option<&OrganizationId> {
        self.target_org_id.as_ref()
    }

    pub fn target_role(&self) -> Option<&str> {
        self.target_role.as_deref()
    }

    pub fn variant(&self) -> SuratVariant {
        self.variant
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn to_name(&self) -> &str {
        &self.to_name
    }

    pub fn to_place(&self) -> &str {
        &self.to_place
    }

    pub fn to_city(&self) -> &str {
        &self.to_city
    }

    pub fn file_key(&self) -> Option<&str> {
        self.file_key.as_deref()
    }

    pub fn status(&self) -> SuratStatus {
        self.status
    }

    pub fn approval_note(&self) -> Option<&str> {
        self.approval_note.as_deref()
    }

    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    pub fn submitted_by(&self) -> Option<&UserId> {
        self.submitted_by.as_ref()
    }

    pub fn decided_by(&self) -> Option<&UserId> {
        self.decided_by.as_ref()
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl WorkflowEntity for Surat {
    type Operation = SuratOperation;
    type Status = SuratStatus;

    const ENTITY_TYPE: &'static str = "surat";

    fn transition_table() -> &'static TransitionTable<SuratOperation, SuratStatus> {
        &SURAT_TRANSITIONS
    }

    fn status(&self) -> SuratStatus {
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
        operation: SuratOperation,
        to: SuratStatus,
        ctx: &TransitionContext,
    ) -> Self {
        match operation {
            SuratOperation::Submit => Self {
                status: to,
                submitted_by: Some(ctx.actor.clone()),
                updated_at: ctx.now,
                ..self
            },
            SuratOperation::Approve | SuratOperation::Reject | SuratOperation::RequestRevision => {
                Self {
                    status: to,
                    approval_note: ctx.note.clone(),
                    decided_by: Some(ctx.actor.clone()),
                    decided_at: Some(ctx.now),
                    updated_at: ctx.now,
                    ..self
                }
            }
        }
    }
}

/// 受信箱の絞り込み条件
///
/// 発信元組織または宛先組織が `org_ids` に含まれるか、
/// 宛先ロールが `roles` に含まれる公文書を対象とする。
/// 決裁・差し戻しの認可判定と同じ述語で、読み取りと書き込みの結果を一致させる。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuratInboxFilter {
    pub org_ids: BTreeSet<OrganizationId>,
    pub roles:   BTreeSet<RoleCode>,
}

impl SuratInboxFilter {
    pub fn matches(&self, surat: &Surat) -> bool {
        if self.org_ids.contains(surat.org_id()) {
            return true;
        }
        if surat
            .target_org_id()
            .is_some_and(|target| self.org_ids.contains(target))
        {
            return true;
        }
        surat
            .target_role()
            .is_some_and(|role| self.roles.contains(&RoleCode::new(role)))
    }

    pub fn is_empty(&self) -> bool {
        self.org_ids.is_empty() && self.roles.is_empty()
    }
}
