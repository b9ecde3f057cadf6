//! # エンティティ履歴
//!
//! Activity と LPJ の操作履歴（タイムライン表示用）を表す。
//! 一度書き込んだ履歴は変更も削除もしない。汎用の監査ログとは別に、
//! エンティティ自身の時系列として保持する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{activity::ActivityId, lpj::LpjId, organization::OrganizationId, user::UserId};

define_uuid_id! {
    /// 履歴エントリ ID
    pub struct HistoryEntryId;
}

/// 履歴の対象エンティティ
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HistorySubject {
    Activity(ActivityId),
    Lpj(LpjId),
}

impl HistorySubject {
    /// DB に保存する種別文字列
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Activity(_) => "activity",
            Self::Lpj(_) => "lpj",
        }
    }

    pub fn entity_uuid(&self) -> Uuid {
        match self {
            Self::Activity(id) => *id.as_uuid(),
            Self::Lpj(id) => *id.as_uuid(),
        }
    }

    /// 種別文字列と UUID から復元する
    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "activity" => Some(Self::Activity(ActivityId::from_uuid(id))),
            "lpj" => Some(Self::Lpj(LpjId::from_uuid(id))),
            _ => None,
        }
    }
}

/// 履歴アクション
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Create,
    Submit,
    Resubmit,
    Approve,
    Reject,
    Revision,
    RevisionRequested,
    Complete,
    AddPhoto,
    RemovePhoto,
    CoverApprove,
}

impl_status_from_str!(HistoryAction, "履歴アクション", {
    "CREATE" => Create,
    "SUBMIT" => Submit,
    "RESUBMIT" => Resubmit,
    "APPROVE" => Approve,
    "REJECT" => Reject,
    "REVISION" => Revision,
    "REVISION_REQUESTED" => RevisionRequested,
    "COMPLETE" => Complete,
    "ADD_PHOTO" => AddPhoto,
    "REMOVE_PHOTO" => RemovePhoto,
    "COVER_APPROVE" => CoverApprove,
});

/// 履歴エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id:         HistoryEntryId,
    pub subject:    HistorySubject,
    pub org_id:     OrganizationId,
    pub actor:      UserId,
    pub action:     HistoryAction,
    pub note:       String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        subject: HistorySubject,
        org_id: OrganizationId,
        actor: UserId,
        action: HistoryAction,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryEntryId::new(),
            subject,
            org_id,
            actor,
            action,
            note: note.into(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_対象エンティティは種別とuuidから復元できる() {
        let id = LpjId::new();
        let subject = HistorySubject::Lpj(id.clone());

        let restored = HistorySubject::from_parts(subject.kind(), subject.entity_uuid());

        assert_eq!(restored, Some(HistorySubject::Lpj(id)));
        assert_eq!(HistorySubject::from_parts("surat", Uuid::nil()), None);
    }

    #[test]
    fn test_履歴アクションは大文字スネークケースで書き出される() {
        let text: &str = HistoryAction::RevisionRequested.into();

        assert_eq!(text, "REVISION_REQUESTED");
        assert_eq!(
            "REMOVE_PHOTO".parse::<HistoryAction>().unwrap(),
            HistoryAction::RemovePhoto
        );
    }
}
