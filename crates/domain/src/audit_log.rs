//! # 監査ログ
//!
//! ワークフロー遷移とロール付与の監査証跡を表すドメインモデル。
//!
//! ## 設計方針
//!
//! - **不変性**: 監査ログは一度作成されたら変更されない
//! - **判定に使わない**: 書き込み専用。認可やワークフローの判断材料にはしない
//! - **メタデータ**: エンティティ ID、組織 ID、承認フラグなど最小限の構造化情報を JSON で持つ
//!
//! ## アクション体系
//!
//! アクションは `リソース.操作` 形式の文字列に変換される:
//!
//! | バリアント | 文字列表現 |
//! |-----------|-----------|
//! | `ActivityCreate` | `activity.create` |
//! | `ActivitySubmit` | `activity.submit` |
//! | `ActivityApprove` | `activity.approve` |
//! | `ActivityComplete` | `activity.complete` |
//! | `ActivityCoverApprove` | `activity.cover_approve` |
//! | `SuratCreate` | `surat.create` |
//! | `SuratSubmit` | `surat.submit` |
//! | `SuratDecide` | `surat.decide` |
//! | `SuratRevise` | `surat.revise` |
//! | `LpjSubmit` | `lpj.submit` |
//! | `LpjResubmit` | `lpj.resubmit` |
//! | `LpjApprove` | `lpj.approve` |
//! | `LpjRevisionRequested` | `lpj.revision_requested` |
//! | `RoleAssign` | `role.assign` |

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::user::UserId;

define_uuid_id! {
    /// 監査ログ ID
    pub struct AuditLogId;
}

/// 監査対象のアクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
pub enum AuditAction {
    #[strum(serialize = "activity.create")]
    ActivityCreate,
    #[strum(serialize = "activity.submit")]
    ActivitySubmit,
    #[strum(serialize = "activity.approve")]
    ActivityApprove,
    #[strum(serialize = "activity.complete")]
    ActivityComplete,
    #[strum(serialize = "activity.cover_approve")]
    ActivityCoverApprove,
    #[strum(serialize = "surat.create")]
    SuratCreate,
    #[strum(serialize = "surat.submit")]
    SuratSubmit,
    #[strum(serialize = "surat.decide")]
    SuratDecide,
    #[strum(serialize = "surat.revise")]
    SuratRevise,
    #[strum(serialize = "lpj.submit")]
    LpjSubmit,
    #[strum(serialize = "lpj.resubmit")]
    LpjResubmit,
    #[strum(serialize = "lpj.approve")]
    LpjApprove,
    #[strum(serialize = "lpj.revision_requested")]
    LpjRevisionRequested,
    #[strum(serialize = "role.assign")]
    RoleAssign,
}

impl_status_from_str!(AuditAction, "監査アクション", {
    "activity.create" => ActivityCreate,
    "activity.submit" => ActivitySubmit,
    "activity.approve" => ActivityApprove,
    "activity.complete" => ActivityComplete,
    "activity.cover_approve" => ActivityCoverApprove,
    "surat.create" => SuratCreate,
    "surat.submit" => SuratSubmit,
    "surat.decide" => SuratDecide,
    "surat.revise" => SuratRevise,
    "lpj.submit" => LpjSubmit,
    "lpj.resubmit" => LpjResubmit,
    "lpj.approve" => LpjApprove,
    "lpj.revision_requested" => LpjRevisionRequested,
    "role.assign" => RoleAssign,
});

/// 監査ログエンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLog {
    pub id:          AuditLogId,
    pub actor_id:    UserId,
    pub action:      AuditAction,
    pub entity_type: String,
    pub entity_id:   Uuid,
    pub metadata:    JsonValue,
    pub created_at:  DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        actor_id: UserId,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: Uuid,
        metadata: JsonValue,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            actor_id,
            action,
            entity_type: entity_type.into(),
            entity_id,
            metadata,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AuditAction::ActivitySubmit, "activity.submit")]
    #[case(AuditAction::SuratDecide, "surat.decide")]
    #[case(AuditAction::LpjRevisionRequested, "lpj.revision_requested")]
    #[case(AuditAction::RoleAssign, "role.assign")]
    fn test_アクションはドット区切りの文字列と相互変換できる(
        #[case] action: AuditAction,
        #[case] text: &str,
    ) {
        let written: &str = action.into();

        assert_eq!(written, text);
        assert_eq!(action.to_string(), text);
        assert_eq!(text.parse::<AuditAction>().unwrap(), action);
    }
}
