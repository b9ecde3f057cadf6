//! # アプリ内通知
//!
//! ワークフロー遷移やリマインダーで利用者に届けるプッシュ通知。
//! タイトルと本文は利用者向けの表示文字列（インドネシア語）で、
//! `data` に関連エンティティの ID を入れる。

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::user::UserId;

define_uuid_id! {
    /// 通知 ID
    pub struct NotificationId;
}

/// 通知タイトル
pub mod title {
    pub const PROPOSAL_SUBMITTED: &str = "Proposal diajukan";
    pub const PROPOSAL_UPDATED: &str = "Proposal diperbarui";
    pub const COVER_UPDATED: &str = "Cover kegiatan diperbarui";
    pub const SURAT_UPDATED: &str = "Status surat diperbarui";
    pub const LPJ_SUBMITTED: &str = "LPJ dikirim";
    pub const LPJ_RESUBMITTED: &str = "LPJ dikirim ulang";
    pub const LPJ_UPDATED: &str = "LPJ diperbarui";
    pub const LPJ_REVISION_REQUESTED: &str = "LPJ diminta revisi";
    pub const ACTIVITY_REMINDER: &str = "Pengingat kegiatan";
    pub const ACTIVITY_REMINDER_H1: &str = "Pengingat H-1";
    pub const LPJ_DUE: &str = "LPJ diperlukan";
}

/// 通知エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id:         NotificationId,
    pub recipient:  UserId,
    pub title:      String,
    pub body:       String,
    pub data:       JsonValue,
    pub read_at:    Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// 未読の通知を作成する
    pub fn new(
        recipient: UserId,
        title: impl Into<String>,
        body: impl Into<String>,
        data: JsonValue,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient,
            title: title.into(),
            body: body.into(),
            data,
            read_at: None,
            created_at: now,
        }
    }
}
