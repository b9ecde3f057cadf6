//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で調査しやすいよう、ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! 既存の `tracing::error!` / `tracing::warn!` に `error.category` + `error.kind`
//! フィールドを直接追加する。定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティ ID
/// - `event.actor_id`: 操作者 ID
/// - `event.org_id`: 所有組織 ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const WORKFLOW: &str = "workflow";
        pub const ROLE: &str = "role";
        pub const NOTIFICATION: &str = "notification";
        pub const REMINDER: &str = "reminder";
    }

    /// イベントアクション
    pub mod action {
        // 活動
        pub const ACTIVITY_CREATED: &str = "activity.created";
        pub const ACTIVITY_SUBMITTED: &str = "activity.submitted";
        pub const ACTIVITY_APPROVED: &str = "activity.approved";
        pub const ACTIVITY_REJECTED: &str = "activity.rejected";
        pub const ACTIVITY_REVISED: &str = "activity.revised";
        pub const ACTIVITY_COMPLETED: &str = "activity.completed";
        pub const ACTIVITY_GALLERY_UPDATED: &str = "activity.gallery_updated";
        pub const ACTIVITY_COVER_DECIDED: &str = "activity.cover_decided";

        // 公文書
        pub const SURAT_CREATED: &str = "surat.created";
        pub const SURAT_SUBMITTED: &str = "surat.submitted";
        pub const SURAT_DECIDED: &str = "surat.decided";
        pub const SURAT_REVISED: &str = "surat.revised";

        // LPJ
        pub const LPJ_SUBMITTED: &str = "lpj.submitted";
        pub const LPJ_RESUBMITTED: &str = "lpj.resubmitted";
        pub const LPJ_DECIDED: &str = "lpj.decided";
        pub const LPJ_REVISION_REQUESTED: &str = "lpj.revision_requested";

        // ロール
        pub const ROLE_ASSIGNED: &str = "role.assigned";

        // 通知
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";

        // リマインダー
        pub const REMINDER_SWEEP_FINISHED: &str = "reminder.sweep_finished";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const ACTIVITY: &str = "activity";
        pub const SURAT: &str = "surat";
        pub const LPJ: &str = "lpj";
        pub const USER_ROLE: &str = "user_role";
        pub const NOTIFICATION: &str = "notification";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// ワークフロー（状態遷移・認可）
        pub const WORKFLOW: &str = "workflow";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const INTERNAL: &str = "internal";
        pub const NOTIFICATION_DELIVERY: &str = "notification_delivery";
        pub const CONCURRENT_UPDATE: &str = "concurrent_update";
    }
}
