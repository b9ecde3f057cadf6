//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリを `Arc<dyn Trait>` で外部から注入
//! - **共通の遷移手順**: 3 種類のワークフローは [`TransitionEngine`] を通して
//!   認可 → 遷移元の検査 → 永続化 → 履歴・監査ログ → 通知 の順に処理する
//!
//! ## モジュール構成
//!
//! - `authorization`: スコープ付きロールによる認可判定
//! - `engine`: ガード付き状態遷移エンジン
//! - `activity` / `surat` / `lpj`: 各ワークフロー
//! - `role`: ロールの付与
//! - `notification`: アプリ内通知
//! - `reminder`: 活動リマインダーと完了スイープ

pub(crate) mod helpers;

pub mod activity;
pub mod authorization;
pub mod engine;
pub mod lpj;
pub mod notification;
pub mod reminder;
pub mod role;
pub mod surat;

pub use activity::{ActivityUseCase, CreateActivityInput};
pub use authorization::{ApprovalScope, AuthorizationResolver};
pub use engine::{
    ApproverGuard,
    ManageOrgGuard,
    SuratAccessGuard,
    SystemGuard,
    TransitionEffects,
    TransitionEngine,
    TransitionGuard,
};
pub use lpj::{LpjUseCase, SubmitLpjInput};
pub use notification::NotificationService;
pub use reminder::{ReminderSweep, SweepReport, spawn_reminder_worker};
pub use role::RoleUseCase;
pub use surat::{CreateSuratInput, SuratUseCase};
