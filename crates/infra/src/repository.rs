//! # リポジトリ実装
//!
//! ワークフローが依存するリポジトリトレイトと PostgreSQL 実装を提供する。
//!
//! ## 設計方針
//!
//! - **トレイト境界**: ユースケース層は `Arc<dyn XxxRepository>` を受け取り、テストでは
//!   [`crate::mock`] のインメモリ実装に差し替える
//! - **書き込みはトランザクション経由**: 遷移に関わる書き込みは `&mut TxContext` を要求する
//! - **実行時クエリ**: `sqlx::query` / `query_as` + `FromRow` 行構造体

pub mod activity_repository;
pub mod audit_log_repository;
pub mod history_repository;
pub mod lpj_repository;
pub mod notification_repository;
pub mod organization_repository;
pub mod role_repository;
pub mod surat_repository;

pub use activity_repository::{
    ActivityListQuery,
    ActivityRepository,
    PostgresActivityRepository,
};
pub use audit_log_repository::{AuditLogRepository, PostgresAuditLogRepository};
pub use history_repository::{HistoryRepository, PostgresHistoryRepository};
pub use lpj_repository::{LpjRepository, PostgresLpjRepository};
pub use notification_repository::{NotificationRepository, PostgresNotificationRepository};
pub use organization_repository::{OrganizationRepository, PostgresOrganizationRepository};
pub use role_repository::{PostgresRoleRepository, RoleRepository};
pub use surat_repository::{
    PostgresSuratRepository,
    SuratArchiveQuery,
    SuratInboxQuery,
    SuratRepository,
};
