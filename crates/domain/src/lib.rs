//! # SIMAWA ドメイン層
//!
//! 学生組織の活動・公文書・LPJ を扱うワークフローの中核となるドメインモデル。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持ち、状態遷移は新しい値を返す（例: Activity, Surat, Lpj）
//! - **遷移表**: 3 種類のワークフローは同じ [`workflow::TransitionTable`] で表現する
//! - **純粋な認可述語**: ロール割り当てからの判定（[`access`]）は I/O を持たない
//! - **ドメインエラー**: ビジネスルール違反を [`DomainError`] で表現する
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）に一切依存しない。
//!
//! ## 使用例
//!
//! ```rust
//! use simawa_domain::{DomainError, role::RoleCode};
//!
//! let code = RoleCode::for_organization_slug("fc-raharja");
//! assert_eq!(code.as_str(), "ORG_FC_RAHARJA");
//!
//! let error = DomainError::NotFound {
//!     entity_type: "Activity",
//!     id:          "act-123".to_string(),
//! };
//! assert!(error.to_string().contains("Activity"));
//! ```

#[macro_use]
mod macros;

pub mod access;
pub mod activity;
pub mod audit_log;
pub mod clock;
pub mod error;
pub mod history;
pub mod lpj;
pub mod notification;
pub mod organization;
pub mod reminder;
pub mod role;
pub mod surat;
pub mod user;
pub mod version;
pub mod workflow;

pub use error::DomainError;
