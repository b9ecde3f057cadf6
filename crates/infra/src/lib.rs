//! # SIMAWA インフラ層
//!
//! PostgreSQL との接続と、ワークフローが依存するリポジトリの実装を担当する。
//!
//! ## 責務
//!
//! - **データベース接続**: 接続プール、マイグレーション、トランザクション
//! - **リポジトリ実装**: ロール・組織・活動・公文書・LPJ・履歴・監査ログ・通知
//! - **テスト用モック**: `test-utils` feature で公開するインメモリ実装
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//!                  ↘
//!                   shared
//! ```
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use simawa_infra::{db, repository::PostgresSuratRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/simawa").await?;
//!     let surat_repo = PostgresSuratRepository::new(pool.clone());
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use db::{PgTransactionManager, TransactionManager, TxContext};
pub use error::{InfraError, InfraErrorKind};
