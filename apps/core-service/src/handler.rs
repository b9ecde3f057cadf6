//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュールで re-export し、フラットな API を提供
//!
//! ## ハンドラ一覧
//!
//! - `health`: Liveness / Readiness チェック

pub mod health;

pub use health::{ReadinessState, health_check, readiness_check};
