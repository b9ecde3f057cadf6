//! # Core Service ライブラリ
//!
//! Core Service のユースケースとハンドラを公開する。
//! `tests/` の結合テストからユースケースを直接呼び出すために、lib としても構成する。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

// テストユーティリティ（内部実装、ドキュメントからは隠す）
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
