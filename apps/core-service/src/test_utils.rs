//! テストユーティリティ
//!
//! ユースケースの単体テストと `tests/` の結合テストで共有する。
//! 他クレートから使う場合は `test-utils` feature を有効にする。

mod harness;

pub use harness::{TestHarness, WriteCounts, fixed_now};
