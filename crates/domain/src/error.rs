//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//! - **状態遷移エラーの独立**: 許可されていない遷移は入力検証エラーと区別する
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗（却下時のノート欠落など） |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Forbidden` | 403 Forbidden | 権限不足 |
//! | `InvalidTransition` | 409 Conflict | 現在のステータスから実行できない操作 |
//! | `Conflict` | 409 Conflict | 同時更新による競合 |
//!
//! ## 使用例
//!
//! ```rust
//! use simawa_domain::DomainError;
//!
//! fn require_note(note: &str) -> Result<(), DomainError> {
//!     if note.trim().is_empty() {
//!         return Err(DomainError::Validation("note required".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_note("").is_err());
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// ユースケース層でこのエラーを受け取り、`CoreError` に変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 却下時のノートが空
    /// - LPJ の報告書ファイルキーが未指定
    /// - 終了日時が開始日時より前
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Activity", "Surat", "Lpj" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 権限エラー
    ///
    /// 認証（Authentication）ではなく認可（Authorization）の失敗を表す。
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 不正な状態遷移
    ///
    /// 現在のステータスが操作の遷移元に含まれない場合に使用する。
    /// メッセージには利用者向けの理由（"only draft can be submitted" など）を入れる。
    #[error("{0}")]
    InvalidTransition(String),

    /// 競合エラー
    ///
    /// 読み込み後に別の書き込みがステータスを変更していた場合に使用する。
    #[error("競合が発生しました: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_invalid_transitionは理由をそのまま表示する() {
        let err = DomainError::InvalidTransition("only draft can be submitted".to_string());

        assert_eq!(err.to_string(), "only draft can be submitted");
    }

    #[test]
    fn test_not_foundはエンティティ種別とidを表示する() {
        let err = DomainError::NotFound {
            entity_type: "Surat",
            id:          "abc".to_string(),
        };

        assert_eq!(err.to_string(), "Surat が見つかりません: abc");
    }
}
