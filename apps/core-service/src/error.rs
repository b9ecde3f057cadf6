//! # Core Service エラー定義
//!
//! ユースケース層で発生するエラーを定義する。
//!
//! ドメインエラーは `From<DomainError>` で種別ごとに対応付け、
//! インフラ層のエラーは `Database` に包んで SpanTrace ごと呼び出し元へ返す。
//! 定期処理は種別を見て、スキップ扱いにするかエラーとして記録するかを決める。

use simawa_domain::DomainError;
use simawa_infra::InfraError;
use thiserror::Error;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト（入力検証エラー）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 現在のステータスから実行できない操作
    ///
    /// メッセージは利用者向けの理由をそのまま保持する。
    #[error("{0}")]
    InvalidTransition(String),

    /// 競合（条件付き更新の失敗）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),
}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type}(id={id})"))
            }
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
            DomainError::InvalidTransition(msg) => Self::InvalidTransition(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DomainError::Validation("note required for reject".to_string()), "BadRequest")]
    #[case(DomainError::Forbidden("x".to_string()), "Forbidden")]
    #[case(DomainError::InvalidTransition("not pending".to_string()), "InvalidTransition")]
    #[case(DomainError::Conflict("x".to_string()), "Conflict")]
    #[case(
        DomainError::NotFound { entity_type: "Activity", id: "a".to_string() },
        "NotFound"
    )]
    fn test_ドメインエラーは対応する種別に変換される(
        #[case] err: DomainError,
        #[case] expected: &str,
    ) {
        let converted = CoreError::from(err);

        assert!(format!("{converted:?}").starts_with(expected));
    }

    #[test]
    fn test_invalid_transitionは理由をそのまま表示する() {
        let err = CoreError::from(DomainError::InvalidTransition(
            "only draft can be submitted".to_string(),
        ));

        assert_eq!(err.to_string(), "only draft can be submitted");
    }

    #[test]
    fn test_not_foundはエンティティ名とidを保持する() {
        let err = CoreError::from(DomainError::NotFound {
            entity_type: "Lpj",
            id:          "LPJ-001".to_string(),
        });

        assert!(matches!(err, CoreError::NotFound(msg) if msg == "Lpj(id=LPJ-001)"));
    }

    #[test]
    fn test_インフラエラーはdatabaseに包まれる() {
        let err = CoreError::from(InfraError::conflict("Activity", "ACT-001"));

        assert!(matches!(&err, CoreError::Database(e) if e.as_conflict().is_some()));
    }
}
