//! # インフラ層エラー定義
//!
//! リポジトリが返すエラー。生成時点の [`SpanTrace`] を保持するので、
//! ユースケース層でログに出したときにどのリポジトリ呼び出しで失敗したかが分かる。
//!
//! | 種別 | 発生箇所 |
//! |------|----------|
//! | `Database` | sqlx のクエリ実行（`RowNotFound` を含む） |
//! | `Conflict` | 条件付き更新（ステータス・バージョン照合）が 0 行だった |
//! | `InvalidInput` | ロール接頭辞検索など、呼び出し側の引数が不正 |
//! | `Unexpected` | 保存済みの行をドメイン型に復元できない、トランザクションの取り違え |

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// 種別は [`kind()`](InfraError::kind) で参照する。競合だけは
/// [`as_conflict()`](InfraError::as_conflict) で直接取り出せる。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// 読み込み後に別の書き込みが先行した
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict {
        /// エンティティ名（例: "活動"）
        entity: String,
        id:     String,
    },

    #[error("入力エラー: {0}")]
    InvalidInput(String),

    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// 生成時点のスパン（ログ出力用）
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 条件付き更新の競合なら `(entity, id)` を返す
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InfraErrorKind::Conflict { entity, id } => Some((entity, id)),
            _ => None,
        }
    }

    /// `fetch_one` が行を見つけられなかったか
    ///
    /// 認可判定ではロールなしとして扱う。
    pub fn is_not_found(&self) -> bool {
        matches!(&self.kind, InfraErrorKind::Database(sqlx::Error::RowNotFound))
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::Conflict {
            entity: entity.into(),
            id:     id.into(),
        })
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::InvalidInput(msg.into()))
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::Unexpected(msg.into()))
    }

    fn capture(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::capture(InfraErrorKind::Database(source))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    fn in_span(name: &'static str, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        let span = tracing::info_span!("repo", op = name);
        let _enter = span.enter();
        f();
    }

    #[test]
    fn test_sqlxのエラーは呼び出し元のスパンとともにdatabaseになる() {
        in_span("find_pending_lpj", || {
            let err: InfraError = sqlx::Error::PoolTimedOut.into();

            assert!(matches!(err.kind(), InfraErrorKind::Database(_)));
            assert!(err.source().is_some());
            assert!(err.span_trace().to_string().contains("repo"));
        });
    }

    #[test]
    fn test_row_not_foundだけをnot_foundとみなす() {
        let not_found: InfraError = sqlx::Error::RowNotFound.into();
        let timeout: InfraError = sqlx::Error::PoolTimedOut.into();

        assert!(not_found.is_not_found());
        assert!(!timeout.is_not_found());
        assert!(!InfraError::conflict("公文書", "SRT-001").is_not_found());
    }

    #[test]
    fn test_競合はエンティティとidを取り出せる() {
        let err = InfraError::conflict("活動", "ACT-001");

        assert_eq!(err.as_conflict(), Some(("活動", "ACT-001")));
        assert_eq!(err.to_string(), "競合が発生しました: 活動(id=ACT-001)");
    }

    #[test]
    fn test_データベースエラーは競合ではない() {
        let err: InfraError = sqlx::Error::RowNotFound.into();

        assert_eq!(err.as_conflict(), None);
    }
}
