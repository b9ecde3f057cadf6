//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換など、複数のユースケースで
//! 繰り返されるパターンを共通化する。

use simawa_infra::InfraError;

use crate::error::CoreError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, CoreError>` に変換する
///
/// `find_by_id` 等の `Option` を返すリポジトリメソッドの結果を、
/// `CoreError::NotFound` または `CoreError::Database` に変換する。
///
/// ```ignore
/// let activity = self.activity_repo.find_by_id(&id).await.or_not_found("活動")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `CoreError::NotFound`、`InfraError` の場合は `CoreError::Database` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError> {
        self?
            .ok_or_else(|| CoreError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}

/// 条件付き更新の結果を変換する
///
/// ステータス不一致（別の書き込みが先に遷移させた）は `CoreError::Conflict`、
/// それ以外のインフラエラーは `CoreError::Database` になる。
pub(crate) trait SaveResultExt {
    fn or_conflict(self, entity_name: &str) -> Result<(), CoreError>;
}

impl SaveResultExt for Result<(), InfraError> {
    fn or_conflict(self, entity_name: &str) -> Result<(), CoreError> {
        self.map_err(|e| {
            if e.as_conflict().is_some() {
                CoreError::Conflict(format!(
                    "{}は既に更新されています。最新の情報を取得してください。",
                    entity_name
                ))
            } else {
                CoreError::Database(e)
            }
        })
    }
}

/// 必須ノートの検証
///
/// 認可やエンティティの読み込みより前に呼び、明らかに不正な入力を先に弾く。
pub(crate) fn require_note(note: &str, message: &str) -> Result<(), CoreError> {
    if note.trim().is_empty() {
        return Err(CoreError::BadRequest(message.to_string()));
    }
    Ok(())
}
