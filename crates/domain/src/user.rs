//! # ユーザー識別子
//!
//! 認証済みの呼び出し元（アクター）を表す。ユーザー自体の管理は
//! このクレートの責務外で、ワークフローとロール判定は ID だけを扱う。

use uuid::Uuid;

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}

impl UserId {
    /// 定期処理（リマインダー / 完了スイープ）が操作者として記録する ID
    ///
    /// nil UUID を使うため、実在ユーザーと衝突しない。
    pub fn system() -> Self {
        Self::from_uuid(Uuid::nil())
    }

    /// 定期処理のアクターか判定する
    pub fn is_system(&self) -> bool {
        self.as_uuid().is_nil()
    }
}
