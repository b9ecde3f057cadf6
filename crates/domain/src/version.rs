//! # 楽観的ロック用のバージョン
//!
//! ステータスを変えない更新（ギャラリー、カバー承認）も含め、
//! エンティティを書き換えるたびに 1 つ進める。リポジトリは読み込み時の
//! バージョンを `WHERE version = $expected` で照合し、古いコピーからの
//! 上書きを競合として拒否する。

use std::fmt;

use crate::DomainError;

/// バージョン番号（1 以上）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(i32);

impl Version {
    pub fn initial() -> Self {
        Self(1)
    }

    /// 次のバージョンを返す
    ///
    /// i32 の上限では飽和する（実運用では到達しない）。
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// DB 互換用
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(DomainError::Validation(format!(
                "version must be positive: {value}"
            )));
        }
        Ok(Self(value))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
