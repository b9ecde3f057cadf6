//! # ロール（スコープ付き権限）
//!
//! ユーザーに割り当てられるロールコードと、その割り当て（スコープ）を管理する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`RoleCode`] | ロールコード | `ADMIN`, `BEM_ADMIN`, `ORG_ABSTER` などの開いた文字列集合 |
//! | [`RoleAssignment`] | ロール割り当て | (ユーザー, ロールコード, 組織 ID または なし) |
//!
//! ## 設計方針
//!
//! - **グローバルロール**: `org_id` が `None` の割り当て。ロールコードだけで権限が決まる
//! - **組織スコープロール**: `org_id` を持つ割り当て。ロールコードと組織 ID の組で権限が決まる
//! - **組織別コード**: `ORG_` プレフィックスの規約で、組織ごとのスキーマ変更なしに
//!   組織管理権限を表現する。スラッグからの導出は [`RoleCode::for_organization_slug`] に集約する
//!
//! ## 使用例
//!
//! ```rust
//! use simawa_domain::role::RoleCode;
//!
//! assert_eq!(RoleCode::for_organization_slug("fc-raharja").as_str(), "ORG_FC_RAHARJA");
//! assert_eq!(RoleCode::new(" bem_admin ").as_str(), "BEM_ADMIN");
//! ```

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{organization::OrganizationId, user::UserId};

/// 組織スコープロールのプレフィックス
pub const ORG_ROLE_PREFIX: &str = "ORG_";

/// スラッグから組織コードを導出できない場合のフォールバック
const UNKNOWN_ORG_ROLE: &str = "ORG_UNKNOWN";

/// ロールコード（値オブジェクト）
///
/// 生成時に前後の空白を除去し、大文字に正規化する。
/// 既知のコードは関連関数（[`RoleCode::admin`] など）で取得する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct RoleCode(String);

impl RoleCode {
    pub const ADMIN: &'static str = "ADMIN";
    pub const BEM_ADMIN: &'static str = "BEM_ADMIN";
    pub const DEMA_ADMIN: &'static str = "DEMA_ADMIN";
    pub const ORG_ADMIN: &'static str = "ORG_ADMIN";
    pub const USER: &'static str = "USER";

    /// 任意の文字列からロールコードを作成する（trim + 大文字化）
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_uppercase())
    }

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn bem_admin() -> Self {
        Self(Self::BEM_ADMIN.to_string())
    }

    pub fn dema_admin() -> Self {
        Self(Self::DEMA_ADMIN.to_string())
    }

    pub fn org_admin() -> Self {
        Self(Self::ORG_ADMIN.to_string())
    }

    pub fn user() -> Self {
        Self(Self::USER.to_string())
    }

    /// 組織スラッグから組織別の管理ロールコードを導出する
    ///
    /// ## 正規化ルール
    ///
    /// 1. 前後の空白を除去し小文字化する
    /// 2. 英数字（ASCII 以外の文字も含む）は大文字化し、それ以外（`-` を含む）は `_` にする
    /// 3. 連続する `_` は 1 つにまとめ、前後の `_` は取り除く
    /// 4. 本体が空になった場合は `ORG_UNKNOWN`
    ///
    /// | スラッグ | ロールコード |
    /// |---------|-------------|
    /// | `abster` | `ORG_ABSTER` |
    /// | `fc-raharja` | `ORG_FC_RAHARJA` |
    /// | `  UKM  Seni--Tari ` | `ORG_UKM_SENI_TARI` |
    /// | `café` | `ORG_CAFÉ` |
    /// | `` | `ORG_UNKNOWN` |
    pub fn for_organization_slug(slug: &str) -> Self {
        let lowered = slug.trim().to_lowercase();
        let mut body = String::with_capacity(lowered.len());

        for ch in lowered.chars() {
            if ch.is_alphanumeric() {
                body.extend(ch.to_uppercase());
            } else if !body.is_empty() && !body.ends_with('_') {
                body.push('_');
            }
        }

        let body = body.trim_end_matches('_');
        if body.is_empty() {
            return Self(UNKNOWN_ORG_ROLE.to_string());
        }
        Self(format!("{ORG_ROLE_PREFIX}{body}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 指定したプレフィックスで始まるか判定する
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// 組織スコープ系のロールコード（`ORG_` で始まる）か判定する
    pub fn is_org_scoped_code(&self) -> bool {
        self.has_prefix(ORG_ROLE_PREFIX)
    }
}

impl From<&str> for RoleCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// ロール割り当て
///
/// `(user_id, role_code, org_id)` が一意キー。同じ組を再度割り当てても
/// エラーにはならず、既存の割り当てがそのまま残る（upsert）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    user_id:    UserId,
    role_code:  RoleCode,
    org_id:     Option<OrganizationId>,
    created_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// グローバルロールの割り当てを作成する
    pub fn global(user_id: UserId, role_code: RoleCode, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role_code,
            org_id: None,
            created_at: now,
        }
    }

    /// 組織スコープロールの割り当てを作成する
    pub fn scoped(
        user_id: UserId,
        role_code: RoleCode,
        org_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            role_code,
            org_id: Some(org_id),
            created_at: now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(
        user_id: UserId,
        role_code: RoleCode,
        org_id: Option<OrganizationId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            role_code,
            org_id,
            created_at,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn role_code(&self) -> &RoleCode {
        &self.role_code
    }

    pub fn org_id(&self) -> Option<&OrganizationId> {
        self.org_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_global(&self) -> bool {
        self.org_id.is_none()
    }

    /// 割り当てキーが同じか判定する（作成日時は比較しない）
    pub fn same_key(&self, other: &RoleAssignment) -> bool {
        self.user_id == other.user_id
            && self.role_code == other.role_code
            && self.org_id == other.org_id
    }
}
