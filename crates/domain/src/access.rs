//! # アクセスプロファイル
//!
//! 1 人のユーザーのロール割り当てを、認可判定に使う集合へ射影したもの。
//!
//! ## 設計方針
//!
//! - **純粋関数**: I/O を持たず、割り当ての一覧だけから判定する
//! - **公文書の単一述語**: 決裁・差し戻しの認可（書き込み）と受信箱の絞り込み（読み取り）は
//!   どちらも [`AccessProfile::surat_scope`] を通す。両者の結果は常に一致する

use std::collections::BTreeSet;

use crate::{
    organization::OrganizationId,
    role::{RoleAssignment, RoleCode},
    surat::{Surat, SuratInboxFilter},
};

/// 公文書の閲覧・決裁範囲
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuratScope {
    /// 全公文書（ADMIN / BEM_ADMIN / DEMA_ADMIN）
    All,
    /// 条件に一致する公文書のみ
    Filtered(SuratInboxFilter),
}

impl SuratScope {
    pub fn permits(&self, surat: &Surat) -> bool {
        match self {
            Self::All => true,
            Self::Filtered(filter) => filter.matches(surat),
        }
    }
}

/// ユーザーのロール割り当ての射影
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessProfile {
    /// 組織に依存しないロール
    global_roles: BTreeSet<RoleCode>,
    /// スコープを問わない全ロールコード
    role_codes:   BTreeSet<RoleCode>,
    /// 組織スコープ割り当てを持つ組織
    org_ids:      BTreeSet<OrganizationId>,
}

impl AccessProfile {
    pub fn from_assignments<'a>(assignments: impl IntoIterator<Item = &'a RoleAssignment>) -> Self {
        let mut profile = Self::default();
        for assignment in assignments {
            let code = assignment.role_code().clone();
            match assignment.org_id() {
                Some(org_id) => {
                    profile.org_ids.insert(org_id.clone());
                }
                None => {
                    profile.global_roles.insert(code.clone());
                }
            }
            profile.role_codes.insert(code);
        }
        profile
    }

    /// グローバルロールのいずれかを持つか
    pub fn has_any_global_role(&self, codes: &[RoleCode]) -> bool {
        codes.iter().any(|code| self.global_roles.contains(code))
    }

    /// 公文書をすべて扱える管理者か
    pub fn is_correspondence_admin(&self) -> bool {
        self.has_any_global_role(&[
            RoleCode::admin(),
            RoleCode::bem_admin(),
            RoleCode::dema_admin(),
        ])
    }

    /// 公文書の閲覧・決裁範囲を返す
    pub fn surat_scope(&self) -> SuratScope {
        if self.is_correspondence_admin() {
            return SuratScope::All;
        }
        SuratScope::Filtered(SuratInboxFilter {
            org_ids: self.org_ids.clone(),
            roles:   self.role_codes.clone(),
        })
    }

    /// 公文書にアクセス（決裁・差し戻し・閲覧）できるか
    pub fn can_access_surat(&self, surat: &Surat) -> bool {
        self.surat_scope().permits(surat)
    }

    pub fn org_ids(&self) -> &BTreeSet<OrganizationId> {
        &self.org_ids
    }

    pub fn role_codes(&self) -> &BTreeSet<RoleCode> {
        &self.role_codes
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        surat::{NewSurat, SuratId, SuratVariant},
        user::UserId,
    };

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn surat(
        origin: &OrganizationId,
        target: Option<&OrganizationId>,
        role: Option<&str>,
        now: DateTime<Utc>,
    ) -> Surat {
        Surat::new(NewSurat {
            id: SuratId::new(),
            org_id: origin.clone(),
            target_org_id: target.cloned(),
            target_role: role.map(str::to_string),
            variant: SuratVariant::Undangan,
            number: "002/HMJ/2024".to_string(),
            subject: "Undangan Seminar".to_string(),
            to_name: String::new(),
            to_place: String::new(),
            to_city: String::new(),
            file_key: None,
            as_draft: false,
            created_by: UserId::new(),
            now,
        })
        .unwrap()
    }

    #[rstest]
    #[case(RoleCode::admin())]
    #[case(RoleCode::bem_admin())]
    #[case(RoleCode::dema_admin())]
    fn test_グローバル管理者はすべての公文書にアクセスできる(
        now: DateTime<Utc>,
        #[case] code: RoleCode,
    ) {
        let user = UserId::new();
        let profile = AccessProfile::from_assignments(&[RoleAssignment::global(user, code, now)]);

        assert_eq!(profile.surat_scope(), SuratScope::All);
        assert!(profile.can_access_surat(&surat(&OrganizationId::new(), None, None, now)));
    }

    #[rstest]
    fn test_組織スコープのbem_adminは全件アクセスにならない(now: DateTime<Utc>) {
        let user = UserId::new();
        let org = OrganizationId::new();
        let profile = AccessProfile::from_assignments(&[RoleAssignment::scoped(
            user,
            RoleCode::bem_admin(),
            org.clone(),
            now,
        )]);

        assert!(!profile.is_correspondence_admin());
        assert!(profile.can_access_surat(&surat(&org, None, None, now)));
        assert!(!profile.can_access_surat(&surat(&OrganizationId::new(), None, None, now)));
    }

    #[rstest]
    fn test_宛先組織の管理者は発信元に所属しなくてもアクセスできる(now: DateTime<Utc>) {
        let user = UserId::new();
        let origin = OrganizationId::new();
        let target = OrganizationId::new();
        let profile = AccessProfile::from_assignments(&[RoleAssignment::scoped(
            user,
            RoleCode::org_admin(),
            target.clone(),
            now,
        )]);

        assert!(profile.can_access_surat(&surat(&origin, Some(&target), None, now)));
    }

    #[rstest]
    fn test_宛先ロールは大文字小文字を区別せず一致する(now: DateTime<Utc>) {
        let user = UserId::new();
        let profile = AccessProfile::from_assignments(&[RoleAssignment::global(
            user,
            RoleCode::new("KEMAHASISWAAN"),
            now,
        )]);

        assert!(profile.can_access_surat(&surat(
            &OrganizationId::new(),
            None,
            Some("kemahasiswaan"),
            now
        )));
        assert!(!profile.can_access_surat(&surat(&OrganizationId::new(), None, None, now)));
    }

    #[test]
    fn test_割り当てがない場合は何も許可しない() {
        let profile = AccessProfile::from_assignments(&[]);

        assert!(!profile.has_any_global_role(&[RoleCode::admin()]));
        assert!(!profile.is_correspondence_admin());
    }
}
