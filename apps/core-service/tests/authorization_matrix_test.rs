//! 組織管理・承認権限の網羅テスト
//!
//! ロール × 組織種別 × スコープの全組み合わせで `can_manage_org` を検証する。

use pretty_assertions::assert_eq;
use rstest::rstest;
use simawa_core_service::test_utils::TestHarness;
use simawa_domain::{
    organization::{Organization, OrganizationType},
    role::{RoleAssignment, RoleCode},
    user::UserId,
};

/// 割り当てるロール
#[derive(Debug, Clone, Copy)]
enum Role {
    Admin,
    BemAdmin,
    DemaAdmin,
    OrgAdmin,
    /// 組織スラッグから導出した `ORG_<スラッグ>`
    OrgSlug,
}

/// ロールのスコープ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    ThisOrg,
    OtherOrg,
    Unscoped,
}

fn role_code(role: Role, org: &Organization) -> RoleCode {
    match role {
        Role::Admin => RoleCode::admin(),
        Role::BemAdmin => RoleCode::bem_admin(),
        Role::DemaAdmin => RoleCode::dema_admin(),
        Role::OrgAdmin => RoleCode::org_admin(),
        Role::OrgSlug => RoleCode::for_organization_slug(org.slug()),
    }
}

/// 期待値（判定規則をそのまま書き下したもの）
fn expected(role: Role, scope: Scope, org_type: OrganizationType) -> bool {
    match (role, scope) {
        (Role::Admin, Scope::Unscoped) => true,
        (Role::BemAdmin, Scope::Unscoped) => org_type == OrganizationType::Bem,
        (Role::DemaAdmin, Scope::Unscoped) => org_type == OrganizationType::Dema,
        (Role::OrgAdmin | Role::OrgSlug, Scope::ThisOrg) => true,
        _ => false,
    }
}

#[rstest]
#[tokio::test]
async fn test_組織管理権限は判定規則と一致する(
    #[values(Role::Admin, Role::BemAdmin, Role::DemaAdmin, Role::OrgAdmin, Role::OrgSlug)]
    role: Role,
    #[values(Scope::ThisOrg, Scope::OtherOrg, Scope::Unscoped)] scope: Scope,
    #[values(
        OrganizationType::Bem,
        OrganizationType::Dema,
        OrganizationType::Ukm,
        OrganizationType::Hmj,
        OrganizationType::Other
    )]
    org_type: OrganizationType,
) {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(org_type, "target-org");
    let other = h.org(OrganizationType::Ukm, "other-org");
    let user = UserId::new();
    let code = role_code(role, &org);
    let assignment = match scope {
        Scope::ThisOrg => RoleAssignment::scoped(user.clone(), code, org.id().clone(), h.now()),
        Scope::OtherOrg => RoleAssignment::scoped(user.clone(), code, other.id().clone(), h.now()),
        Scope::Unscoped => RoleAssignment::global(user.clone(), code, h.now()),
    };
    h.roles.add(assignment);

    // Act
    let first = h.resolver.can_manage_org(&user, &org).await.unwrap();
    let second = h.resolver.can_manage_org(&user, &org).await.unwrap();

    // Assert
    assert_eq!(
        first,
        expected(role, scope, org_type),
        "role={role:?} scope={scope:?} org_type={org_type:?}"
    );
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test]
async fn test_ロールを持たないユーザーはどの組織も管理できない(
    #[values(
        OrganizationType::Bem,
        OrganizationType::Dema,
        OrganizationType::Ukm,
        OrganizationType::Hmj,
        OrganizationType::Other
    )]
    org_type: OrganizationType,
) {
    let h = TestHarness::new();
    let org = h.org(org_type, "abster");

    let allowed = h.resolver.can_manage_org(&UserId::new(), &org).await.unwrap();

    assert!(!allowed);
}

#[rstest]
#[case(RoleCode::ADMIN, true, true, true)]
#[case(RoleCode::BEM_ADMIN, true, true, true)]
#[case(RoleCode::DEMA_ADMIN, false, false, true)]
#[case(RoleCode::ORG_ADMIN, false, false, false)]
#[case(RoleCode::USER, false, false, false)]
#[tokio::test]
async fn test_承認権限はdema_adminを活動とlpjから除外する(
    #[case] code: &str,
    #[case] activity: bool,
    #[case] lpj: bool,
    #[case] cover: bool,
) {
    let h = TestHarness::new();
    let user = h.user_with_global(code);

    assert_eq!(h.resolver.can_approve_activity(&user).await.unwrap(), activity);
    assert_eq!(h.resolver.can_approve_lpj(&user).await.unwrap(), lpj);
    assert_eq!(h.resolver.can_approve_cover(&user).await.unwrap(), cover);
}

#[tokio::test]
async fn test_シナリオa_bem_adminはbem組織だけを管理できる() {
    // Arrange
    let h = TestHarness::new();
    let bem = h.org(OrganizationType::Bem, "bem-pusat");
    let ukm = h.org(OrganizationType::Ukm, "ukm-musik");
    let user = h.user_with_global(RoleCode::BEM_ADMIN);

    // Act & Assert
    assert!(h.resolver.can_manage_org(&user, &bem).await.unwrap());
    assert!(!h.resolver.can_manage_org(&user, &ukm).await.unwrap());
}

#[test]
fn test_has_any_roleは同じ入力に同じ結果を返す() {
    let h = TestHarness::new();
    let user = h.user_with_global(RoleCode::DEMA_ADMIN);
    let codes = [RoleCode::admin(), RoleCode::dema_admin()];

    let results = tokio_test::block_on(async {
        let mut results = Vec::new();
        for _ in 0..3 {
            results.push(h.resolver.has_any_role(&user, &codes).await.unwrap());
        }
        results
    });

    assert_eq!(results, vec![true, true, true]);
}
