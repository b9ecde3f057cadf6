//! # 認可リゾルバ
//!
//! 「ユーザー U は組織 O を管理できるか」「U はロール群のいずれかを持つか」を
//! ロールストアへの問い合わせで判定する。副作用は持たない。
//!
//! ## 組織管理権限の判定順序
//!
//! 先に一致した規則で確定する。グローバル・種別スコープのロールを
//! 組織スコープの問い合わせより先に確認する。
//!
//! 1. グローバル ADMIN
//! 2. 組織種別 BEM かつグローバル BEM_ADMIN
//! 3. 組織種別 DEMA かつグローバル DEMA_ADMIN
//! 4. この組織にスコープされた ORG_ADMIN
//! 5. この組織にスコープされた `ORG_` 接頭辞のロール（スラッグ由来のコードを含む）
//!
//! ## 承認権限
//!
//! 活動と LPJ の承認は ADMIN / BEM_ADMIN に限る。DEMA_ADMIN は組織を管理できても
//! これらを承認できない。カバー画像の承認は DEMA_ADMIN にも許可する。
//!
//! ## 失敗時の扱い
//!
//! ロールストアが「見つからない」を返した場合は「ロールなし」（`false`）として扱う。
//! それ以外のインフラエラーはそのまま伝播する。

use std::sync::Arc;

use simawa_domain::{
    access::AccessProfile,
    organization::{Organization, OrganizationId, OrganizationType},
    role::{ORG_ROLE_PREFIX, RoleAssignment, RoleCode},
    surat::Surat,
    user::UserId,
};
use simawa_infra::{
    InfraError,
    repository::{OrganizationRepository, RoleRepository},
};

use crate::{error::CoreError, usecase::helpers::FindResultExt};

/// 承認権限の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalScope {
    /// 活動の承認・却下
    Activity,
    /// LPJ の承認・却下・差し戻し
    Lpj,
    /// 活動カバー画像の承認
    Cover,
}

impl ApprovalScope {
    /// 承認を許可するグローバルロール
    pub fn approver_roles(self) -> Vec<RoleCode> {
        match self {
            Self::Activity | Self::Lpj => vec![RoleCode::admin(), RoleCode::bem_admin()],
            Self::Cover => vec![
                RoleCode::admin(),
                RoleCode::bem_admin(),
                RoleCode::dema_admin(),
            ],
        }
    }
}

/// ロールストアの「見つからない」を `false` に畳み込む
fn fail_closed(result: Result<bool, InfraError>) -> Result<bool, CoreError> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// 認可リゾルバ
pub struct AuthorizationResolver {
    role_repo: Arc<dyn RoleRepository>,
    org_repo:  Arc<dyn OrganizationRepository>,
}

impl AuthorizationResolver {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        org_repo: Arc<dyn OrganizationRepository>,
    ) -> Self {
        Self {
            role_repo,
            org_repo,
        }
    }

    async fn assignments(&self, user: &UserId) -> Result<Vec<RoleAssignment>, CoreError> {
        match self.role_repo.find_assignments_by_user(user).await {
            Ok(assignments) => Ok(assignments),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// グローバルロールのいずれかを持つか
    #[tracing::instrument(skip_all, level = "debug", fields(%user))]
    pub async fn has_any_role(&self, user: &UserId, codes: &[RoleCode]) -> Result<bool, CoreError> {
        let assignments = self.assignments(user).await?;
        Ok(assignments
            .iter()
            .any(|a| a.is_global() && codes.contains(a.role_code())))
    }

    /// 組織を管理できるか
    #[tracing::instrument(skip_all, level = "debug", fields(%user, org_id = %org.id()))]
    pub async fn can_manage_org(&self, user: &UserId, org: &Organization) -> Result<bool, CoreError> {
        // 1. グローバル ADMIN
        if self.has_any_role(user, &[RoleCode::admin()]).await? {
            return Ok(true);
        }

        // 2-3. 種別スコープの管理者
        let type_admin = match org.org_type() {
            OrganizationType::Bem => Some(RoleCode::bem_admin()),
            OrganizationType::Dema => Some(RoleCode::dema_admin()),
            OrganizationType::Ukm | OrganizationType::Hmj | OrganizationType::Other => None,
        };
        if let Some(code) = type_admin
            && self.has_any_role(user, &[code]).await?
        {
            return Ok(true);
        }

        // 4. この組織の ORG_ADMIN
        if fail_closed(
            self.role_repo
                .has_role_for_org(user, &RoleCode::org_admin(), org.id())
                .await,
        )? {
            return Ok(true);
        }

        // 5. この組織にスコープされた ORG_* ロール
        fail_closed(
            self.role_repo
                .has_any_role_for_org_prefix(user, org.id(), ORG_ROLE_PREFIX)
                .await,
        )
    }

    /// 組織 ID から組織を読み込んで管理権限を判定する
    ///
    /// ADMIN は組織の読み込みより前に確定する。
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound`: 組織が存在しない
    pub async fn can_manage_org_id(
        &self,
        user: &UserId,
        org_id: &OrganizationId,
    ) -> Result<bool, CoreError> {
        if self.has_any_role(user, &[RoleCode::admin()]).await? {
            return Ok(true);
        }
        let org = self.org_repo.find_by_id(org_id).await.or_not_found("組織")?;
        self.can_manage_org(user, &org).await
    }

    /// ユーザー検索を利用できるか
    pub async fn can_search_users(&self, user: &UserId) -> Result<bool, CoreError> {
        let admins = [
            RoleCode::admin(),
            RoleCode::bem_admin(),
            RoleCode::dema_admin(),
        ];
        if self.has_any_role(user, &admins).await? {
            return Ok(true);
        }
        fail_closed(
            self.role_repo
                .has_any_role_prefix(user, ORG_ROLE_PREFIX)
                .await,
        )
    }

    /// 指定の種類の承認権限を持つか
    pub async fn can_approve(&self, scope: ApprovalScope, user: &UserId) -> Result<bool, CoreError> {
        self.has_any_role(user, &scope.approver_roles()).await
    }

    pub async fn can_approve_activity(&self, user: &UserId) -> Result<bool, CoreError> {
        self.can_approve(ApprovalScope::Activity, user).await
    }

    pub async fn can_approve_lpj(&self, user: &UserId) -> Result<bool, CoreError> {
        self.can_approve(ApprovalScope::Lpj, user).await
    }

    pub async fn can_approve_cover(&self, user: &UserId) -> Result<bool, CoreError> {
        self.can_approve(ApprovalScope::Cover, user).await
    }

    /// ユーザーのアクセスプロファイル（公文書の受信箱・決裁判定に使う）
    pub async fn access_profile(&self, user: &UserId) -> Result<AccessProfile, CoreError> {
        let assignments = self.assignments(user).await?;
        Ok(AccessProfile::from_assignments(&assignments))
    }

    /// 公文書を決裁・差し戻し・閲覧できるか
    ///
    /// 受信箱の絞り込みと同じ述語を使う。
    pub async fn can_access_surat(&self, user: &UserId, surat: &Surat) -> Result<bool, CoreError> {
        Ok(self.access_profile(user).await?.can_access_surat(surat))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use simawa_infra::mock::{LookupFailure, MockOrganizationRepository, MockRoleRepository};

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct Fixture {
        roles:    MockRoleRepository,
        orgs:     MockOrganizationRepository,
        resolver: AuthorizationResolver,
    }

    fn fixture() -> Fixture {
        let roles = MockRoleRepository::new();
        let orgs = MockOrganizationRepository::new();
        let resolver = AuthorizationResolver::new(Arc::new(roles.clone()), Arc::new(orgs.clone()));
        Fixture {
            roles,
            orgs,
            resolver,
        }
    }

    fn org(org_type: OrganizationType, slug: &str) -> Organization {
        Organization::new(OrganizationId::new(), slug.to_uppercase(), slug, org_type)
    }

    #[tokio::test]
    async fn test_bem_adminは種別bemの組織だけを管理できる() {
        let f = fixture();
        let user = UserId::new();
        f.roles
            .add(RoleAssignment::global(user.clone(), RoleCode::bem_admin(), now()));

        let bem = org(OrganizationType::Bem, "bem-fakultas");
        let ukm = org(OrganizationType::Ukm, "abster");

        assert!(f.resolver.can_manage_org(&user, &bem).await.unwrap());
        assert!(!f.resolver.can_manage_org(&user, &ukm).await.unwrap());
    }

    #[tokio::test]
    async fn test_スラッグ由来のロールは同じ組織だけを管理できる() {
        let f = fixture();
        let user = UserId::new();
        let abster = org(OrganizationType::Ukm, "abster");
        let other = org(OrganizationType::Ukm, "himtif");
        f.roles.add(RoleAssignment::scoped(
            user.clone(),
            RoleCode::for_organization_slug(abster.slug()),
            abster.id().clone(),
            now(),
        ));

        assert!(f.resolver.can_manage_org(&user, &abster).await.unwrap());
        assert!(!f.resolver.can_manage_org(&user, &other).await.unwrap());
    }

    #[tokio::test]
    async fn test_スコープ付きのbem_adminはグローバルロールとして扱わない() {
        let f = fixture();
        let user = UserId::new();
        let bem = org(OrganizationType::Bem, "bem");
        let other = org(OrganizationType::Bem, "bem-lain");
        f.roles.add(RoleAssignment::scoped(
            user.clone(),
            RoleCode::bem_admin(),
            bem.id().clone(),
            now(),
        ));

        assert!(!f.resolver.can_manage_org(&user, &other).await.unwrap());
        assert!(
            !f.resolver
                .has_any_role(&user, &[RoleCode::bem_admin()])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_ロールストアのnot_foundはfalseとして扱う() {
        let f = fixture();
        let user = UserId::new();
        f.roles.fail_lookups(Some(LookupFailure::NotFound));

        let result = f.resolver.has_any_role(&user, &[RoleCode::admin()]).await;

        assert_eq!(result.unwrap(), false);
    }

    #[tokio::test]
    async fn test_ロールストアの障害は伝播する() {
        let f = fixture();
        let user = UserId::new();
        f.roles.fail_lookups(Some(LookupFailure::Unavailable));

        let result = f
            .resolver
            .can_manage_org(&user, &org(OrganizationType::Ukm, "abster"))
            .await;

        assert!(matches!(result, Err(CoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_存在しない組織idはnot_found() {
        let f = fixture();
        let user = UserId::new();

        let result = f.resolver.can_manage_org_id(&user, &OrganizationId::new()).await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_adminは組織を読み込まずに管理権限を持つ() {
        let f = fixture();
        let user = UserId::new();
        f.roles
            .add(RoleAssignment::global(user.clone(), RoleCode::admin(), now()));

        // 組織は登録していない
        let result = f.resolver.can_manage_org_id(&user, &OrganizationId::new()).await;

        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_登録済み組織idで判定できる() {
        let f = fixture();
        let user = UserId::new();
        let dema = org(OrganizationType::Dema, "dema");
        f.orgs.add(dema.clone());
        f.roles
            .add(RoleAssignment::global(user.clone(), RoleCode::dema_admin(), now()));

        assert!(f.resolver.can_manage_org_id(&user, dema.id()).await.unwrap());
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
        let f = fixture();
        let user = UserId::new();
        f.roles
            .add(RoleAssignment::global(user.clone(), RoleCode::new(code), now()));

        assert_eq!(f.resolver.can_approve_activity(&user).await.unwrap(), activity);
        assert_eq!(f.resolver.can_approve_lpj(&user).await.unwrap(), lpj);
        assert_eq!(f.resolver.can_approve_cover(&user).await.unwrap(), cover);
    }

    #[tokio::test]
    async fn test_ユーザー検索はorg接頭辞のロールでも許可される() {
        let f = fixture();
        let member = UserId::new();
        let outsider = UserId::new();
        f.roles.add(RoleAssignment::scoped(
            member.clone(),
            RoleCode::new("ORG_HIMTIF"),
            OrganizationId::new(),
            now(),
        ));
        f.roles
            .add(RoleAssignment::global(outsider.clone(), RoleCode::user(), now()));

        assert!(f.resolver.can_search_users(&member).await.unwrap());
        assert!(!f.resolver.can_search_users(&outsider).await.unwrap());
    }

    #[tokio::test]
    async fn test_同じ割り当てで2回判定しても結果は変わらない() {
        let f = fixture();
        let user = UserId::new();
        let target = org(OrganizationType::Hmj, "hmj-ti");
        f.roles.add(RoleAssignment::scoped(
            user.clone(),
            RoleCode::org_admin(),
            target.id().clone(),
            now(),
        ));

        let first = f.resolver.can_manage_org(&user, &target).await.unwrap();
        let second = f.resolver.can_manage_org(&user, &target).await.unwrap();

        assert!(first);
        assert_eq!(first, second);
    }
}
