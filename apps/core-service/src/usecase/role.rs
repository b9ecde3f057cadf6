//! ロール割り当てユースケース
//!
//! グローバルロールの付与は ADMIN だけが行える。
//! 組織別の管理ロール（`ORG_<スラッグ>`）は、その組織を管理できるアクターが付与する。

use std::sync::Arc;

use serde_json::json;
use simawa_domain::{
    audit_log::{AuditAction, AuditLog},
    organization::OrganizationId,
    role::{RoleAssignment, RoleCode},
    user::UserId,
};
use simawa_infra::repository::{OrganizationRepository, RoleRepository};
use simawa_shared::{event_log::event, log_business_event};

use super::{
    engine::{TransitionEffects, TransitionEngine},
    helpers::FindResultExt,
};
use crate::error::CoreError;

/// ロール割り当てユースケース
pub struct RoleUseCase {
    role_repo: Arc<dyn RoleRepository>,
    org_repo:  Arc<dyn OrganizationRepository>,
    engine:    Arc<TransitionEngine>,
}

impl RoleUseCase {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        org_repo: Arc<dyn OrganizationRepository>,
        engine: Arc<TransitionEngine>,
    ) -> Self {
        Self {
            role_repo,
            org_repo,
            engine,
        }
    }

    /// 割り当てを保存して監査ログを残す（既存の割り当てなら何も変わらない）
    async fn save(&self, actor: &UserId, assignment: &RoleAssignment) -> Result<(), CoreError> {
        let mut tx = self.engine.begin().await?;
        self.role_repo.assign(&mut tx, assignment).await?;
        let effects = TransitionEffects::new().with_audit(AuditLog::new(
            actor.clone(),
            AuditAction::RoleAssign,
            event::entity_type::USER_ROLE,
            *assignment.user_id().as_uuid(),
            json!({
                "user_id": assignment.user_id().to_string(),
                "role_code": assignment.role_code().as_str(),
                "org_id": assignment.org_id().map(ToString::to_string),
            }),
            assignment.created_at(),
        ));
        self.engine.finish(tx, effects).await?;

        log_business_event!(
            event.category = event::category::ROLE,
            event.action = event::action::ROLE_ASSIGNED,
            event.entity_type = event::entity_type::USER_ROLE,
            event.entity_id = %assignment.user_id(),
            event.actor_id = %actor,
            event.result = event::result::SUCCESS,
            role_code = assignment.role_code().as_str(),
            "ロールを割り当て"
        );
        Ok(())
    }

    /// グローバルロールを付与する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %user_id))]
    pub async fn assign_global_role(
        &self,
        actor: &UserId,
        user_id: &UserId,
        code: RoleCode,
    ) -> Result<RoleAssignment, CoreError> {
        if code.as_str().trim().is_empty() {
            return Err(CoreError::BadRequest("role code required".to_string()));
        }
        if !self
            .engine
            .resolver()
            .has_any_role(actor, &[RoleCode::admin()])
            .await?
        {
            return Err(CoreError::Forbidden("admin role required".to_string()));
        }

        let assignment = RoleAssignment::global(user_id.clone(), code, self.engine.now());
        self.save(actor, &assignment).await?;
        Ok(assignment)
    }

    /// 組織のスラッグから導出した管理ロールを付与する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %user_id, %org_id))]
    pub async fn grant_organization_admin(
        &self,
        actor: &UserId,
        user_id: &UserId,
        org_id: &OrganizationId,
    ) -> Result<RoleAssignment, CoreError> {
        let org = self.org_repo.find_by_id(org_id).await.or_not_found("組織")?;
        if !self.engine.resolver().can_manage_org(actor, &org).await? {
            return Err(CoreError::Forbidden(
                "not allowed to manage this organization".to_string(),
            ));
        }

        let assignment = RoleAssignment::scoped(
            user_id.clone(),
            RoleCode::for_organization_slug(org.slug()),
            org.id().clone(),
            self.engine.now(),
        );
        self.save(actor, &assignment).await?;
        Ok(assignment)
    }

    /// ユーザーのロール割り当てを取得する
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<RoleAssignment>, CoreError> {
        Ok(self.role_repo.find_assignments_by_user(user_id).await?)
    }
}
