//! # 公文書（Surat）ワークフロー
//!
//! 発信元組織と、任意の宛先組織・宛先ロールを持つ公文書の作成と決裁を扱う。
//!
//! ## 認可
//!
//! - 作成・提出: 発信元組織を管理できるアクター
//! - 決裁・差し戻し・閲覧: [`AccessProfile::surat_scope`] の述語
//!   （管理者ロール、発信元/宛先組織のスコープ、宛先ロールのいずれか）
//!
//! 受信箱の一覧も同じ述語で絞り込むため、受信箱に見える公文書は必ず決裁でき、
//! 決裁できる公文書は必ず受信箱に見える。
//!
//! [`AccessProfile::surat_scope`]: simawa_domain::access::AccessProfile::surat_scope

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use simawa_domain::{
    access::SuratScope,
    audit_log::{AuditAction, AuditLog},
    notification::{Notification, title},
    organization::OrganizationId,
    surat::{NewSurat, Surat, SuratId, SuratOperation, SuratStatus, SuratVariant},
    user::UserId,
    workflow::WorkflowEntity,
};
use simawa_infra::repository::{SuratArchiveQuery, SuratInboxQuery, SuratRepository};
use simawa_shared::{
    event_log::event,
    log_business_event,
    paginated_response::{Page, Paginated},
};

use super::{
    engine::{ManageOrgGuard, SuratAccessGuard, TransitionEffects, TransitionEngine},
    helpers::{FindResultExt, SaveResultExt},
};
use crate::error::CoreError;

/// 公文書の作成入力
#[derive(Debug, Clone)]
pub struct CreateSuratInput {
    pub org_id:        OrganizationId,
    pub target_org_id: Option<OrganizationId>,
    pub target_role:   Option<String>,
    pub variant:       SuratVariant,
    pub number:        String,
    pub subject:       String,
    pub to_name:       String,
    pub to_place:      String,
    pub to_city:       String,
    pub file_key:      Option<String>,
    /// `true` なら DRAFT、`false` なら PENDING で作成する
    pub as_draft:      bool,
}

/// 公文書ワークフローのユースケース
pub struct SuratUseCase {
    surat_repo: Arc<dyn SuratRepository>,
    engine:     Arc<TransitionEngine>,
}

impl SuratUseCase {
    pub fn new(surat_repo: Arc<dyn SuratRepository>, engine: Arc<TransitionEngine>) -> Self {
        Self { surat_repo, engine }
    }

    async fn load(&self, surat_id: &SuratId) -> Result<Surat, CoreError> {
        self.surat_repo.find_by_id(surat_id).await.or_not_found("公文書")
    }

    async fn persist(
        &self,
        surat: &Surat,
        expected: SuratStatus,
        effects: TransitionEffects,
    ) -> Result<(), CoreError> {
        let mut tx = self.engine.begin().await?;
        self.surat_repo
            .update_with_status_check(&mut tx, surat, expected)
            .await
            .or_conflict("公文書")?;
        self.engine.finish(tx, effects).await
    }

    fn audit(
        surat: &Surat,
        actor: &UserId,
        action: AuditAction,
        metadata: JsonValue,
        now: DateTime<Utc>,
    ) -> AuditLog {
        AuditLog::new(
            actor.clone(),
            action,
            Surat::ENTITY_TYPE,
            surat.entity_uuid(),
            metadata,
            now,
        )
    }

    /// 作成者への決裁結果の通知
    fn decision_notification(surat: &Surat, now: DateTime<Utc>) -> Notification {
        let status: &'static str = surat.status().into();
        Notification::new(
            surat.created_by().clone(),
            title::SURAT_UPDATED,
            format!("Surat {}", status.to_lowercase()),
            json!({ "surat_id": surat.id().to_string() }),
            now,
        )
    }

    /// 公文書を作成する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, org_id = %input.org_id))]
    pub async fn create(&self, actor: &UserId, input: CreateSuratInput) -> Result<Surat, CoreError> {
        // 1. 発信元組織の管理権限
        if !self
            .engine
            .resolver()
            .can_manage_org_id(actor, &input.org_id)
            .await?
        {
            return Err(CoreError::Forbidden(
                "not allowed to manage this organization".to_string(),
            ));
        }

        // 2. エンティティ生成
        let now = self.engine.now();
        let surat = Surat::new(NewSurat {
            id: SuratId::new(),
            org_id: input.org_id,
            target_org_id: input.target_org_id,
            target_role: input.target_role,
            variant: input.variant,
            number: input.number,
            subject: input.subject,
            to_name: input.to_name,
            to_place: input.to_place,
            to_city: input.to_city,
            file_key: input.file_key,
            as_draft: input.as_draft,
            created_by: actor.clone(),
            now,
        })?;

        // 3. 保存 → 監査ログ
        let status: &'static str = surat.status().into();
        let mut tx = self.engine.begin().await?;
        self.surat_repo.insert(&mut tx, &surat).await?;
        let effects = TransitionEffects::new().with_audit(Self::audit(
            &surat,
            actor,
            AuditAction::SuratCreate,
            json!({
                "surat_id": surat.id().to_string(),
                "org_id": surat.org_id().to_string(),
                "status": status,
            }),
            now,
        ));
        self.engine.finish(tx, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::SURAT_CREATED,
            event.entity_type = event::entity_type::SURAT,
            event.entity_id = %surat.id(),
            event.actor_id = %actor,
            event.org_id = %surat.org_id(),
            event.result = event::result::SUCCESS,
            "公文書を作成"
        );

        Ok(surat)
    }

    /// 下書きの公文書を提出する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %surat_id))]
    pub async fn submit(&self, actor: &UserId, surat_id: &SuratId) -> Result<Surat, CoreError> {
        let surat = self.load(surat_id).await?;
        let expected = surat.status();

        let ctx = self.engine.context(actor);
        let submitted = self
            .engine
            .authorize_and_apply(&ManageOrgGuard, surat, SuratOperation::Submit, &ctx)
            .await?;

        let effects = TransitionEffects::new().with_audit(Self::audit(
            &submitted,
            actor,
            AuditAction::SuratSubmit,
            json!({
                "surat_id": submitted.id().to_string(),
                "org_id": submitted.org_id().to_string(),
            }),
            ctx.now,
        ));
        self.persist(&submitted, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::SURAT_SUBMITTED,
            event.entity_type = event::entity_type::SURAT,
            event.entity_id = %submitted.id(),
            event.actor_id = %actor,
            event.org_id = %submitted.org_id(),
            event.result = event::result::SUCCESS,
            "公文書を提出"
        );

        Ok(submitted)
    }

    /// 承認待ちの公文書を承認または却下する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %surat_id, approve))]
    pub async fn decide(
        &self,
        actor: &UserId,
        surat_id: &SuratId,
        approve: bool,
        note: &str,
    ) -> Result<Surat, CoreError> {
        let surat = self.load(surat_id).await?;
        let expected = surat.status();

        let operation = if approve {
            SuratOperation::Approve
        } else {
            SuratOperation::Reject
        };
        let ctx = self.engine.context(actor).with_note(note);
        let decided = self
            .engine
            .authorize_and_apply(&SuratAccessGuard, surat, operation, &ctx)
            .await?;

        let effects = TransitionEffects::new()
            .with_audit(Self::audit(
                &decided,
                actor,
                AuditAction::SuratDecide,
                json!({
                    "surat_id": decided.id().to_string(),
                    "org_id": decided.org_id().to_string(),
                    "approve": approve,
                }),
                ctx.now,
            ))
            .with_notification(Self::decision_notification(&decided, ctx.now));
        self.persist(&decided, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::SURAT_DECIDED,
            event.entity_type = event::entity_type::SURAT,
            event.entity_id = %decided.id(),
            event.actor_id = %actor,
            event.org_id = %decided.org_id(),
            event.result = event::result::SUCCESS,
            approve,
            "公文書を決裁"
        );

        Ok(decided)
    }

    /// 承認待ちの公文書を差し戻す
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %surat_id))]
    pub async fn revise(
        &self,
        actor: &UserId,
        surat_id: &SuratId,
        note: &str,
    ) -> Result<Surat, CoreError> {
        let surat = self.load(surat_id).await?;
        let expected = surat.status();

        let ctx = self.engine.context(actor).with_note(note);
        let revised = self
            .engine
            .authorize_and_apply(&SuratAccessGuard, surat, SuratOperation::RequestRevision, &ctx)
            .await?;

        let effects = TransitionEffects::new()
            .with_audit(Self::audit(
                &revised,
                actor,
                AuditAction::SuratRevise,
                json!({
                    "surat_id": revised.id().to_string(),
                    "org_id": revised.org_id().to_string(),
                }),
                ctx.now,
            ))
            .with_notification(Self::decision_notification(&revised, ctx.now));
        self.persist(&revised, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::SURAT_REVISED,
            event.entity_type = event::entity_type::SURAT,
            event.entity_id = %revised.id(),
            event.actor_id = %actor,
            event.org_id = %revised.org_id(),
            event.result = event::result::SUCCESS,
            "公文書を差し戻し"
        );

        Ok(revised)
    }

    /// 受信箱（アクセスできる公文書、新しい順）
    ///
    /// ロール割り当てを持たないアクターの受信箱は空になる。
    pub async fn list_inbox(
        &self,
        actor: &UserId,
        status: Option<SuratStatus>,
        page: Page,
    ) -> Result<Paginated<Surat>, CoreError> {
        let scope = self.engine.resolver().access_profile(actor).await?.surat_scope();
        if let SuratScope::Filtered(filter) = &scope
            && filter.is_empty()
        {
            return Ok(Paginated::new(Vec::new(), 0, page));
        }

        Ok(self
            .surat_repo
            .find_inbox(&SuratInboxQuery {
                scope,
                status,
                page,
            })
            .await?)
    }

    /// アーカイブ（決裁・差し戻し済み、新しい順）
    ///
    /// 管理者は全組織、それ以外はスコープを持つ組織が発信元または宛先の公文書。
    pub async fn list_archive(
        &self,
        actor: &UserId,
        page: Page,
    ) -> Result<Paginated<Surat>, CoreError> {
        let profile = self.engine.resolver().access_profile(actor).await?;
        let org_ids = if profile.is_correspondence_admin() {
            None
        } else {
            if profile.org_ids().is_empty() {
                return Ok(Paginated::new(Vec::new(), 0, page));
            }
            Some(profile.org_ids().clone())
        };

        Ok(self
            .surat_repo
            .find_archive(&SuratArchiveQuery { org_ids, page })
            .await?)
    }

    /// 公文書を取得する（決裁と同じアクセス判定）
    pub async fn get(&self, actor: &UserId, surat_id: &SuratId) -> Result<Surat, CoreError> {
        let surat = self.load(surat_id).await?;
        self.engine
            .authorize(&SuratAccessGuard, actor, &surat)
            .await?;
        Ok(surat)
    }
}
