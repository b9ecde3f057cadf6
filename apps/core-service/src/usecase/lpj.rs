//! # LPJ（活動報告書）ワークフロー
//!
//! 活動終了後に提出する報告書の提出・再提出・審査を扱う。
//!
//! ## ステータス遷移
//!
//! ```text
//!            ┌──approve──▶ APPROVED
//! PENDING ───┼──reject───▶ REJECTED ───────────┐
//!    ▲       └──revision─▶ REVISION_REQUESTED ─┤
//!    └──────────────resubmit───────────────────┘
//! ```
//!
//! 再提出のたびに改訂番号が 1 つ増える。承認済みの LPJ には再提出できない。
//! 審査（承認・却下・差し戻し）は ADMIN / BEM_ADMIN に限る。
//! 組織別一覧は組織を管理できるアクターか審査権限を持つアクターだけが参照できる。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use simawa_domain::{
    activity::ActivityId,
    audit_log::{AuditAction, AuditLog},
    history::{HistoryAction, HistoryEntry, HistorySubject},
    lpj::{Lpj, LpjContent, LpjId, LpjOperation, LpjStatus, NewLpj},
    notification::{Notification, title},
    organization::OrganizationId,
    user::UserId,
    workflow::WorkflowEntity,
};
use simawa_infra::repository::{ActivityRepository, HistoryRepository, LpjRepository};
use simawa_shared::{
    event_log::event,
    log_business_event,
    paginated_response::{Page, Paginated},
};

use super::{
    authorization::ApprovalScope,
    engine::{ApproverGuard, TransitionEffects, TransitionEngine},
    helpers::{FindResultExt, SaveResultExt, require_note},
};
use crate::error::CoreError;

/// LPJ の提出入力
#[derive(Debug, Clone)]
pub struct SubmitLpjInput {
    /// 紐づく活動（任意）。指定した場合は同じ活動の LPJ への再提出になりうる
    pub activity_id: Option<ActivityId>,
    pub org_id:      OrganizationId,
    pub content:     LpjContent,
}

/// LPJ ワークフローのユースケース
pub struct LpjUseCase {
    lpj_repo:      Arc<dyn LpjRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
    history_repo:  Arc<dyn HistoryRepository>,
    engine:        Arc<TransitionEngine>,
}

impl LpjUseCase {
    pub fn new(
        lpj_repo: Arc<dyn LpjRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
        history_repo: Arc<dyn HistoryRepository>,
        engine: Arc<TransitionEngine>,
    ) -> Self {
        Self {
            lpj_repo,
            activity_repo,
            history_repo,
            engine,
        }
    }

    async fn load(&self, lpj_id: &LpjId) -> Result<Lpj, CoreError> {
        self.lpj_repo.find_by_id(lpj_id).await.or_not_found("LPJ")
    }

    async fn persist(
        &self,
        lpj: &Lpj,
        expected: LpjStatus,
        effects: TransitionEffects,
    ) -> Result<(), CoreError> {
        let mut tx = self.engine.begin().await?;
        self.lpj_repo
            .update_with_status_check(&mut tx, lpj, expected)
            .await
            .or_conflict("LPJ")?;
        self.engine.finish(tx, effects).await
    }

    fn history(
        lpj: &Lpj,
        actor: &UserId,
        action: HistoryAction,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> HistoryEntry {
        HistoryEntry::new(
            HistorySubject::Lpj(lpj.id().clone()),
            lpj.org_id().clone(),
            actor.clone(),
            action,
            note,
            now,
        )
    }

    fn audit(
        lpj: &Lpj,
        actor: &UserId,
        action: AuditAction,
        metadata: JsonValue,
        now: DateTime<Utc>,
    ) -> AuditLog {
        AuditLog::new(
            actor.clone(),
            action,
            Lpj::ENTITY_TYPE,
            lpj.entity_uuid(),
            metadata,
            now,
        )
    }

    /// LPJ を提出する
    ///
    /// 活動に紐づく LPJ が既にある場合は再提出として扱う。
    /// 再提出できるのは REJECTED / REVISION_REQUESTED の LPJ だけ。
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, org_id = %input.org_id))]
    pub async fn submit(&self, actor: &UserId, input: SubmitLpjInput) -> Result<Lpj, CoreError> {
        let now = self.engine.now();

        // 1. 入力検証（新規提出として組み立てる）
        let fresh = Lpj::new(NewLpj {
            id: LpjId::new(),
            activity_id: input.activity_id.clone(),
            org_id: input.org_id.clone(),
            content: input.content,
            submitted_by: actor.clone(),
            now,
        })?;

        // 2. 活動と組織の整合性
        if let Some(activity_id) = &input.activity_id {
            let activity = self
                .activity_repo
                .find_by_id(activity_id)
                .await
                .or_not_found("活動")?;
            if activity.org_id() != &input.org_id {
                return Err(CoreError::BadRequest("activity org mismatch".to_string()));
            }
        }

        // 3. 組織の管理権限
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

        // 4. 既存の LPJ があれば再提出
        let existing = match &input.activity_id {
            Some(activity_id) => self.lpj_repo.find_by_activity(activity_id).await?,
            None => None,
        };
        match existing {
            Some(existing) => self.resubmit(actor, existing, fresh.content().clone()).await,
            None => self.submit_fresh(actor, fresh).await,
        }
    }

    async fn submit_fresh(&self, actor: &UserId, lpj: Lpj) -> Result<Lpj, CoreError> {
        let now = lpj.created_at();
        let mut tx = self.engine.begin().await?;
        self.lpj_repo.insert(&mut tx, &lpj).await?;
        let effects = TransitionEffects::new()
            .with_history(Self::history(
                &lpj,
                actor,
                HistoryAction::Submit,
                lpj.content().summary.as_str(),
                now,
            ))
            .with_audit(Self::audit(
                &lpj,
                actor,
                AuditAction::LpjSubmit,
                json!({
                    "lpj_id": lpj.id().to_string(),
                    "org_id": lpj.org_id().to_string(),
                    "activity_id": lpj.activity_id().map(ToString::to_string),
                }),
                now,
            ))
            .with_notification(Notification::new(
                actor.clone(),
                title::LPJ_SUBMITTED,
                lpj.content().summary.as_str(),
                json!({ "lpj_id": lpj.id().to_string() }),
                now,
            ));
        self.engine.finish(tx, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::LPJ_SUBMITTED,
            event.entity_type = event::entity_type::LPJ,
            event.entity_id = %lpj.id(),
            event.actor_id = %actor,
            event.org_id = %lpj.org_id(),
            event.result = event::result::SUCCESS,
            "LPJ を提出"
        );

        Ok(lpj)
    }

    async fn resubmit(
        &self,
        actor: &UserId,
        existing: Lpj,
        content: LpjContent,
    ) -> Result<Lpj, CoreError> {
        let expected = existing.status();
        let ctx = self.engine.context(actor);
        let resubmitted = existing.resubmitted(content, &ctx)?;

        let effects = TransitionEffects::new()
            .with_history(Self::history(
                &resubmitted,
                actor,
                HistoryAction::Resubmit,
                resubmitted.content().summary.as_str(),
                ctx.now,
            ))
            .with_audit(Self::audit(
                &resubmitted,
                actor,
                AuditAction::LpjResubmit,
                json!({
                    "lpj_id": resubmitted.id().to_string(),
                    "org_id": resubmitted.org_id().to_string(),
                    "revision_no": resubmitted.revision_no(),
                }),
                ctx.now,
            ))
            .with_notification(Notification::new(
                actor.clone(),
                title::LPJ_RESUBMITTED,
                resubmitted.content().summary.as_str(),
                json!({ "lpj_id": resubmitted.id().to_string() }),
                ctx.now,
            ));
        self.persist(&resubmitted, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::LPJ_RESUBMITTED,
            event.entity_type = event::entity_type::LPJ,
            event.entity_id = %resubmitted.id(),
            event.actor_id = %actor,
            event.org_id = %resubmitted.org_id(),
            event.result = event::result::SUCCESS,
            revision_no = resubmitted.revision_no(),
            "LPJ を再提出"
        );

        Ok(resubmitted)
    }

    /// 承認待ちの LPJ を承認または却下する
    ///
    /// 却下にはノートが必須。ノートの検証は読み込み・認可より前に行う。
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %lpj_id, approve))]
    pub async fn approve(
        &self,
        actor: &UserId,
        lpj_id: &LpjId,
        approve: bool,
        note: &str,
    ) -> Result<Lpj, CoreError> {
        // 1. 入力検証
        if !approve {
            require_note(note, "note required for reject")?;
        }

        // 2. 読み込み → 認可 → 遷移
        let lpj = self.load(lpj_id).await?;
        let expected = lpj.status();
        let (operation, action) = if approve {
            (LpjOperation::Approve, HistoryAction::Approve)
        } else {
            (LpjOperation::Reject, HistoryAction::Reject)
        };
        let ctx = self.engine.context(actor).with_note(note);
        let decided = self
            .engine
            .authorize_and_apply(&ApproverGuard(ApprovalScope::Lpj), lpj, operation, &ctx)
            .await?;

        // 3. 永続化 → 副作用
        let status: &'static str = decided.status().into();
        let effects = TransitionEffects::new()
            .with_history(Self::history(&decided, actor, action, ctx.note_or_empty(), ctx.now))
            .with_audit(Self::audit(
                &decided,
                actor,
                AuditAction::LpjApprove,
                json!({
                    "lpj_id": decided.id().to_string(),
                    "org_id": decided.org_id().to_string(),
                    "approve": approve,
                }),
                ctx.now,
            ))
            .with_notification(Notification::new(
                decided.submitted_by().clone(),
                title::LPJ_UPDATED,
                status,
                json!({ "lpj_id": decided.id().to_string() }),
                ctx.now,
            ));
        self.persist(&decided, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::LPJ_DECIDED,
            event.entity_type = event::entity_type::LPJ,
            event.entity_id = %decided.id(),
            event.actor_id = %actor,
            event.org_id = %decided.org_id(),
            event.result = event::result::SUCCESS,
            approve,
            "LPJ を審査"
        );

        Ok(decided)
    }

    /// 承認待ちの LPJ に差し戻しを依頼する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %lpj_id))]
    pub async fn add_revision(
        &self,
        actor: &UserId,
        lpj_id: &LpjId,
        note: &str,
    ) -> Result<Lpj, CoreError> {
        require_note(note, "note required")?;

        let lpj = self.load(lpj_id).await?;
        let expected = lpj.status();
        let ctx = self.engine.context(actor).with_note(note);
        let revised = self
            .engine
            .authorize_and_apply(
                &ApproverGuard(ApprovalScope::Lpj),
                lpj,
                LpjOperation::RequestRevision,
                &ctx,
            )
            .await?;

        let effects = TransitionEffects::new()
            .with_history(Self::history(
                &revised,
                actor,
                HistoryAction::RevisionRequested,
                ctx.note_or_empty(),
                ctx.now,
            ))
            .with_audit(Self::audit(
                &revised,
                actor,
                AuditAction::LpjRevisionRequested,
                json!({
                    "lpj_id": revised.id().to_string(),
                    "org_id": revised.org_id().to_string(),
                }),
                ctx.now,
            ))
            .with_notification(Notification::new(
                revised.submitted_by().clone(),
                title::LPJ_REVISION_REQUESTED,
                ctx.note_or_empty(),
                json!({ "lpj_id": revised.id().to_string() }),
                ctx.now,
            ));
        self.persist(&revised, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::LPJ_REVISION_REQUESTED,
            event.entity_type = event::entity_type::LPJ,
            event.entity_id = %revised.id(),
            event.actor_id = %actor,
            event.org_id = %revised.org_id(),
            event.result = event::result::SUCCESS,
            "LPJ の差し戻しを依頼"
        );

        Ok(revised)
    }

    pub async fn get(&self, lpj_id: &LpjId) -> Result<Lpj, CoreError> {
        self.load(lpj_id).await
    }

    /// 組織の LPJ 一覧（新しい順）
    ///
    /// # Errors
    ///
    /// - `CoreError::Forbidden`: 組織を管理できず、審査権限も持たない
    /// - `CoreError::NotFound`: 組織が存在しない
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %org_id))]
    pub async fn list_by_org(
        &self,
        actor: &UserId,
        org_id: &OrganizationId,
        status: Option<LpjStatus>,
        page: Page,
    ) -> Result<Paginated<Lpj>, CoreError> {
        let resolver = self.engine.resolver();
        let allowed = resolver.can_approve_lpj(actor).await?
            || resolver.can_manage_org_id(actor, org_id).await?;
        if !allowed {
            return Err(CoreError::Forbidden(
                "not allowed to view reports of this organization".to_string(),
            ));
        }
        Ok(self.lpj_repo.find_by_org(org_id, status, page).await?)
    }

    /// LPJ の履歴を古い順に返す
    pub async fn list_history(&self, lpj_id: &LpjId) -> Result<Vec<HistoryEntry>, CoreError> {
        let lpj = self.load(lpj_id).await?;
        Ok(self
            .history_repo
            .find_by_subject(&HistorySubject::Lpj(lpj.id().clone()))
            .await?)
    }
}
