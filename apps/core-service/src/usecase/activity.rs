//! # 活動ワークフロー
//!
//! 組織が企画する活動（提案書）の作成から承認、実施完了までを扱う。
//!
//! ## ステータス遷移
//!
//! ```text
//! DRAFT ──submit──▶ PENDING ──approve──▶ APPROVED ──complete──▶ COMPLETED
//!                      └─────reject────▶ REJECTED
//! ```
//!
//! - 提出・完了・ギャラリー操作: 組織を管理できるアクター
//! - 承認・却下: ADMIN / BEM_ADMIN のみ
//! - カバー画像の承認: ADMIN / BEM_ADMIN / DEMA_ADMIN
//! - レビューコメント（REVISION）: ステータスを変えず履歴だけを残す
//! - 組織別一覧: 組織を管理できないアクターには公開の活動だけを返す

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use simawa_domain::{
    activity::{Activity, ActivityId, ActivityOperation, CollabType, NewActivity},
    audit_log::{AuditAction, AuditLog},
    history::{HistoryAction, HistoryEntry, HistorySubject},
    notification::{Notification, title},
    organization::OrganizationId,
    user::UserId,
    version::Version,
    workflow::WorkflowEntity,
};
use simawa_infra::repository::{ActivityListQuery, ActivityRepository, HistoryRepository};
use simawa_shared::{
    event_log::event,
    log_business_event,
    paginated_response::Paginated,
};

use super::{
    authorization::ApprovalScope,
    engine::{
        ApproverGuard,
        ManageOrgGuard,
        SystemGuard,
        TransitionEffects,
        TransitionEngine,
        TransitionGuard,
    },
    helpers::{FindResultExt, SaveResultExt, require_note},
};
use crate::error::CoreError;

/// 活動の作成入力
#[derive(Debug, Clone)]
pub struct CreateActivityInput {
    pub org_id:               OrganizationId,
    pub title:                String,
    pub description:          String,
    pub location:             String,
    pub activity_type:        String,
    pub collab_type:          Option<CollabType>,
    pub collaborator_org_ids: Vec<OrganizationId>,
    pub public:               bool,
    pub start_at:             DateTime<Utc>,
    pub end_at:               DateTime<Utc>,
    pub cover_key:            Option<String>,
    pub proposal_key:         Option<String>,
    pub metadata:             JsonValue,
}

/// 活動ワークフローのユースケース
pub struct ActivityUseCase {
    activity_repo: Arc<dyn ActivityRepository>,
    history_repo:  Arc<dyn HistoryRepository>,
    engine:        Arc<TransitionEngine>,
}

impl ActivityUseCase {
    pub fn new(
        activity_repo: Arc<dyn ActivityRepository>,
        history_repo: Arc<dyn HistoryRepository>,
        engine: Arc<TransitionEngine>,
    ) -> Self {
        Self {
            activity_repo,
            history_repo,
            engine,
        }
    }

    async fn load(&self, activity_id: &ActivityId) -> Result<Activity, CoreError> {
        self.activity_repo
            .find_by_id(activity_id)
            .await
            .or_not_found("活動")
    }

    /// 条件付き更新 → 履歴・監査ログ → コミット → 通知
    ///
    /// `expected` は読み込み時のバージョン。
    async fn persist(
        &self,
        activity: &Activity,
        expected: Version,
        effects: TransitionEffects,
    ) -> Result<(), CoreError> {
        let mut tx = self.engine.begin().await?;
        self.activity_repo
            .update_with_version_check(&mut tx, activity, expected)
            .await
            .or_conflict("活動")?;
        self.engine.finish(tx, effects).await
    }

    fn history(
        activity: &Activity,
        actor: &UserId,
        action: HistoryAction,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> HistoryEntry {
        HistoryEntry::new(
            HistorySubject::Activity(activity.id().clone()),
            activity.org_id().clone(),
            actor.clone(),
            action,
            note,
            now,
        )
    }

    fn audit(
        activity: &Activity,
        actor: &UserId,
        action: AuditAction,
        metadata: JsonValue,
        now: DateTime<Utc>,
    ) -> AuditLog {
        AuditLog::new(
            actor.clone(),
            action,
            Activity::ENTITY_TYPE,
            activity.entity_uuid(),
            metadata,
            now,
        )
    }

    /// 活動を下書きとして作成する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, org_id = %input.org_id))]
    pub async fn create(
        &self,
        actor: &UserId,
        input: CreateActivityInput,
    ) -> Result<Activity, CoreError> {
        // 1. 組織の管理権限
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

        // 2. エンティティ生成（入力検証を含む）
        let now = self.engine.now();
        let activity = Activity::new(NewActivity {
            id: ActivityId::new(),
            org_id: input.org_id,
            title: input.title,
            description: input.description,
            location: input.location,
            activity_type: input.activity_type,
            collab_type: input.collab_type,
            collaborator_org_ids: input.collaborator_org_ids,
            public: input.public,
            start_at: input.start_at,
            end_at: input.end_at,
            cover_key: input.cover_key,
            proposal_key: input.proposal_key,
            metadata: input.metadata,
            created_by: actor.clone(),
            now,
        })?;

        // 3. 保存 → 履歴・監査ログ
        let mut tx = self.engine.begin().await?;
        self.activity_repo.insert(&mut tx, &activity).await?;
        let effects = TransitionEffects::new()
            .with_history(Self::history(&activity, actor, HistoryAction::Create, "", now))
            .with_audit(Self::audit(
                &activity,
                actor,
                AuditAction::ActivityCreate,
                json!({
                    "activity_id": activity.id().to_string(),
                    "org_id": activity.org_id().to_string(),
                }),
                now,
            ));
        self.engine.finish(tx, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_CREATED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %activity.id(),
            event.actor_id = %actor,
            event.org_id = %activity.org_id(),
            event.result = event::result::SUCCESS,
            "活動を作成"
        );

        Ok(activity)
    }

    /// 下書きの活動を提出する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id))]
    pub async fn submit(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
    ) -> Result<Activity, CoreError> {
        // 1. 読み込み
        let activity = self.load(activity_id).await?;
        let expected = activity.version();

        // 2. 認可 → 遷移
        let ctx = self.engine.context(actor);
        let submitted = self
            .engine
            .authorize_and_apply(&ManageOrgGuard, activity, ActivityOperation::Submit, &ctx)
            .await?;

        // 3. 永続化 → 副作用
        let effects = TransitionEffects::new()
            .with_history(Self::history(&submitted, actor, HistoryAction::Submit, "", ctx.now))
            .with_audit(Self::audit(
                &submitted,
                actor,
                AuditAction::ActivitySubmit,
                json!({
                    "activity_id": submitted.id().to_string(),
                    "org_id": submitted.org_id().to_string(),
                }),
                ctx.now,
            ))
            .with_notification(Notification::new(
                actor.clone(),
                title::PROPOSAL_SUBMITTED,
                submitted.title(),
                json!({ "activity_id": submitted.id().to_string() }),
                ctx.now,
            ));
        self.persist(&submitted, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_SUBMITTED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %submitted.id(),
            event.actor_id = %actor,
            event.org_id = %submitted.org_id(),
            event.result = event::result::SUCCESS,
            "活動を提出"
        );

        Ok(submitted)
    }

    /// 承認待ちの活動を承認または却下する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id, approve))]
    pub async fn approve(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
        approve: bool,
        note: &str,
    ) -> Result<Activity, CoreError> {
        let activity = self.load(activity_id).await?;
        let expected = activity.version();

        let (operation, action) = if approve {
            (ActivityOperation::Approve, HistoryAction::Approve)
        } else {
            (ActivityOperation::Reject, HistoryAction::Reject)
        };
        let ctx = self.engine.context(actor).with_note(note);
        let decided = self
            .engine
            .authorize_and_apply(&ApproverGuard(ApprovalScope::Activity), activity, operation, &ctx)
            .await?;

        let status: &'static str = decided.status().into();
        let effects = TransitionEffects::new()
            .with_history(Self::history(&decided, actor, action, ctx.note_or_empty(), ctx.now))
            .with_audit(Self::audit(
                &decided,
                actor,
                AuditAction::ActivityApprove,
                json!({
                    "activity_id": decided.id().to_string(),
                    "org_id": decided.org_id().to_string(),
                    "approve": approve,
                }),
                ctx.now,
            ))
            .with_notification(Notification::new(
                decided.created_by().clone(),
                title::PROPOSAL_UPDATED,
                status,
                json!({ "activity_id": decided.id().to_string() }),
                ctx.now,
            ));
        self.persist(&decided, expected, effects).await?;

        let event_action = if approve {
            event::action::ACTIVITY_APPROVED
        } else {
            event::action::ACTIVITY_REJECTED
        };
        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event_action,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %decided.id(),
            event.actor_id = %actor,
            event.org_id = %decided.org_id(),
            event.result = event::result::SUCCESS,
            "活動を決裁"
        );

        Ok(decided)
    }

    /// レビューコメントを履歴に残す（ステータスは変えない）
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id))]
    pub async fn add_revision(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
        note: &str,
    ) -> Result<(), CoreError> {
        // 1. 入力検証（読み込みより前）
        require_note(note, "note required")?;

        // 2. 読み込み → 認可
        let activity = self.load(activity_id).await?;
        self.engine
            .authorize(&ManageOrgGuard, actor, &activity)
            .await?;

        // 3. 履歴のみ
        let tx = self.engine.begin().await?;
        let effects = TransitionEffects::new().with_history(Self::history(
            &activity,
            actor,
            HistoryAction::Revision,
            note.trim(),
            self.engine.now(),
        ));
        self.engine.finish(tx, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_REVISED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %activity.id(),
            event.actor_id = %actor,
            event.org_id = %activity.org_id(),
            event.result = event::result::SUCCESS,
            "活動にレビューコメントを追加"
        );

        Ok(())
    }

    async fn complete_with(
        &self,
        guard: &dyn TransitionGuard<Activity>,
        actor: &UserId,
        activity_id: &ActivityId,
    ) -> Result<Activity, CoreError> {
        let activity = self.load(activity_id).await?;
        let expected = activity.version();

        let ctx = self.engine.context(actor);
        let completed = self
            .engine
            .authorize_and_apply(guard, activity, ActivityOperation::Complete, &ctx)
            .await?;

        let effects = TransitionEffects::new()
            .with_history(Self::history(&completed, actor, HistoryAction::Complete, "", ctx.now))
            .with_audit(Self::audit(
                &completed,
                actor,
                AuditAction::ActivityComplete,
                json!({
                    "activity_id": completed.id().to_string(),
                    "org_id": completed.org_id().to_string(),
                }),
                ctx.now,
            ));
        self.persist(&completed, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_COMPLETED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %completed.id(),
            event.actor_id = %actor,
            event.org_id = %completed.org_id(),
            event.result = event::result::SUCCESS,
            "活動を完了"
        );

        Ok(completed)
    }

    /// 承認済みの活動を完了にする（組織の管理者による操作）
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id))]
    pub async fn mark_completed(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
    ) -> Result<Activity, CoreError> {
        self.complete_with(&ManageOrgGuard, actor, activity_id)
            .await
    }

    /// 承認済みの活動を定期処理のアクターで完了にする
    #[tracing::instrument(skip_all, level = "debug", fields(%activity_id))]
    pub async fn complete_as_system(&self, activity_id: &ActivityId) -> Result<Activity, CoreError> {
        self.complete_with(&SystemGuard, &UserId::system(), activity_id)
            .await
    }

    /// ギャラリーに写真を追加する
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id))]
    pub async fn add_gallery_photo(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
        url: &str,
    ) -> Result<Activity, CoreError> {
        if url.trim().is_empty() {
            return Err(CoreError::BadRequest("url required".to_string()));
        }

        let activity = self.load(activity_id).await?;
        self.engine
            .authorize(&ManageOrgGuard, actor, &activity)
            .await?;

        let expected = activity.version();
        let now = self.engine.now();
        let updated = activity.with_gallery_photo_added(url, actor.clone(), now)?;

        let effects = TransitionEffects::new().with_history(Self::history(
            &updated,
            actor,
            HistoryAction::AddPhoto,
            url,
            now,
        ));
        self.persist(&updated, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_GALLERY_UPDATED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %updated.id(),
            event.actor_id = %actor,
            event.org_id = %updated.org_id(),
            event.result = event::result::SUCCESS,
            "ギャラリーに写真を追加"
        );

        Ok(updated)
    }

    /// ギャラリーから写真を取り除く
    ///
    /// 存在しない URL の指定は何もしない（エラーにしない）。
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id))]
    pub async fn remove_gallery_photo(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
        url: &str,
    ) -> Result<Activity, CoreError> {
        let activity = self.load(activity_id).await?;
        self.engine
            .authorize(&ManageOrgGuard, actor, &activity)
            .await?;

        let now = self.engine.now();
        let Some(updated) = activity.with_gallery_photo_removed(url, actor.clone(), now) else {
            tracing::debug!(url, "ギャラリーに存在しない写真のため何もしない");
            return Ok(activity);
        };

        let effects = TransitionEffects::new().with_history(Self::history(
            &updated,
            actor,
            HistoryAction::RemovePhoto,
            url,
            now,
        ));
        self.persist(&updated, activity.version(), effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_GALLERY_UPDATED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %updated.id(),
            event.actor_id = %actor,
            event.org_id = %updated.org_id(),
            event.result = event::result::SUCCESS,
            "ギャラリーから写真を削除"
        );

        Ok(updated)
    }

    /// カバー画像を承認または取り消す
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, %activity_id, approved))]
    pub async fn approve_cover(
        &self,
        actor: &UserId,
        activity_id: &ActivityId,
        approved: bool,
    ) -> Result<Activity, CoreError> {
        let activity = self.load(activity_id).await?;
        self.engine
            .authorize(&ApproverGuard(ApprovalScope::Cover), actor, &activity)
            .await?;
        if activity.cover_key().is_none_or(|key| key.trim().is_empty()) {
            return Err(CoreError::BadRequest("cover not uploaded".to_string()));
        }

        let expected = activity.version();
        let now = self.engine.now();
        let updated = activity.with_cover_approval(approved, actor.clone(), now);

        let body = if approved {
            "Cover disetujui"
        } else {
            "Cover ditolak"
        };
        let effects = TransitionEffects::new()
            .with_history(Self::history(
                &updated,
                actor,
                HistoryAction::CoverApprove,
                if approved { "approved" } else { "rejected" },
                now,
            ))
            .with_audit(Self::audit(
                &updated,
                actor,
                AuditAction::ActivityCoverApprove,
                json!({
                    "activity_id": updated.id().to_string(),
                    "org_id": updated.org_id().to_string(),
                    "approved": approved,
                }),
                now,
            ))
            .with_notification(Notification::new(
                updated.created_by().clone(),
                title::COVER_UPDATED,
                body,
                json!({ "activity_id": updated.id().to_string() }),
                now,
            ));
        self.persist(&updated, expected, effects).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::ACTIVITY_COVER_DECIDED,
            event.entity_type = event::entity_type::ACTIVITY,
            event.entity_id = %updated.id(),
            event.actor_id = %actor,
            event.org_id = %updated.org_id(),
            event.result = event::result::SUCCESS,
            "カバー画像を決裁"
        );

        Ok(updated)
    }

    pub async fn get(&self, activity_id: &ActivityId) -> Result<Activity, CoreError> {
        self.load(activity_id).await
    }

    /// 組織の活動一覧（開始日時の昇順）
    ///
    /// 組織を管理できないアクターには `public_only` を強制する。
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound`: 組織が存在しない
    #[tracing::instrument(skip_all, level = "debug", fields(%actor, org_id = %query.org_id))]
    pub async fn list_by_org(
        &self,
        actor: &UserId,
        mut query: ActivityListQuery,
    ) -> Result<Paginated<Activity>, CoreError> {
        if !self
            .engine
            .resolver()
            .can_manage_org_id(actor, &query.org_id)
            .await?
        {
            query.public_only = true;
        }
        Ok(self.activity_repo.find_by_org(&query).await?)
    }

    /// `from` 以降に開始する公開・承認済みの活動（開始日時の昇順）
    pub async fn list_public(&self, from: DateTime<Utc>) -> Result<Vec<Activity>, CoreError> {
        Ok(self.activity_repo.find_public_from(from).await?)
    }

    /// 活動の履歴を古い順に返す
    pub async fn list_history(&self, activity_id: &ActivityId) -> Result<Vec<HistoryEntry>, CoreError> {
        let activity = self.load(activity_id).await?;
        Ok(self
            .history_repo
            .find_by_subject(&HistorySubject::Activity(activity.id().clone()))
            .await?)
    }
}
