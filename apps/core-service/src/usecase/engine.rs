//! # ガード付き状態遷移エンジン
//!
//! Activity / Surat / LPJ の遷移を同じ順序で実行するための共通部品。
//!
//! ## 実行順序
//!
//! 1. エンティティの読み込み（各ワークフロー）
//! 2. 認可（[`TransitionGuard`]）
//! 3. 遷移表による遷移元ステータスの検査
//! 4. 新しいステータスをメモリ上で適用
//! 5. 条件付き更新（各ワークフロー、トランザクション内）
//! 6. 履歴・監査ログの書き込み → コミット
//! 7. 通知（コミット後、失敗しても呼び出し元に返さない）
//!
//! 2〜4 は [`TransitionEngine::authorize_and_apply`]、6〜7 は
//! [`TransitionEngine::finish`] が担う。4 までに失敗した場合は何も書き込まない。
//! 6 で失敗した場合はトランザクションがドロップされ、5 の更新もロールバックされる。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simawa_domain::{
    audit_log::AuditLog,
    clock::Clock,
    history::HistoryEntry,
    notification::Notification,
    surat::Surat,
    user::UserId,
    workflow::{TransitionContext, WorkflowEntity},
};
use simawa_infra::{
    TransactionManager,
    TxContext,
    repository::{AuditLogRepository, HistoryRepository},
};

use super::{
    authorization::{ApprovalScope, AuthorizationResolver},
    notification::NotificationService,
};
use crate::error::CoreError;

/// 遷移前に差し込む認可戦略
#[async_trait]
pub trait TransitionGuard<E: Sync>: Send + Sync {
    async fn permits(
        &self,
        resolver: &AuthorizationResolver,
        actor: &UserId,
        entity: &E,
    ) -> Result<bool, CoreError>;

    /// 拒否したときに返す理由
    fn denial(&self) -> &'static str;
}

/// 所有組織を管理できるアクターだけを通す
pub struct ManageOrgGuard;

#[async_trait]
impl<E: WorkflowEntity + 'static> TransitionGuard<E> for ManageOrgGuard {
    async fn permits(
        &self,
        resolver: &AuthorizationResolver,
        actor: &UserId,
        entity: &E,
    ) -> Result<bool, CoreError> {
        resolver.can_manage_org_id(actor, entity.organization_id()).await
    }

    fn denial(&self) -> &'static str {
        "not allowed to manage this organization"
    }
}

/// 承認権限を持つアクターだけを通す
///
/// 組織管理より厳しい。DEMA_ADMIN は活動と LPJ の承認から外れる。
pub struct ApproverGuard(pub ApprovalScope);

#[async_trait]
impl<E: Sync + 'static> TransitionGuard<E> for ApproverGuard {
    async fn permits(
        &self,
        resolver: &AuthorizationResolver,
        actor: &UserId,
        _entity: &E,
    ) -> Result<bool, CoreError> {
        resolver.can_approve(self.0, actor).await
    }

    fn denial(&self) -> &'static str {
        match self.0 {
            ApprovalScope::Activity => "not allowed to approve activity",
            ApprovalScope::Lpj => "not allowed to approve lpj",
            ApprovalScope::Cover => "not allowed to approve cover",
        }
    }
}

/// 公文書の宛先・発信元として扱えるアクターだけを通す
///
/// 受信箱の絞り込みと同じ述語を使う。
pub struct SuratAccessGuard;

#[async_trait]
impl TransitionGuard<Surat> for SuratAccessGuard {
    async fn permits(
        &self,
        resolver: &AuthorizationResolver,
        actor: &UserId,
        entity: &Surat,
    ) -> Result<bool, CoreError> {
        resolver.can_access_surat(actor, entity).await
    }

    fn denial(&self) -> &'static str {
        "not allowed to access this surat"
    }
}

/// 定期処理のアクターだけを通す
pub struct SystemGuard;

#[async_trait]
impl<E: Sync + 'static> TransitionGuard<E> for SystemGuard {
    async fn permits(
        &self,
        _resolver: &AuthorizationResolver,
        actor: &UserId,
        _entity: &E,
    ) -> Result<bool, CoreError> {
        Ok(actor.is_system())
    }

    fn denial(&self) -> &'static str {
        "system actor required"
    }
}

/// 遷移の永続化に続けて書き込む副作用
#[derive(Debug, Default)]
pub struct TransitionEffects {
    history:       Option<HistoryEntry>,
    audit:         Option<AuditLog>,
    notifications: Vec<Notification>,
}

impl TransitionEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, entry: HistoryEntry) -> Self {
        self.history = Some(entry);
        self
    }

    pub fn with_audit(mut self, log: AuditLog) -> Self {
        self.audit = Some(log);
        self
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }
}

/// ガード付き状態遷移エンジン
pub struct TransitionEngine {
    resolver:     Arc<AuthorizationResolver>,
    tx_manager:   Arc<dyn TransactionManager>,
    history_repo: Arc<dyn HistoryRepository>,
    audit_repo:   Arc<dyn AuditLogRepository>,
    notifier:     Arc<NotificationService>,
    clock:        Arc<dyn Clock>,
}

impl TransitionEngine {
    pub fn new(
        resolver: Arc<AuthorizationResolver>,
        tx_manager: Arc<dyn TransactionManager>,
        history_repo: Arc<dyn HistoryRepository>,
        audit_repo: Arc<dyn AuditLogRepository>,
        notifier: Arc<NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            tx_manager,
            history_repo,
            audit_repo,
            notifier,
            clock,
        }
    }

    pub fn resolver(&self) -> &AuthorizationResolver {
        &self.resolver
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 遷移コンテキストを現在時刻で作成する
    pub fn context(&self, actor: &UserId) -> TransitionContext {
        TransitionContext::new(actor.clone(), self.now())
    }

    /// ガードを評価し、拒否された場合は `CoreError::Forbidden` を返す
    pub async fn authorize<E: Sync>(
        &self,
        guard: &dyn TransitionGuard<E>,
        actor: &UserId,
        entity: &E,
    ) -> Result<(), CoreError> {
        if guard.permits(&self.resolver, actor, entity).await? {
            Ok(())
        } else {
            Err(CoreError::Forbidden(guard.denial().to_string()))
        }
    }

    /// 認可 → 遷移元の検査 → メモリ上での適用
    ///
    /// 永続化は行わない。ここで失敗した場合、保存済みのデータは変わらない。
    pub async fn authorize_and_apply<E: WorkflowEntity>(
        &self,
        guard: &dyn TransitionGuard<E>,
        entity: E,
        operation: E::Operation,
        ctx: &TransitionContext,
    ) -> Result<E, CoreError> {
        self.authorize(guard, &ctx.actor, &entity).await?;
        Ok(entity.transitioned(operation, ctx)?)
    }

    pub async fn begin(&self) -> Result<TxContext, CoreError> {
        Ok(self.tx_manager.begin().await?)
    }

    /// 履歴 → 監査ログ → コミット → 通知
    ///
    /// 履歴と監査ログの失敗はそのまま返し、トランザクションはロールバックされる。
    /// 通知はコミット後に送り、失敗しても `Ok` を返す。
    pub async fn finish(
        &self,
        mut tx: TxContext,
        effects: TransitionEffects,
    ) -> Result<(), CoreError> {
        let TransitionEffects {
            history,
            audit,
            notifications,
        } = effects;

        if let Some(entry) = &history {
            self.history_repo.insert(&mut tx, entry).await?;
        }
        if let Some(log) = &audit {
            self.audit_repo.record(&mut tx, log).await?;
        }
        tx.commit().await?;

        for notification in notifications {
            self.notifier.notify(notification).await;
        }
        Ok(())
    }
}
