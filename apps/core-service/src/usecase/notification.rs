//! # 通知サービス
//!
//! ワークフロー操作とリマインダーに伴うアプリ内通知を保存する。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: `notify()` は保存に失敗してもエラーを返さない
//! - **コミット後に呼ぶ**: 遷移の永続化・履歴・監査ログが確定した後にだけ送る
//! - **依存性注入**: 保存先は `NotificationRepository` trait で抽象化

use std::sync::Arc;

use simawa_domain::{notification::Notification, user::UserId};
use simawa_infra::repository::NotificationRepository;
use simawa_shared::{
    event_log::{error as error_ctx, event},
    log_business_event,
};

use crate::error::CoreError;

/// 一覧取得の上限
const MAX_LIST_LIMIT: i64 = 100;

/// 通知サービス
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// 通知を保存する（fire-and-forget）
    ///
    /// 保存できた場合は `true`。タイトルが空の通知は送らずに `false` を返す。
    /// 保存の失敗はログに残すだけで呼び出し元には伝えない。
    pub async fn notify(&self, notification: Notification) -> bool {
        if notification.title.trim().is_empty() {
            tracing::debug!(recipient = %notification.recipient, "タイトルが空の通知をスキップ");
            return false;
        }

        match self.repo.insert(&notification).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.entity_type = event::entity_type::NOTIFICATION,
                    event.entity_id = %notification.id,
                    event.result = event::result::SUCCESS,
                    notification.recipient = %notification.recipient,
                    notification.title = %notification.title,
                    "通知を保存"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    error.category = error_ctx::category::INFRASTRUCTURE,
                    error.kind = error_ctx::kind::NOTIFICATION_DELIVERY,
                    "通知の保存に失敗: {}",
                    e
                );
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::NOTIFICATION,
                    event.entity_id = %notification.id,
                    event.result = event::result::FAILURE,
                    notification.recipient = %notification.recipient,
                    notification.title = %notification.title,
                    "通知の保存に失敗"
                );
                false
            }
        }
    }

    /// 受信者の通知を新しい順に取得する
    pub async fn list_for_recipient(
        &self,
        recipient: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, CoreError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        Ok(self.repo.find_by_recipient(recipient, limit).await?)
    }
}
