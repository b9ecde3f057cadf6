//! # 活動リマインダーと完了スイープ
//!
//! 一定間隔で次の 2 つを行う定期処理。
//!
//! 1. 公開・承認済みの活動について、開始 72 時間前 / 24 時間前と
//!    終了後 24 時間以内（LPJ 提出）のリマインダーを作成者へ送る
//! 2. 終了時刻を過ぎた APPROVED の活動を、システムアクターで COMPLETED にする
//!
//! 実行が重なった場合の重複送信は抑止しない。
//! 完了への遷移が他の書き込みと競合した場合はその活動を飛ばして続行する。

use std::{sync::Arc, time::Duration};

use itertools::Itertools;
use serde_json::json;
use simawa_domain::{
    clock::Clock,
    notification::Notification,
    reminder::{is_due_for_completion, reminders_for},
};
use simawa_infra::repository::ActivityRepository;
use simawa_shared::{
    event_log::{error as error_ctx, event},
    log_business_event,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::{activity::ActivityUseCase, notification::NotificationService};
use crate::error::CoreError;

/// 1 回のスイープの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 保存できたリマインダー通知の数
    pub reminders_sent: usize,
    /// COMPLETED にした活動の数
    pub completed:      usize,
    /// 完了にできず飛ばした活動の数
    pub skipped:        usize,
}

/// リマインダーと完了のスイープ
pub struct ReminderSweep {
    activity_repo: Arc<dyn ActivityRepository>,
    activities:    Arc<ActivityUseCase>,
    notifier:      Arc<NotificationService>,
    clock:         Arc<dyn Clock>,
}

impl ReminderSweep {
    pub fn new(
        activity_repo: Arc<dyn ActivityRepository>,
        activities: Arc<ActivityUseCase>,
        notifier: Arc<NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            activity_repo,
            activities,
            notifier,
            clock,
        }
    }

    /// スイープを 1 回実行する
    ///
    /// # Errors
    ///
    /// 候補の取得に失敗した場合だけエラーを返す。
    /// 個々の通知や完了遷移の失敗はログに残して続行する。
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn run_once(&self) -> Result<SweepReport, CoreError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        // 1. リマインダー
        let candidates = self.activity_repo.find_public_for_reminder(now).await?;
        let reminders = candidates
            .iter()
            .flat_map(|activity| {
                reminders_for(activity, now).into_iter().map(move |kind| {
                    let kind_name: &'static str = kind.into();
                    Notification::new(
                        activity.created_by().clone(),
                        kind.title(),
                        kind.body(activity),
                        json!({
                            "activity_id": activity.id().to_string(),
                            "kind": kind_name,
                        }),
                        now,
                    )
                })
            })
            .collect_vec();
        for reminder in reminders {
            if self.notifier.notify(reminder).await {
                report.reminders_sent += 1;
            }
        }

        // 2. 終了した活動の完了
        // クエリの抽出条件をドメインの完了規則で再確認する
        let due = self
            .activity_repo
            .find_approved_ended_before(now)
            .await?
            .into_iter()
            .filter(|activity| is_due_for_completion(activity, now));
        for activity in due {
            match self.activities.complete_as_system(activity.id()).await {
                Ok(_) => report.completed += 1,
                Err(e @ (CoreError::Conflict(_) | CoreError::InvalidTransition(_))) => {
                    tracing::warn!(
                        error.category = error_ctx::category::WORKFLOW,
                        error.kind = error_ctx::kind::CONCURRENT_UPDATE,
                        activity_id = %activity.id(),
                        "活動の完了を別の更新が先行したためスキップ: {}",
                        e
                    );
                    report.skipped += 1;
                }
                Err(CoreError::Database(e)) => {
                    tracing::error!(
                        error.category = error_ctx::category::INFRASTRUCTURE,
                        error.kind = error_ctx::kind::DATABASE,
                        activity_id = %activity.id(),
                        span_trace = %e.span_trace(),
                        "活動の完了に失敗: {}",
                        e
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        error.category = error_ctx::category::WORKFLOW,
                        error.kind = error_ctx::kind::INTERNAL,
                        activity_id = %activity.id(),
                        "活動の完了に失敗: {}",
                        e
                    );
                    report.skipped += 1;
                }
            }
        }

        log_business_event!(
            event.category = event::category::REMINDER,
            event.action = event::action::REMINDER_SWEEP_FINISHED,
            event.result = event::result::SUCCESS,
            reminders_sent = report.reminders_sent,
            completed = report.completed,
            skipped = report.skipped,
            "リマインダー処理が完了"
        );

        Ok(report)
    }
}

/// スイープを一定間隔で実行するタスクを起動する
///
/// 最初の実行は起動直後。処理が間隔を超えた場合、溜まった分は実行せずに次の間隔を待つ。
pub fn spawn_reminder_worker(sweep: Arc<ReminderSweep>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep.run_once().await {
                tracing::error!(
                    error.category = error_ctx::category::INFRASTRUCTURE,
                    error.kind = error_ctx::kind::DATABASE,
                    "リマインダー処理に失敗: {}",
                    e
                );
            }
        }
    })
}
