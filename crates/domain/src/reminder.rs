//! # 活動リマインダーの判定
//!
//! 定期処理が活動ごとに送るべき通知と、完了への自動遷移の対象を判定する。
//!
//! | 種別 | 条件 |
//! |------|------|
//! | `Upcoming72h` | 開始まで 0〜72 時間 |
//! | `Upcoming24h` | 開始まで 0〜24 時間 |
//! | `LpjDue` | 終了から 24 時間以内（終了時刻ちょうどは含まない） |
//!
//! 72 時間と 24 時間の条件は重複して成立しうる。
//! 重複実行による二重送信は許容し、ここでは抑止しない。

use chrono::{DateTime, Duration, Utc};

use crate::{
    activity::{Activity, ActivityStatus},
    notification::title,
};

/// 72 時間前リマインダーの閾値
pub const UPCOMING_WINDOW_HOURS: i64 = 72;
/// 前日リマインダーの閾値
pub const UPCOMING_H1_WINDOW_HOURS: i64 = 24;
/// LPJ 提出リマインダーの閾値
pub const LPJ_DUE_WINDOW_HOURS: i64 = 24;

/// リマインダー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReminderKind {
    Upcoming72h,
    Upcoming24h,
    LpjDue,
}

impl ReminderKind {
    /// 通知タイトル
    pub fn title(self) -> &'static str {
        match self {
            Self::Upcoming72h => title::ACTIVITY_REMINDER,
            Self::Upcoming24h => title::ACTIVITY_REMINDER_H1,
            Self::LpjDue => title::LPJ_DUE,
        }
    }

    /// 通知本文
    pub fn body(self, activity: &Activity) -> String {
        match self {
            Self::Upcoming72h => format!("Kegiatan \"{}\" akan dimulai dalam 3 hari", activity.title()),
            Self::Upcoming24h => format!("Kegiatan \"{}\" akan dimulai besok", activity.title()),
            Self::LpjDue => format!("Segera kirim LPJ untuk kegiatan \"{}\"", activity.title()),
        }
    }
}

/// リマインダーの対象になりうる活動か
///
/// 公開かつ承認済み（または完了済み）の活動だけが対象。
pub fn is_reminder_candidate(activity: &Activity) -> bool {
    activity.is_public()
        && matches!(
            activity.status(),
            ActivityStatus::Approved | ActivityStatus::Completed
        )
}

/// 活動に対して現時点で送るべきリマインダーを返す
pub fn reminders_for(activity: &Activity, now: DateTime<Utc>) -> Vec<ReminderKind> {
    if !is_reminder_candidate(activity) {
        return Vec::new();
    }

    let mut kinds = Vec::new();

    let until_start = activity.start_at() - now;
    if until_start >= Duration::zero() {
        if until_start <= Duration::hours(UPCOMING_WINDOW_HOURS) {
            kinds.push(ReminderKind::Upcoming72h);
        }
        if until_start <= Duration::hours(UPCOMING_H1_WINDOW_HOURS) {
            kinds.push(ReminderKind::Upcoming24h);
        }
    }

    let since_end = now - activity.end_at();
    if since_end > Duration::zero() && since_end <= Duration::hours(LPJ_DUE_WINDOW_HOURS) {
        kinds.push(ReminderKind::LpjDue);
    }

    kinds
}

/// 完了への自動遷移の対象か
pub fn is_due_for_completion(activity: &Activity, now: DateTime<Utc>) -> bool {
    activity.status() == ActivityStatus::Approved && activity.end_at() < now
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::{
        activity::{ActivityId, ActivityRecord, CollabType},
        organization::OrganizationId,
        user::UserId,
        version::Version,
    };

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn activity(
        status: ActivityStatus,
        public: bool,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Activity {
        let user = UserId::new();
        Activity::from_db(ActivityRecord {
            id: ActivityId::new(),
            org_id: OrganizationId::new(),
            title: "Seminar Nasional".to_string(),
            description: String::new(),
            location: "Aula".to_string(),
            activity_type: "SEMINAR".to_string(),
            collab_type: CollabType::Internal,
            collaborator_org_ids: Vec::new(),
            public,
            status,
            version: Version::initial(),
            approval_note: None,
            start_at,
            end_at,
            cover_key: None,
            cover_approved: false,
            proposal_key: None,
            gallery_urls: Vec::new(),
            metadata: json!({}),
            created_by: user.clone(),
            updated_by: user,
            created_at: start_at - Duration::days(30),
            updated_at: start_at - Duration::days(30),
        })
    }

    #[rstest]
    #[case(Duration::hours(100), vec![])]
    #[case(Duration::hours(72), vec![ReminderKind::Upcoming72h])]
    #[case(Duration::hours(48), vec![ReminderKind::Upcoming72h])]
    #[case(Duration::hours(24), vec![ReminderKind::Upcoming72h, ReminderKind::Upcoming24h])]
    #[case(Duration::zero(), vec![ReminderKind::Upcoming72h, ReminderKind::Upcoming24h])]
    fn test_開始前のリマインダーは閾値ごとに判定される(
        now: DateTime<Utc>,
        #[case] until_start: Duration,
        #[case] expected: Vec<ReminderKind>,
    ) {
        let start = now + until_start;
        let sut = activity(ActivityStatus::Approved, true, start, start + Duration::hours(3));

        assert_eq!(reminders_for(&sut, now), expected);
    }

    #[rstest]
    #[case(Duration::zero(), vec![])]
    #[case(Duration::hours(1), vec![ReminderKind::LpjDue])]
    #[case(Duration::hours(24), vec![ReminderKind::LpjDue])]
    #[case(Duration::hours(25), vec![])]
    fn test_終了後24時間以内はlpj提出リマインダーになる(
        now: DateTime<Utc>,
        #[case] since_end: Duration,
        #[case] expected: Vec<ReminderKind>,
    ) {
        let end = now - since_end;
        let sut = activity(ActivityStatus::Completed, true, end - Duration::hours(3), end);

        assert_eq!(reminders_for(&sut, now), expected);
    }

    #[rstest]
    #[case(ActivityStatus::Draft, true)]
    #[case(ActivityStatus::Pending, true)]
    #[case(ActivityStatus::Rejected, true)]
    #[case(ActivityStatus::Approved, false)]
    fn test_非公開または未承認の活動にはリマインダーを送らない(
        now: DateTime<Utc>,
        #[case] status: ActivityStatus,
        #[case] public: bool,
    ) {
        let start = now + Duration::hours(12);
        let sut = activity(status, public, start, start + Duration::hours(3));

        assert!(reminders_for(&sut, now).is_empty());
    }

    #[rstest]
    fn test_終了済みの承認済み活動は完了対象になる(now: DateTime<Utc>) {
        let ended = activity(
            ActivityStatus::Approved,
            false,
            now - Duration::hours(5),
            now - Duration::hours(1),
        );
        let running = activity(
            ActivityStatus::Approved,
            false,
            now - Duration::hours(1),
            now + Duration::hours(1),
        );
        let completed = activity(
            ActivityStatus::Completed,
            false,
            now - Duration::hours(5),
            now - Duration::hours(1),
        );

        assert!(is_due_for_completion(&ended, now));
        assert!(!is_due_for_completion(&running, now));
        assert!(!is_due_for_completion(&completed, now));
    }
}
