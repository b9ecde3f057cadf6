//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリモックリポジトリ。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! simawa-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 状態を持つモックは `Clone` で内部状態（`Arc<Mutex<_>>`）を共有する。
//! テストではクローンをユースケースに渡し、元のインスタンスで書き込み結果を検証する。
//! 条件付き更新は PostgreSQL 実装と同じく、ステータス（活動はバージョン）の不一致で
//! `Conflict` を返す。

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use simawa_domain::{
    activity::{Activity, ActivityId, ActivityStatus},
    audit_log::AuditLog,
    history::{HistoryEntry, HistorySubject},
    lpj::{Lpj, LpjId, LpjStatus},
    notification::Notification,
    organization::{Organization, OrganizationId},
    reminder::{LPJ_DUE_WINDOW_HOURS, UPCOMING_WINDOW_HOURS},
    role::{RoleAssignment, RoleCode},
    surat::{Surat, SuratId, SuratStatus},
    user::UserId,
    version::Version,
};
use simawa_shared::paginated_response::{Page, Paginated};
use uuid::Uuid;

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    repository::{
        ActivityListQuery,
        ActivityRepository,
        AuditLogRepository,
        HistoryRepository,
        LpjRepository,
        NotificationRepository,
        OrganizationRepository,
        RoleRepository,
        SuratArchiveQuery,
        SuratInboxQuery,
        SuratRepository,
        role_repository::require_prefix,
    },
};

// ===== MockTransactionManager =====

/// 開始・コミットを数えるだけのトランザクションマネージャ
#[derive(Clone, Default)]
pub struct MockTransactionManager {
    begun: Arc<AtomicUsize>,
}

impl MockTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `begin()` が呼ばれた回数
    pub fn begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(TxContext::mock())
    }
}

// ===== MockRoleRepository =====

/// 参照系の失敗の注入方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// `sqlx::Error::RowNotFound` 相当
    NotFound,
    /// その他のインフラ障害
    Unavailable,
}

impl LookupFailure {
    fn to_error(self) -> InfraError {
        match self {
            Self::NotFound => sqlx::Error::RowNotFound.into(),
            Self::Unavailable => InfraError::unexpected("ロールストアに接続できません"),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockRoleRepository {
    assignments: Arc<Mutex<Vec<RoleAssignment>>>,
    failure:     Arc<Mutex<Option<LookupFailure>>>,
}

impl MockRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// トランザクションを介さずに割り当てを追加する（テストの前提データ用）
    pub fn add(&self, assignment: RoleAssignment) {
        let mut assignments = self.assignments.lock().unwrap();
        if !assignments.iter().any(|a| a.same_key(&assignment)) {
            assignments.push(assignment);
        }
    }

    /// 以降の参照系呼び出しを失敗させる
    pub fn fail_lookups(&self, failure: Option<LookupFailure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn assignments(&self) -> Vec<RoleAssignment> {
        self.assignments.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), InfraError> {
        match *self.failure.lock().unwrap() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn any(&self, predicate: impl Fn(&RoleAssignment) -> bool) -> bool {
        self.assignments.lock().unwrap().iter().any(predicate)
    }
}

#[async_trait]
impl RoleRepository for MockRoleRepository {
    async fn assign(
        &self,
        _tx: &mut TxContext,
        assignment: &RoleAssignment,
    ) -> Result<(), InfraError> {
        self.add(assignment.clone());
        Ok(())
    }

    async fn find_assignments_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RoleAssignment>, InfraError> {
        self.check_failure()?;
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn has_role_for_org(
        &self,
        user_id: &UserId,
        role_code: &RoleCode,
        org_id: &OrganizationId,
    ) -> Result<bool, InfraError> {
        self.check_failure()?;
        Ok(self.any(|a| {
            a.user_id() == user_id && a.role_code() == role_code && a.org_id() == Some(org_id)
        }))
    }

    async fn has_any_role_for_org_prefix(
        &self,
        user_id: &UserId,
        org_id: &OrganizationId,
        prefix: &str,
    ) -> Result<bool, InfraError> {
        let prefix = require_prefix(prefix)?;
        self.check_failure()?;
        Ok(self.any(|a| {
            a.user_id() == user_id && a.org_id() == Some(org_id) && a.role_code().has_prefix(prefix)
        }))
    }

    async fn has_any_role_prefix(
        &self,
        user_id: &UserId,
        prefix: &str,
    ) -> Result<bool, InfraError> {
        let prefix = require_prefix(prefix)?;
        self.check_failure()?;
        Ok(self.any(|a| a.user_id() == user_id && a.role_code().has_prefix(prefix)))
    }
}

// ===== MockOrganizationRepository =====

#[derive(Clone, Default)]
pub struct MockOrganizationRepository {
    organizations: Arc<Mutex<Vec<Organization>>>,
}

impl MockOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, organization: Organization) {
        self.organizations.lock().unwrap().push(organization);
    }
}

#[async_trait]
impl OrganizationRepository for MockOrganizationRepository {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, InfraError> {
        Ok(self
            .organizations
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id() == id)
            .cloned())
    }
}

// ===== MockActivityRepository =====

#[derive(Clone, Default)]
pub struct MockActivityRepository {
    activities:    Arc<Mutex<Vec<Activity>>>,
    write_on_load: Arc<Mutex<Option<Activity>>>,
}

impl MockActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, activity: Activity) {
        self.activities.lock().unwrap().push(activity);
    }

    pub fn get(&self, id: &ActivityId) -> Option<Activity> {
        self.activities
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id() == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Activity> {
        self.activities.lock().unwrap().clone()
    }

    /// 次の `find_by_id` が値を返した直後に `activity` で保存済みの行を置き換える
    ///
    /// 読み込みから条件付き更新までの間に、別の書き込みがコミットされた状態を作る。
    pub fn write_after_next_load(&self, activity: Activity) {
        *self.write_on_load.lock().unwrap() = Some(activity);
    }

    fn replace(&self, activity: Activity) {
        let mut activities = self.activities.lock().unwrap();
        match activities.iter_mut().find(|a| a.id() == activity.id()) {
            Some(slot) => *slot = activity,
            None => activities.push(activity),
        }
    }
}

#[async_trait]
impl ActivityRepository for MockActivityRepository {
    async fn insert(&self, _tx: &mut TxContext, activity: &Activity) -> Result<(), InfraError> {
        self.add(activity.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ActivityId) -> Result<Option<Activity>, InfraError> {
        let found = self.get(id);
        if let Some(concurrent) = self.write_on_load.lock().unwrap().take() {
            self.replace(concurrent);
        }
        Ok(found)
    }

    async fn find_by_org(
        &self,
        query: &ActivityListQuery,
    ) -> Result<Paginated<Activity>, InfraError> {
        let mut matched: Vec<Activity> = self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        matched.sort_by_key(Activity::start_at);
        Ok(Paginated::from_all(matched, query.page))
    }

    async fn find_public_from(&self, from: DateTime<Utc>) -> Result<Vec<Activity>, InfraError> {
        let mut matched: Vec<Activity> = self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.is_public() && a.status() == ActivityStatus::Approved && a.start_at() >= from
            })
            .cloned()
            .collect();
        matched.sort_by_key(Activity::start_at);
        Ok(matched)
    }

    async fn update_with_version_check(
        &self,
        _tx: &mut TxContext,
        activity: &Activity,
        expected: Version,
    ) -> Result<(), InfraError> {
        let mut activities = self.activities.lock().unwrap();
        match activities
            .iter_mut()
            .find(|a| a.id() == activity.id() && a.version() == expected)
        {
            Some(slot) => {
                *slot = activity.clone();
                Ok(())
            }
            None => Err(InfraError::conflict("Activity", activity.id().to_string())),
        }
    }

    async fn find_public_for_reminder(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, InfraError> {
        let latest_start = now + Duration::hours(UPCOMING_WINDOW_HOURS);
        let earliest_end = now - Duration::hours(LPJ_DUE_WINDOW_HOURS);
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.is_public()
                    && matches!(
                        a.status(),
                        ActivityStatus::Approved | ActivityStatus::Completed
                    )
                    && a.start_at() <= latest_start
                    && a.end_at() >= earliest_end
            })
            .cloned()
            .collect())
    }

    async fn find_approved_ended_before(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, InfraError> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.status() == ActivityStatus::Approved && a.end_at() < now)
            .cloned()
            .collect())
    }
}

// ===== MockSuratRepository =====

#[derive(Clone, Default)]
pub struct MockSuratRepository {
    surats: Arc<Mutex<Vec<Surat>>>,
}

impl MockSuratRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, surat: Surat) {
        self.surats.lock().unwrap().push(surat);
    }

    pub fn get(&self, id: &SuratId) -> Option<Surat> {
        self.surats
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id() == id)
            .cloned()
    }

    fn newest_first(&self, predicate: impl Fn(&Surat) -> bool) -> Vec<Surat> {
        let mut matched: Vec<Surat> = self
            .surats
            .lock()
            .unwrap()
            .iter()
            .filter(|s| predicate(s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        matched
    }
}

#[async_trait]
impl SuratRepository for MockSuratRepository {
    async fn insert(&self, _tx: &mut TxContext, surat: &Surat) -> Result<(), InfraError> {
        self.add(surat.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SuratId) -> Result<Option<Surat>, InfraError> {
        Ok(self.get(id))
    }

    async fn update_with_status_check(
        &self,
        _tx: &mut TxContext,
        surat: &Surat,
        expected: SuratStatus,
    ) -> Result<(), InfraError> {
        let mut surats = self.surats.lock().unwrap();
        match surats
            .iter_mut()
            .find(|s| s.id() == surat.id() && s.status() == expected)
        {
            Some(slot) => {
                *slot = surat.clone();
                Ok(())
            }
            None => Err(InfraError::conflict("Surat", surat.id().to_string())),
        }
    }

    async fn find_inbox(&self, query: &SuratInboxQuery) -> Result<Paginated<Surat>, InfraError> {
        let matched = self.newest_first(|s| {
            query.scope.permits(s) && query.status.is_none_or(|status| s.status() == status)
        });
        Ok(Paginated::from_all(matched, query.page))
    }

    async fn find_archive(
        &self,
        query: &SuratArchiveQuery,
    ) -> Result<Paginated<Surat>, InfraError> {
        let mut matched = self.newest_first(|s| {
            let participated = match &query.org_ids {
                None => true,
                Some(org_ids) => {
                    org_ids.contains(s.org_id())
                        || s.target_org_id().is_some_and(|t| org_ids.contains(t))
                }
            };
            participated && s.status().is_decided()
        });
        matched.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(Paginated::from_all(matched, query.page))
    }
}

// ===== MockLpjRepository =====

#[derive(Clone, Default)]
pub struct MockLpjRepository {
    lpjs: Arc<Mutex<Vec<Lpj>>>,
}

impl MockLpjRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, lpj: Lpj) {
        self.lpjs.lock().unwrap().push(lpj);
    }

    pub fn get(&self, id: &LpjId) -> Option<Lpj> {
        self.lpjs
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id() == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Lpj> {
        self.lpjs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LpjRepository for MockLpjRepository {
    async fn insert(&self, _tx: &mut TxContext, lpj: &Lpj) -> Result<(), InfraError> {
        self.add(lpj.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &LpjId) -> Result<Option<Lpj>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_activity(&self, activity_id: &ActivityId) -> Result<Option<Lpj>, InfraError> {
        Ok(self
            .lpjs
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.activity_id() == Some(activity_id))
            .cloned())
    }

    async fn find_by_org(
        &self,
        org_id: &OrganizationId,
        status: Option<LpjStatus>,
        page: Page,
    ) -> Result<Paginated<Lpj>, InfraError> {
        let mut matched: Vec<Lpj> = self
            .lpjs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.org_id() == org_id && status.is_none_or(|s| l.status() == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(Paginated::from_all(matched, page))
    }

    async fn update_with_status_check(
        &self,
        _tx: &mut TxContext,
        lpj: &Lpj,
        expected: LpjStatus,
    ) -> Result<(), InfraError> {
        let mut lpjs = self.lpjs.lock().unwrap();
        match lpjs
            .iter_mut()
            .find(|l| l.id() == lpj.id() && l.status() == expected)
        {
            Some(slot) => {
                *slot = lpj.clone();
                Ok(())
            }
            None => Err(InfraError::conflict("Lpj", lpj.id().to_string())),
        }
    }
}

// ===== MockHistoryRepository =====

#[derive(Clone, Default)]
pub struct MockHistoryRepository {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
    fail:    Arc<AtomicBool>,
}

impl MockHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の `insert` を失敗させる
    pub fn fail_inserts(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryRepository for MockHistoryRepository {
    async fn insert(&self, _tx: &mut TxContext, entry: &HistoryEntry) -> Result<(), InfraError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("履歴の書き込みに失敗しました"));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn find_by_subject(
        &self,
        subject: &HistorySubject,
    ) -> Result<Vec<HistoryEntry>, InfraError> {
        let mut entries: Vec<HistoryEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.subject == subject)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }
}

// ===== MockAuditLogRepository =====

#[derive(Clone, Default)]
pub struct MockAuditLogRepository {
    logs: Arc<Mutex<Vec<AuditLog>>>,
    fail: Arc<AtomicBool>,
}

impl MockAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の `record` を失敗させる
    pub fn fail_records(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn logs(&self) -> Vec<AuditLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogRepository for MockAuditLogRepository {
    async fn record(&self, _tx: &mut TxContext, log: &AuditLog) -> Result<(), InfraError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("監査ログの書き込みに失敗しました"));
        }
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &Uuid,
    ) -> Result<Vec<AuditLog>, InfraError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.entity_type == entity_type && &l.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

// ===== MockNotificationRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationRepository {
    notifications: Arc<Mutex<Vec<Notification>>>,
    fail:          Arc<AtomicBool>,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の `insert` を失敗させる
    pub fn fail_inserts(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<(), InfraError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(InfraError::unexpected("通知の保存に失敗しました"));
        }
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn find_by_recipient(
        &self,
        recipient: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, InfraError> {
        let mut found: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| &n.recipient == recipient)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(found)
    }
}
