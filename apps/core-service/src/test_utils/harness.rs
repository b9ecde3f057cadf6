//! ユースケーステスト用のハーネス
//!
//! すべてのモックリポジトリとユースケースを固定時刻で組み立てる。
//! モックは `Clone` で状態を共有するため、ユースケースに渡したものと同じ状態を
//! ハーネスのフィールドから検証できる。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use simawa_domain::{
    activity::{Activity, ActivityId, ActivityRecord, ActivityStatus, CollabType},
    clock::{Clock, FixedClock},
    lpj::{Lpj, LpjContent, LpjId, LpjRecord, LpjStatus},
    organization::{Organization, OrganizationId, OrganizationType},
    role::{RoleAssignment, RoleCode},
    surat::{Surat, SuratId, SuratRecord, SuratStatus, SuratVariant},
    user::UserId,
    version::Version,
};
use simawa_infra::mock::{
    MockActivityRepository,
    MockAuditLogRepository,
    MockHistoryRepository,
    MockLpjRepository,
    MockNotificationRepository,
    MockOrganizationRepository,
    MockRoleRepository,
    MockSuratRepository,
    MockTransactionManager,
};

use crate::usecase::{
    ActivityUseCase,
    AuthorizationResolver,
    CreateActivityInput,
    LpjUseCase,
    NotificationService,
    ReminderSweep,
    RoleUseCase,
    SubmitLpjInput,
    SuratUseCase,
    TransitionEngine,
};

/// ハーネスの既定時刻（2023-11-14T22:13:20Z）
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// 書き込み結果の件数スナップショット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub history:       usize,
    pub audit:         usize,
    pub notifications: usize,
}

/// モックとユースケース一式
///
/// # 使用例
///
/// ```ignore
/// use simawa_core_service::test_utils::TestHarness;
///
/// let h = TestHarness::new();
/// let org = h.org(OrganizationType::Ukm, "abster");
/// let admin = h.org_admin_of(org.id());
/// let activity = h.activity.create(&admin, h.activity_input(org.id())).await?;
/// ```
pub struct TestHarness {
    pub roles:         MockRoleRepository,
    pub orgs:          MockOrganizationRepository,
    pub activities:    MockActivityRepository,
    pub surats:        MockSuratRepository,
    pub lpjs:          MockLpjRepository,
    pub history:       MockHistoryRepository,
    pub audit:         MockAuditLogRepository,
    pub notifications: MockNotificationRepository,
    pub tx_manager:    MockTransactionManager,
    pub clock:         Arc<FixedClock>,
    pub resolver:      Arc<AuthorizationResolver>,
    pub notifier:      Arc<NotificationService>,
    pub engine:        Arc<TransitionEngine>,
    pub activity:      Arc<ActivityUseCase>,
    pub surat:         SuratUseCase,
    pub lpj:           LpjUseCase,
    pub role:          RoleUseCase,
    pub reminder:      ReminderSweep,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::at(fixed_now())
    }

    /// 指定時刻で組み立てる
    pub fn at(now: DateTime<Utc>) -> Self {
        let roles = MockRoleRepository::new();
        let orgs = MockOrganizationRepository::new();
        let activities = MockActivityRepository::new();
        let surats = MockSuratRepository::new();
        let lpjs = MockLpjRepository::new();
        let history = MockHistoryRepository::new();
        let audit = MockAuditLogRepository::new();
        let notifications = MockNotificationRepository::new();
        let tx_manager = MockTransactionManager::new();
        let clock = Arc::new(FixedClock::new(now));

        let resolver = Arc::new(AuthorizationResolver::new(
            Arc::new(roles.clone()),
            Arc::new(orgs.clone()),
        ));
        let notifier = Arc::new(NotificationService::new(Arc::new(notifications.clone())));
        let engine = Arc::new(TransitionEngine::new(
            resolver.clone(),
            Arc::new(tx_manager.clone()),
            Arc::new(history.clone()),
            Arc::new(audit.clone()),
            notifier.clone(),
            clock.clone(),
        ));

        let activity = Arc::new(ActivityUseCase::new(
            Arc::new(activities.clone()),
            Arc::new(history.clone()),
            engine.clone(),
        ));
        let surat = SuratUseCase::new(Arc::new(surats.clone()), engine.clone());
        let lpj = LpjUseCase::new(
            Arc::new(lpjs.clone()),
            Arc::new(activities.clone()),
            Arc::new(history.clone()),
            engine.clone(),
        );
        let role = RoleUseCase::new(Arc::new(roles.clone()), Arc::new(orgs.clone()), engine.clone());
        let reminder = ReminderSweep::new(
            Arc::new(activities.clone()),
            activity.clone(),
            notifier.clone(),
            clock.clone(),
        );

        Self {
            roles,
            orgs,
            activities,
            surats,
            lpjs,
            history,
            audit,
            notifications,
            tx_manager,
            clock,
            resolver,
            notifier,
            engine,
            activity,
            surat,
            lpj,
            role,
            reminder,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn counts(&self) -> WriteCounts {
        WriteCounts {
            history:       self.history.entries().len(),
            audit:         self.audit.logs().len(),
            notifications: self.notifications.notifications().len(),
        }
    }

    // ===== 組織・ユーザー =====

    /// 組織を登録する
    pub fn org(&self, org_type: OrganizationType, slug: &str) -> Organization {
        let org = Organization::new(OrganizationId::new(), slug.to_uppercase(), slug, org_type);
        self.orgs.add(org.clone());
        org
    }

    /// グローバルロールを持つユーザー
    pub fn user_with_global(&self, code: &str) -> UserId {
        let user = UserId::new();
        self.roles
            .add(RoleAssignment::global(user.clone(), RoleCode::new(code), self.now()));
        user
    }

    /// 組織スコープのロールを持つユーザー
    pub fn user_scoped(&self, code: &str, org_id: &OrganizationId) -> UserId {
        let user = UserId::new();
        self.roles.add(RoleAssignment::scoped(
            user.clone(),
            RoleCode::new(code),
            org_id.clone(),
            self.now(),
        ));
        user
    }

    /// 組織の ORG_ADMIN
    pub fn org_admin_of(&self, org_id: &OrganizationId) -> UserId {
        self.user_scoped(RoleCode::ORG_ADMIN, org_id)
    }

    // ===== 入力 =====

    /// 1 週間後に始まる公開活動の作成入力
    pub fn activity_input(&self, org_id: &OrganizationId) -> CreateActivityInput {
        CreateActivityInput {
            org_id:               org_id.clone(),
            title:                "Pentas Seni".to_string(),
            description:          "Pentas seni tahunan".to_string(),
            location:             "Aula Utama".to_string(),
            activity_type:        "seni".to_string(),
            collab_type:          None,
            collaborator_org_ids: Vec::new(),
            public:               true,
            start_at:             self.now() + Duration::days(7),
            end_at:               self.now() + Duration::days(7) + Duration::hours(4),
            cover_key:            Some("covers/pentas.jpg".to_string()),
            proposal_key:         Some("proposals/pentas.pdf".to_string()),
            metadata:             json!({}),
        }
    }

    pub fn lpj_content(&self, summary: &str) -> LpjContent {
        LpjContent {
            summary:     summary.to_string(),
            budget_plan: 5_000_000,
            budget_real: 4_750_000,
            report_key:  "lpj/report.pdf".to_string(),
            file_size:   1_024,
            photos:      vec!["lpj/photo-1.jpg".to_string()],
        }
    }

    pub fn lpj_input(
        &self,
        org_id: &OrganizationId,
        activity_id: Option<&ActivityId>,
    ) -> SubmitLpjInput {
        SubmitLpjInput {
            activity_id: activity_id.cloned(),
            org_id:      org_id.clone(),
            content:     self.lpj_content("Laporan kegiatan"),
        }
    }

    // ===== 前提データ =====

    /// 任意のステータスと日時で活動を登録する
    pub fn seed_activity(
        &self,
        org_id: &OrganizationId,
        creator: &UserId,
        status: ActivityStatus,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Activity {
        let activity = Activity::from_db(ActivityRecord {
            id: ActivityId::new(),
            org_id: org_id.clone(),
            title: "Seminar Nasional".to_string(),
            description: String::new(),
            location: "Gedung Rektorat".to_string(),
            activity_type: "seminar".to_string(),
            collab_type: CollabType::Internal,
            collaborator_org_ids: Vec::new(),
            public: true,
            status,
            version: Version::initial(),
            approval_note: None,
            start_at,
            end_at,
            cover_key: Some("covers/seminar.jpg".to_string()),
            cover_approved: false,
            proposal_key: None,
            gallery_urls: Vec::new(),
            metadata: json!({}),
            created_by: creator.clone(),
            updated_by: creator.clone(),
            created_at: self.now(),
            updated_at: self.now(),
        });
        self.activities.add(activity.clone());
        activity
    }

    /// 来週開催の活動を指定ステータスで登録する
    pub fn seed_activity_in(
        &self,
        org_id: &OrganizationId,
        creator: &UserId,
        status: ActivityStatus,
    ) -> Activity {
        let start = self.now() + Duration::days(7);
        self.seed_activity(org_id, creator, status, start, start + Duration::hours(3))
    }

    /// 任意のステータスで公文書を登録する
    pub fn seed_surat(
        &self,
        org_id: &OrganizationId,
        target_org_id: Option<&OrganizationId>,
        target_role: Option<&str>,
        creator: &UserId,
        status: SuratStatus,
    ) -> Surat {
        let surat = Surat::from_db(SuratRecord {
            id: SuratId::new(),
            org_id: org_id.clone(),
            target_org_id: target_org_id.cloned(),
            target_role: target_role.map(ToString::to_string),
            variant: SuratVariant::Permohonan,
            number: "001/UKM/XI/2023".to_string(),
            subject: "Permohonan peminjaman aula".to_string(),
            to_name: "Kepala Bagian Umum".to_string(),
            to_place: "Rektorat".to_string(),
            to_city: "Bandung".to_string(),
            file_key: None,
            status,
            approval_note: None,
            created_by: creator.clone(),
            submitted_by: Some(creator.clone()),
            decided_by: None,
            decided_at: None,
            created_at: self.now(),
            updated_at: self.now(),
        });
        self.surats.add(surat.clone());
        surat
    }

    /// 任意のステータスと改訂番号で LPJ を登録する
    pub fn seed_lpj(
        &self,
        org_id: &OrganizationId,
        activity_id: Option<&ActivityId>,
        submitter: &UserId,
        status: LpjStatus,
        revision_no: i32,
    ) -> Lpj {
        let lpj = Lpj::from_db(LpjRecord {
            id: LpjId::new(),
            activity_id: activity_id.cloned(),
            org_id: org_id.clone(),
            content: self.lpj_content("Laporan awal"),
            status,
            note: None,
            submitted_by: submitter.clone(),
            revision_no,
            reviewed_by: None,
            reviewed_at: None,
            created_at: self.now(),
            updated_at: self.now(),
        });
        self.lpjs.add(lpj.clone());
        lpj
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
