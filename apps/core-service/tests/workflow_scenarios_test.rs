//! ワークフロー横断の結合テスト
//!
//! 認可拒否・不正な遷移で何も書き込まれないこと、通知と監査ログの失敗時の扱い、
//! 代表的なシナリオを TestHarness 経由で検証する。

use pretty_assertions::assert_eq;
use rstest::rstest;
use simawa_core_service::{error::CoreError, test_utils::TestHarness};
use simawa_domain::{
    activity::ActivityStatus,
    audit_log::AuditAction,
    history::HistoryAction,
    lpj::LpjStatus,
    notification::title,
    organization::OrganizationType,
    role::RoleCode,
    surat::SuratStatus,
    user::UserId,
};

// ===== 活動 =====

#[tokio::test]
async fn test_活動は作成から承認まで履歴と監査ログと通知を残す() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let org_admin = h.org_admin_of(org.id());
    let approver = h.user_with_global(RoleCode::BEM_ADMIN);

    // Act
    let created = h
        .activity
        .create(&org_admin, h.activity_input(org.id()))
        .await
        .unwrap();
    let submitted = h.activity.submit(&org_admin, created.id()).await.unwrap();
    let approved = h
        .activity
        .approve(&approver, created.id(), true, "lanjutkan")
        .await
        .unwrap();

    // Assert
    assert_eq!(created.status(), ActivityStatus::Draft);
    assert_eq!(submitted.status(), ActivityStatus::Pending);
    assert_eq!(approved.status(), ActivityStatus::Approved);
    assert_eq!(approved.approval_note(), Some("lanjutkan"));

    let actions = h
        .activity
        .list_history(created.id())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect::<Vec<_>>();
    assert_eq!(
        actions,
        vec![
            HistoryAction::Create,
            HistoryAction::Submit,
            HistoryAction::Approve
        ]
    );

    let audit_actions = h.audit.logs().into_iter().map(|l| l.action).collect::<Vec<_>>();
    assert_eq!(
        audit_actions,
        vec![
            AuditAction::ActivityCreate,
            AuditAction::ActivitySubmit,
            AuditAction::ActivityApprove
        ]
    );

    let notifications = h.notifications.notifications();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].title, title::PROPOSAL_SUBMITTED);
    assert_eq!(notifications[1].title, title::PROPOSAL_UPDATED);
    assert!(notifications.iter().all(|n| n.recipient == org_admin));
}

#[tokio::test]
async fn test_シナリオb_dema_adminは活動を承認できず状態も変わらない() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let activity = h.seed_activity_in(org.id(), &UserId::new(), ActivityStatus::Pending);
    let dema = h.user_with_global(RoleCode::DEMA_ADMIN);
    let before = h.counts();

    // Act
    let result = h.activity.approve(&dema, activity.id(), true, "").await;

    // Assert
    assert!(matches!(result, Err(CoreError::Forbidden(_))));
    assert_eq!(h.activities.get(activity.id()).unwrap(), activity);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(ActivityStatus::Pending)]
#[case(ActivityStatus::Approved)]
#[case(ActivityStatus::Rejected)]
#[case(ActivityStatus::Completed)]
#[tokio::test]
async fn test_下書き以外の活動を提出すると何も書き込まれない(#[case] status: ActivityStatus) {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Hmj, "hmj-ti");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, status);
    let before = h.counts();

    // Act
    let result = h.activity.submit(&admin, activity.id()).await;

    // Assert
    assert!(
        matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "only draft can be submitted")
    );
    assert_eq!(h.activities.get(activity.id()).unwrap(), activity);
    assert_eq!(h.counts(), before);
}

#[tokio::test]
async fn test_権限のないユーザーの提出は状態検査より先に拒否される() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let other = h.org(OrganizationType::Ukm, "ukm-musik");
    let outsider = h.org_admin_of(other.id());
    // ステータスも不正だが、認可拒否が優先される
    let activity = h.seed_activity_in(org.id(), &UserId::new(), ActivityStatus::Approved);
    let before = h.counts();

    // Act
    let result = h.activity.submit(&outsider, activity.id()).await;

    // Assert
    assert!(matches!(result, Err(CoreError::Forbidden(_))));
    assert_eq!(h.activities.get(activity.id()).unwrap(), activity);
    assert_eq!(h.counts(), before);
}

#[tokio::test]
async fn test_通知の保存に失敗しても遷移は成功する() {
    // Arrange
    let h = TestHarness::new();
    h.notifications.fail_inserts(true);
    let org = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, ActivityStatus::Draft);

    // Act
    let submitted = h.activity.submit(&admin, activity.id()).await.unwrap();

    // Assert
    assert_eq!(submitted.status(), ActivityStatus::Pending);
    assert_eq!(
        h.activities.get(activity.id()).unwrap().status(),
        ActivityStatus::Pending
    );
    assert_eq!(h.history.entries().len(), 1);
    assert_eq!(h.audit.logs().len(), 1);
    assert!(h.notifications.notifications().is_empty());
}

#[tokio::test]
async fn test_監査ログの保存に失敗すると遷移はエラーになり通知されない() {
    // Arrange
    let h = TestHarness::new();
    h.audit.fail_records(true);
    let org = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, ActivityStatus::Draft);

    // Act
    let result = h.activity.submit(&admin, activity.id()).await;

    // Assert
    assert!(matches!(result, Err(CoreError::Database(_))));
    assert!(h.notifications.notifications().is_empty());
}

#[tokio::test]
async fn test_レビューコメントは状態を変えずに履歴だけを残す() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, ActivityStatus::Pending);

    // Act
    h.activity
        .add_revision(&admin, activity.id(), "Perbaiki anggaran")
        .await
        .unwrap();

    // Assert
    assert_eq!(
        h.activities.get(activity.id()).unwrap().status(),
        ActivityStatus::Pending
    );
    let history = h.history.entries();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, HistoryAction::Revision);
    assert_eq!(history[0].note, "Perbaiki anggaran");
    assert!(h.audit.logs().is_empty());
    assert!(h.notifications.notifications().is_empty());
}

#[tokio::test]
async fn test_ギャラリーにない写真の削除は何もしない() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, ActivityStatus::Approved);
    h.activity
        .add_gallery_photo(&admin, activity.id(), "gallery/1.jpg")
        .await
        .unwrap();

    // Act
    let result = h
        .activity
        .remove_gallery_photo(&admin, activity.id(), "gallery/missing.jpg")
        .await
        .unwrap();

    // Assert
    assert_eq!(result.gallery_urls(), ["gallery/1.jpg".to_string()]);
    let actions = h
        .history
        .entries()
        .into_iter()
        .map(|e| e.action)
        .collect::<Vec<_>>();
    assert_eq!(actions, vec![HistoryAction::AddPhoto]);
}

// ===== 公文書 =====

#[tokio::test]
async fn test_シナリオd_宛先組織のメンバーは公文書を決裁できる() {
    // Arrange
    let h = TestHarness::new();
    let origin = h.org(OrganizationType::Ukm, "abster");
    let target = h.org(OrganizationType::Hmj, "hmj-ti");
    let creator = h.org_admin_of(origin.id());
    let member = h.org_admin_of(target.id());
    let surat = h.seed_surat(origin.id(), Some(target.id()), None, &creator, SuratStatus::Pending);

    // Act
    let can_access = h.resolver.can_access_surat(&member, &surat).await.unwrap();
    let decided = h
        .surat
        .decide(&member, surat.id(), true, "Disetujui")
        .await
        .unwrap();

    // Assert
    assert!(can_access);
    assert_eq!(decided.status(), SuratStatus::Approved);
    assert_eq!(decided.decided_by(), Some(&member));
    let notifications = h.notifications.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].recipient, creator);
    assert_eq!(notifications[0].title, title::SURAT_UPDATED);
    assert_eq!(h.audit.logs()[0].action, AuditAction::SuratDecide);
}

#[tokio::test]
async fn test_無関係なユーザーの決裁は拒否され何も書き込まれない() {
    // Arrange
    let h = TestHarness::new();
    let origin = h.org(OrganizationType::Ukm, "abster");
    let target = h.org(OrganizationType::Hmj, "hmj-ti");
    let unrelated = h.org(OrganizationType::Ukm, "ukm-musik");
    let outsider = h.org_admin_of(unrelated.id());
    let surat = h.seed_surat(
        origin.id(),
        Some(target.id()),
        Some(RoleCode::BEM_ADMIN),
        &UserId::new(),
        SuratStatus::Pending,
    );
    let before = h.counts();

    // Act
    let result = h.surat.revise(&outsider, surat.id(), "Lengkapi").await;

    // Assert
    assert!(matches!(result, Err(CoreError::Forbidden(_))));
    assert_eq!(h.surats.get(surat.id()).unwrap(), surat);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(SuratStatus::Draft)]
#[case(SuratStatus::Approved)]
#[case(SuratStatus::Rejected)]
#[case(SuratStatus::Revision)]
#[tokio::test]
async fn test_承認待ち以外の公文書は決裁できない(#[case] status: SuratStatus) {
    // Arrange
    let h = TestHarness::new();
    let origin = h.org(OrganizationType::Ukm, "abster");
    let admin = h.user_with_global(RoleCode::ADMIN);
    let surat = h.seed_surat(origin.id(), None, None, &UserId::new(), status);
    let before = h.counts();

    // Act
    let result = h.surat.decide(&admin, surat.id(), false, "").await;

    // Assert
    assert!(
        matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "only pending can be decided")
    );
    assert_eq!(h.surats.get(surat.id()).unwrap(), surat);
    assert_eq!(h.counts(), before);
}

// ===== LPJ =====

#[tokio::test]
async fn test_シナリオc_ノートなしのlpj却下は入力エラーで状態は変わらない() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let lpj = h.seed_lpj(org.id(), None, &UserId::new(), LpjStatus::Pending, 0);
    let approver = h.user_with_global(RoleCode::BEM_ADMIN);
    let before = h.counts();

    // Act
    let result = h.lpj.approve(&approver, lpj.id(), false, "").await;

    // Assert
    assert!(
        matches!(&result, Err(CoreError::BadRequest(msg)) if msg == "note required for reject")
    );
    assert_eq!(h.lpjs.get(lpj.id()).unwrap(), lpj);
    assert_eq!(h.counts(), before);
}

#[tokio::test]
async fn test_dema_adminはlpjを差し戻せない() {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Dema, "dema-pusat");
    let lpj = h.seed_lpj(org.id(), None, &UserId::new(), LpjStatus::Pending, 0);
    let dema = h.user_with_global(RoleCode::DEMA_ADMIN);
    let before = h.counts();

    // Act
    let result = h.lpj.add_revision(&dema, lpj.id(), "Lengkapi nota").await;

    // Assert
    assert!(matches!(result, Err(CoreError::Forbidden(_))));
    assert_eq!(h.lpjs.get(lpj.id()).unwrap(), lpj);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(LpjStatus::Approved)]
#[case(LpjStatus::Rejected)]
#[case(LpjStatus::RevisionRequested)]
#[tokio::test]
async fn test_承認待ち以外のlpjは承認できない(#[case] status: LpjStatus) {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let lpj = h.seed_lpj(org.id(), None, &UserId::new(), status, 1);
    let admin = h.user_with_global(RoleCode::ADMIN);
    let before = h.counts();

    // Act
    let result = h.lpj.approve(&admin, lpj.id(), true, "").await;

    // Assert
    assert!(matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "lpj not pending"));
    assert_eq!(h.lpjs.get(lpj.id()).unwrap(), lpj);
    assert_eq!(h.counts(), before);
}

#[tokio::test]
async fn test_存在しないlpjはnot_found() {
    let h = TestHarness::new();
    let admin = h.user_with_global(RoleCode::ADMIN);

    let result = h
        .lpj
        .approve(&admin, &simawa_domain::lpj::LpjId::new(), true, "")
        .await;

    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

// ===== 書き込み失敗・不正な遷移 =====

#[tokio::test]
async fn test_履歴の保存に失敗すると活動の提出はエラーになり監査ログも通知も残らない() {
    // Arrange
    let h = TestHarness::new();
    h.history.fail_inserts(true);
    let org = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, ActivityStatus::Draft);

    // Act
    let result = h.activity.submit(&admin, activity.id()).await;

    // Assert
    assert!(matches!(result, Err(CoreError::Database(_))));
    assert!(h.audit.logs().is_empty());
    assert!(h.notifications.notifications().is_empty());
}

#[tokio::test]
async fn test_履歴の保存に失敗するとlpjの承認はエラーになり監査ログも通知も残らない() {
    // Arrange
    let h = TestHarness::new();
    h.history.fail_inserts(true);
    let org = h.org(OrganizationType::Ukm, "abster");
    let lpj = h.seed_lpj(org.id(), None, &UserId::new(), LpjStatus::Pending, 0);
    let admin = h.user_with_global(RoleCode::ADMIN);

    // Act
    let result = h.lpj.approve(&admin, lpj.id(), true, "").await;

    // Assert
    assert!(matches!(result, Err(CoreError::Database(_))));
    assert!(h.audit.logs().is_empty());
    assert!(h.notifications.notifications().is_empty());
}

#[rstest]
#[case(ActivityStatus::Draft)]
#[case(ActivityStatus::Approved)]
#[case(ActivityStatus::Rejected)]
#[case(ActivityStatus::Completed)]
#[tokio::test]
async fn test_承認待ち以外の活動は決裁できない(#[case] status: ActivityStatus) {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let activity = h.seed_activity_in(org.id(), &UserId::new(), status);
    let approver = h.user_with_global(RoleCode::BEM_ADMIN);
    let before = h.counts();

    // Act
    let result = h.activity.approve(&approver, activity.id(), true, "").await;

    // Assert
    assert!(matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "not pending"));
    assert_eq!(h.activities.get(activity.id()).unwrap(), activity);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(ActivityStatus::Draft)]
#[case(ActivityStatus::Pending)]
#[case(ActivityStatus::Rejected)]
#[case(ActivityStatus::Completed)]
#[tokio::test]
async fn test_承認済み以外の活動は完了にできない(#[case] status: ActivityStatus) {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(org.id());
    let activity = h.seed_activity_in(org.id(), &admin, status);
    let before = h.counts();

    // Act
    let result = h.activity.mark_completed(&admin, activity.id()).await;

    // Assert
    assert!(
        matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "only approved activity can be completed")
    );
    assert_eq!(h.activities.get(activity.id()).unwrap(), activity);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(SuratStatus::Pending)]
#[case(SuratStatus::Approved)]
#[case(SuratStatus::Revision)]
#[tokio::test]
async fn test_下書き以外の公文書は提出できない(#[case] status: SuratStatus) {
    // Arrange
    let h = TestHarness::new();
    let origin = h.org(OrganizationType::Ukm, "abster");
    let admin = h.org_admin_of(origin.id());
    let surat = h.seed_surat(origin.id(), None, None, &admin, status);
    let before = h.counts();

    // Act
    let result = h.surat.submit(&admin, surat.id()).await;

    // Assert
    assert!(
        matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "only draft can be submitted")
    );
    assert_eq!(h.surats.get(surat.id()).unwrap(), surat);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(SuratStatus::Draft)]
#[case(SuratStatus::Rejected)]
#[case(SuratStatus::Revision)]
#[tokio::test]
async fn test_承認待ち以外の公文書は差し戻せない(#[case] status: SuratStatus) {
    // Arrange
    let h = TestHarness::new();
    let origin = h.org(OrganizationType::Ukm, "abster");
    let admin = h.user_with_global(RoleCode::ADMIN);
    let surat = h.seed_surat(origin.id(), None, None, &UserId::new(), status);
    let before = h.counts();

    // Act
    let result = h.surat.revise(&admin, surat.id(), "Lengkapi").await;

    // Assert
    assert!(
        matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "only pending can be revised")
    );
    assert_eq!(h.surats.get(surat.id()).unwrap(), surat);
    assert_eq!(h.counts(), before);
}

#[rstest]
#[case(LpjStatus::Approved)]
#[case(LpjStatus::Rejected)]
#[case(LpjStatus::RevisionRequested)]
#[tokio::test]
async fn test_承認待ち以外のlpjは差し戻せない(#[case] status: LpjStatus) {
    // Arrange
    let h = TestHarness::new();
    let org = h.org(OrganizationType::Ukm, "abster");
    let lpj = h.seed_lpj(org.id(), None, &UserId::new(), status, 1);
    let admin = h.user_with_global(RoleCode::ADMIN);
    let before = h.counts();

    // Act
    let result = h.lpj.add_revision(&admin, lpj.id(), "Lengkapi nota").await;

    // Assert
    assert!(matches!(&result, Err(CoreError::InvalidTransition(msg)) if msg == "lpj not pending"));
    assert_eq!(h.lpjs.get(lpj.id()).unwrap(), lpj);
    assert_eq!(h.counts(), before);
}
