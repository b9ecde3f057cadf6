//! RoleRepository 統合テスト
//!
//! データベースを使用したテスト。sqlx::test マクロを使用して、
//! テストごとにデータベースを作成する。
//!
//! 実行方法:
//! ```bash
//! cargo test -p simawa-infra --test role_repository_test
//! ```

mod common;

use common::{insert_organization, test_now};
use pretty_assertions::assert_eq;
use simawa_domain::{
    role::{RoleAssignment, RoleCode},
    user::UserId,
};
use simawa_infra::{
    db::{PgTransactionManager, TransactionManager},
    repository::{PostgresRoleRepository, RoleRepository},
};
use sqlx::PgPool;

async fn assign_all(pool: &PgPool, assignments: &[RoleAssignment]) {
    let repo = PostgresRoleRepository::new(pool.clone());
    let mut tx = PgTransactionManager::new(pool.clone()).begin().await.unwrap();
    for assignment in assignments {
        repo.assign(&mut tx, assignment).await.unwrap();
    }
    tx.commit().await.unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_同じグローバルロールを2回割り当てても1行だけ残る(pool: PgPool) {
    let user_id = UserId::new();
    let assignment = RoleAssignment::global(user_id.clone(), RoleCode::bem_admin(), test_now());

    assign_all(&pool, &[assignment.clone(), assignment]).await;

    let sut = PostgresRoleRepository::new(pool);
    let found = sut.find_assignments_by_user(&user_id).await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].is_global());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_組織スコープのロールはその組織に対してだけ有効(pool: PgPool) {
    let abster = insert_organization(&pool, "abster").await;
    let raharja = insert_organization(&pool, "fc-raharja").await;
    let user_id = UserId::new();
    assign_all(
        &pool,
        &[RoleAssignment::scoped(
            user_id.clone(),
            RoleCode::org_admin(),
            abster.clone(),
            test_now(),
        )],
    )
    .await;

    let sut = PostgresRoleRepository::new(pool);

    assert!(sut
        .has_role_for_org(&user_id, &RoleCode::org_admin(), &abster)
        .await
        .unwrap());
    assert!(!sut
        .has_role_for_org(&user_id, &RoleCode::org_admin(), &raharja)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_プレフィックス判定でアンダースコアはワイルドカードにならない(
    pool: PgPool,
) {
    let org_id = insert_organization(&pool, "abster").await;
    let user_id = UserId::new();
    assign_all(
        &pool,
        &[RoleAssignment::scoped(
            user_id.clone(),
            RoleCode::new("ORGXABSTER"),
            org_id.clone(),
            test_now(),
        )],
    )
    .await;

    let sut = PostgresRoleRepository::new(pool);

    assert!(!sut
        .has_any_role_for_org_prefix(&user_id, &org_id, "ORG_")
        .await
        .unwrap());
    assert!(!sut.has_any_role_prefix(&user_id, "ORG_").await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_組織別コードはプレフィックスで見つかる(pool: PgPool) {
    let org_id = insert_organization(&pool, "fc-raharja").await;
    let user_id = UserId::new();
    assign_all(
        &pool,
        &[RoleAssignment::scoped(
            user_id.clone(),
            RoleCode::for_organization_slug("fc-raharja"),
            org_id.clone(),
            test_now(),
        )],
    )
    .await;

    let sut = PostgresRoleRepository::new(pool);

    assert!(sut
        .has_any_role_for_org_prefix(&user_id, &org_id, "ORG_")
        .await
        .unwrap());
    assert!(sut.has_any_role_prefix(&user_id, "ORG_").await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_空のプレフィックスは入力エラーになる(pool: PgPool) {
    let sut = PostgresRoleRepository::new(pool);

    let result = sut.has_any_role_prefix(&UserId::new(), "").await;

    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_コミットしなかった割り当ては残らない(pool: PgPool) {
    let user_id = UserId::new();
    let repo = PostgresRoleRepository::new(pool.clone());
    {
        let mut tx = PgTransactionManager::new(pool.clone()).begin().await.unwrap();
        repo.assign(
            &mut tx,
            &RoleAssignment::global(user_id.clone(), RoleCode::admin(), test_now()),
        )
        .await
        .unwrap();
        // コミットせずに破棄
    }

    let found = repo.find_assignments_by_user(&user_id).await.unwrap();

    assert!(found.is_empty());
}
