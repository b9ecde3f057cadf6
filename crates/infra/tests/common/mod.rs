//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用する組織の登録・
//! エンティティ生成ヘルパー。 Rust の統合テスト規約に従い `tests/common/mod.rs`
//! に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use simawa_domain::{
    activity::{Activity, ActivityId, ActivityRecord, ActivityStatus, CollabType},
    organization::{OrganizationId, OrganizationType},
    surat::{NewSurat, Surat, SuratId, SuratVariant},
    user::UserId,
    version::Version,
};
use sqlx::PgPool;

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

// =============================================================================
// DB セットアップヘルパー
// =============================================================================

/// 組織を DB に作成する
pub async fn insert_organization(pool: &PgPool, slug: &str) -> OrganizationId {
    let id = OrganizationId::new();
    let org_type: &str = OrganizationType::Ukm.into();
    sqlx::query(
        r#"
        INSERT INTO organizations (id, name, slug, org_type)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id.as_uuid())
    .bind(format!("UKM {slug}"))
    .bind(slug)
    .bind(org_type)
    .execute(pool)
    .await
    .expect("組織の作成に失敗");
    id
}

// =============================================================================
// エンティティ生成ヘルパー
// =============================================================================

/// PENDING の公文書を作成する
pub fn create_test_surat(
    org_id: &OrganizationId,
    target_org_id: Option<&OrganizationId>,
    target_role: Option<&str>,
    created_at: DateTime<Utc>,
) -> Surat {
    Surat::new(NewSurat {
        id:            SuratId::new(),
        org_id:        org_id.clone(),
        target_org_id: target_org_id.cloned(),
        target_role:   target_role.map(str::to_string),
        variant:       SuratVariant::Permohonan,
        number:        "001/UKM/2024".to_string(),
        subject:       "Permohonan ruangan".to_string(),
        to_name:       "Kepala Biro".to_string(),
        to_place:      "Gedung Rektorat".to_string(),
        to_city:       "Malang".to_string(),
        file_key:      None,
        as_draft:      false,
        created_by:    UserId::new(),
        now:           created_at,
    })
    .unwrap()
}

/// 指定したステータスと期間の活動を作成する
pub fn create_test_activity(
    org_id: &OrganizationId,
    status: ActivityStatus,
    public: bool,
    start_at: DateTime<Utc>,
) -> Activity {
    let creator = UserId::new();
    Activity::from_db(ActivityRecord {
        id: ActivityId::new(),
        org_id: org_id.clone(),
        title: "Makrab".to_string(),
        description: String::new(),
        location: "Aula".to_string(),
        activity_type: "internal".to_string(),
        collab_type: CollabType::Internal,
        collaborator_org_ids: Vec::new(),
        public,
        status,
        version: Version::initial(),
        approval_note: None,
        start_at,
        end_at: start_at + Duration::hours(4),
        cover_key: None,
        cover_approved: false,
        proposal_key: None,
        gallery_urls: Vec::new(),
        metadata: json!({}),
        created_by: creator.clone(),
        updated_by: creator,
        created_at: test_now(),
        updated_at: test_now(),
    })
}
