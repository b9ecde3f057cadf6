//! # 組織
//!
//! 学生組織（BEM、DEMA、UKM、HMJ など）を表す。
//!
//! 組織の種別は認可判定に直接関与する:
//! BEM_ADMIN は種別 BEM の組織すべて、DEMA_ADMIN は種別 DEMA の組織すべてを管理できる。
//! 種別は作成後に変更されない。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

define_uuid_id! {
    /// 組織 ID
    pub struct OrganizationId;
}

/// 組織種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum OrganizationType {
    /// 学生執行部
    Bem,
    /// 学生代表議会
    Dema,
    /// 課外活動団体
    Ukm,
    /// 学科学生会
    Hmj,
    /// その他
    Other,
}

impl_status_from_str!(OrganizationType, "組織種別", {
    "BEM" => Bem,
    "DEMA" => Dema,
    "UKM" => Ukm,
    "HMJ" => Hmj,
    "OTHER" => Other,
});

/// 組織エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    id:       OrganizationId,
    name:     String,
    slug:     String,
    org_type: OrganizationType,
}

impl Organization {
    pub fn new(
        id: OrganizationId,
        name: impl Into<String>,
        slug: impl Into<String>,
        org_type: OrganizationType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            org_type,
        }
    }

    pub fn id(&self) -> &OrganizationId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn org_type(&self) -> OrganizationType {
        self.org_type
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(OrganizationType::Bem, "BEM")]
    #[case(OrganizationType::Dema, "DEMA")]
    #[case(OrganizationType::Ukm, "UKM")]
    #[case(OrganizationType::Hmj, "HMJ")]
    #[case(OrganizationType::Other, "OTHER")]
    fn test_組織種別は大文字の文字列と相互変換できる(
        #[case] org_type: OrganizationType,
        #[case] text: &str,
    ) {
        let written: &str = org_type.into();

        assert_eq!(written, text);
        assert_eq!(text.parse::<OrganizationType>().unwrap(), org_type);
    }

    #[test]
    fn test_不明な組織種別はバリデーションエラー() {
        assert!("KOPMA".parse::<OrganizationType>().is_err());
    }
}
