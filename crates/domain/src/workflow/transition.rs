//! # テーブル駆動の状態遷移
//!
//! 操作ごとに「許可される遷移元ステータスの集合」と「遷移先」を宣言し、
//! 現在のステータスと照合して遷移先を決定する。
//!
//! ```rust
//! use simawa_domain::{
//!     DomainError,
//!     workflow::{TransitionRule, TransitionTable},
//! };
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Status { Draft, Pending }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Op { Submit }
//!
//! static TABLE: TransitionTable<Op, Status> = TransitionTable::new(&[TransitionRule {
//!     operation: Op::Submit,
//!     from:      &[Status::Draft],
//!     to:        Status::Pending,
//!     rejection: "only draft can be submitted",
//! }]);
//!
//! assert_eq!(TABLE.resolve(Op::Submit, Status::Draft).unwrap(), Status::Pending);
//! assert!(matches!(
//!     TABLE.resolve(Op::Submit, Status::Pending),
//!     Err(DomainError::InvalidTransition(_))
//! ));
//! ```

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{DomainError, organization::OrganizationId, user::UserId};

/// 1 つの操作に対する遷移規則
#[derive(Debug)]
pub struct TransitionRule<Op: 'static, S: 'static> {
    /// 対象の操作
    pub operation: Op,
    /// 許可される遷移元ステータス
    pub from:      &'static [S],
    /// 遷移先ステータス
    pub to:        S,
    /// 遷移元が一致しないときに返す理由
    pub rejection: &'static str,
}

/// 遷移規則の集合
#[derive(Debug)]
pub struct TransitionTable<Op: 'static, S: 'static> {
    rules: &'static [TransitionRule<Op, S>],
}

impl<Op, S> TransitionTable<Op, S>
where
    Op: Copy + PartialEq + Debug,
    S: Copy + PartialEq + Debug,
{
    pub const fn new(rules: &'static [TransitionRule<Op, S>]) -> Self {
        Self { rules }
    }

    /// 操作と現在のステータスから遷移先を決定する
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidTransition`: 現在のステータスが遷移元に含まれない、
    ///   または操作が表に存在しない
    pub fn resolve(&self, operation: Op, current: S) -> Result<S, DomainError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.operation == operation)
            .ok_or_else(|| {
                DomainError::InvalidTransition(format!("unsupported operation: {operation:?}"))
            })?;

        if rule.from.contains(&current) {
            Ok(rule.to)
        } else {
            Err(DomainError::InvalidTransition(rule.rejection.to_string()))
        }
    }
}

/// 遷移を適用するときの付帯情報
#[derive(Debug, Clone)]
pub struct TransitionContext {
    /// 操作者
    pub actor: UserId,
    /// 遷移に添えるノート（承認ノート、却下理由、差し戻し理由）
    pub note:  Option<String>,
    /// 遷移時刻
    pub now:   DateTime<Utc>,
}

impl TransitionContext {
    pub fn new(actor: UserId, now: DateTime<Utc>) -> Self {
        Self {
            actor,
            note: None,
            now,
        }
    }

    /// 空白のみのノートは `None` として扱う
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = if note.trim().is_empty() {
            None
        } else {
            Some(note)
        };
        self
    }

    pub fn note_or_empty(&self) -> &str {
        self.note.as_deref().unwrap_or_default()
    }
}

/// 状態遷移表に従って遷移するエンティティ
///
/// `apply_transition` は遷移先が確定した後の副作用のないフィールド更新だけを担う。
/// 呼び出し側は [`WorkflowEntity::transitioned`] を使い、表による検査を必ず通す。
pub trait WorkflowEntity: Clone + Send + Sync + Sized {
    type Status: Copy + PartialEq + Eq + Debug + Send + Sync + Into<&'static str> + 'static;
    type Operation: Copy + PartialEq + Eq + Debug + Send + Sync + 'static;

    /// 履歴・監査ログに記録するエンティティ種別
    const ENTITY_TYPE: &'static str;

    fn transition_table() -> &'static TransitionTable<Self::Operation, Self::Status>;

    fn status(&self) -> Self::Status;

    /// 所有組織
    fn organization_id(&self) -> &OrganizationId;

    fn entity_uuid(&self) -> Uuid;

    /// 遷移先ステータスと付帯フィールドを反映した新しいエンティティを返す
    fn apply_transition(
        self,
        operation: Self::Operation,
        to: Self::Status,
        ctx: &TransitionContext,
    ) -> Self;

    /// 遷移表で検査したうえで遷移を適用する
    ///
    /// 検査に失敗した場合、`self` は変更されずに破棄され、呼び出し元は
    /// 永続化済みのデータを一切変更しない。
    fn transitioned(
        self,
        operation: Self::Operation,
        ctx: &TransitionContext,
    ) -> Result<Self, DomainError> {
        let to = Self::transition_table().resolve(operation, self.status())?;
        Ok(self.apply_transition(operation, to, ctx))
    }
}
