//! # ワークフロー共通基盤
//!
//! Activity / Surat / LPJ の 3 種類のエンティティが共有する
//! 状態遷移の仕組み（テーブル駆動のステートマシン）を提供する。
//!
//! 各エンティティは [`WorkflowEntity`] を実装し、遷移元ステータスの集合と
//! 遷移先を [`TransitionTable`] として静的に宣言する。認可の判定はここでは行わず、
//! ユースケース層が遷移の直前にガード戦略として注入する。

mod transition;

pub use transition::{
    TransitionContext,
    TransitionRule,
    TransitionTable,
    WorkflowEntity,
};
