//! # ebbinghaus-algo - 艾宾浩斯复习计划核心算法库
//!
//! 本 crate 提供纯 Rust 实现的间隔复习调度:
//!
//! - **Pacing** - 根据总词数与每日学习量计算单元数与计划总天数
//! - **Schedule Matrix** - 生成「天 × 列」的新学/复习网格
//! - **Completion** - 根据学习记录判定每个格子是否完成 (含跨轮次推断)
//! - **Capacity** - 标记超出实际内容的「未使用」单元
//!
//! ## 设计理念
//!
//! - **纯函数** - 无 I/O、无全局状态，每次调用完整重算
//! - **容错** - 非法输入被钳制并以警告返回，从不 panic
//! - **充分测试** - 单元测试 + 属性测试
//!
//! ## 模块结构
//!
//! - [`types`] - 公共类型和常量
//! - [`sanitize`] - 输入清洗
//! - [`pacing`] - 学习节奏计算
//! - [`matrix`] - 计划网格生成
//! - [`completion`] - 完成状态判定
//! - [`capacity`] - 容量对账
//! - [`plan`] - 端到端流水线
//!
//! ## 使用示例
//!
//! ```rust
//! use ebbinghaus_algo::{build_schedule, InferencePolicy, LearningUnit, ScheduleInput};
//!
//! let input = ScheduleInput {
//!     total_words: 120,
//!     words_per_day: 50,
//!     learning_units: vec![LearningUnit::learned(1).with_review(2, true)],
//!     ..ScheduleInput::default()
//! };
//! let plan = build_schedule(&input, InferencePolicy::default());
//! assert_eq!(plan.units_count, 3);
//! assert_eq!(plan.total_days, 18);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod capacity;
pub mod completion;
pub mod matrix;
pub mod pacing;
pub mod plan;
pub mod sanitize;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

pub use capacity::{derive_capacity, reconcile};
pub use completion::{is_round_completed, resolve_matrix, UnitIndex};
pub use matrix::{build_schedule_matrix, DayRow, ScheduleMatrix};
pub use pacing::{compute_pacing, compute_pacing_checked, units_for, Pacing};
pub use plan::{
    build_schedule, build_schedules, plan_progress, CellActivation, IgnoreReason, PlanProgress,
    ScheduleInput, SchedulePlan,
};
