//! 价位规划器 (LevelPlanner)
//!
//! 纯计算模块：
//! - `compute_weights`：RSI → 各步骤资金权重
//! - `compute_levels`：策略 + 支撑位 → 买入价位序列
//! - `allocate_steps`：价位 + 权重 → 带金额/数量/报价修正的步骤规格

mod allocation;
mod levels;
mod weights;

pub use allocation::allocate_steps;
pub use levels::compute_levels;
pub use weights::{compute_weights, weight_mode};
