//! 建仓计划实体 (DcaPlan Aggregate Root)
//!
//! 对应数据库表 `dca_plans`，一个计划 = 一个标的、一位用户的一轮分批买入

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{DcaStep, NewDcaStep};
use crate::domain::enums::{DcaStrategy, MarketClass, PlanStatus};

/// 建仓计划实体 - 聚合根
///
/// 计划与其全部步骤一次性原子创建；正常运行中不做物理删除，
/// 状态只经由生命周期服务变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaPlan {
    /// 计划ID
    pub id: Option<i64>,

    /// 所属用户ID
    pub owner_id: String,

    /// 标的代码
    pub symbol: String,

    /// 市场类别
    pub market: MarketClass,

    /// 总投入资金
    pub total_amount: Decimal,

    /// 分批数量（2-5）
    pub split_count: i32,

    /// 建仓策略
    pub strategy: DcaStrategy,

    /// 计划状态
    pub status: PlanStatus,

    /// 创建时点的RSI快照（可能缺失）
    pub rsi_snapshot: Option<f64>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,

    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,

    /// 子步骤（按 step_number 升序）
    pub steps: Vec<DcaStep>,
}

impl DcaPlan {
    /// 是否仍在进行中
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// 按序号查找步骤
    pub fn step_by_number(&self, step_number: i32) -> Option<&DcaStep> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    /// 是否所有步骤都已进入终态
    pub fn all_steps_settled(&self) -> bool {
        self.steps.iter().all(|s| !s.status.is_open())
    }
}

/// 计划创建规格（尚未持久化）
///
/// 持久化层将其连同全部步骤作为一个原子单元落库
#[derive(Debug, Clone)]
pub struct NewDcaPlan {
    pub owner_id: String,
    pub symbol: String,
    pub market: MarketClass,
    pub total_amount: Decimal,
    pub split_count: i32,
    pub strategy: DcaStrategy,
    pub rsi_snapshot: Option<f64>,
    pub steps: Vec<NewDcaStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::StepStatus;
    use rust_decimal_macros::dec;

    fn sample_plan() -> DcaPlan {
        let now = Utc::now();
        let spec = NewDcaStep {
            step_number: 1,
            target_price: dec!(99000),
            target_amount: dec!(100000),
            target_quantity: dec!(1),
            level_source: "synthetic".to_string(),
            original_price: None,
            tick_adjusted: false,
            distance_pct: dec!(-1.00),
        };
        let mut step1 = DcaStep::from_spec(1, &spec);
        step1.id = Some(11);
        let mut step2 = step1.clone();
        step2.id = Some(12);
        step2.step_number = 2;

        DcaPlan {
            id: Some(1),
            owner_id: "user-1".to_string(),
            symbol: "005930".to_string(),
            market: MarketClass::DomesticEquity,
            total_amount: dec!(200000),
            split_count: 2,
            strategy: DcaStrategy::Support,
            status: PlanStatus::Active,
            rsi_snapshot: Some(25.0),
            created_at: now,
            updated_at: now,
            completed_at: None,
            steps: vec![step1, step2],
        }
    }

    #[test]
    fn test_step_by_number() {
        let plan = sample_plan();
        assert_eq!(plan.step_by_number(2).map(|s| s.id), Some(Some(12)));
        assert!(plan.step_by_number(3).is_none());
    }

    #[test]
    fn test_all_steps_settled() {
        let mut plan = sample_plan();
        assert!(!plan.all_steps_settled());

        plan.steps[0].status = StepStatus::Filled;
        plan.steps[1].status = StepStatus::Cancelled;
        assert!(plan.all_steps_settled());
    }
}
