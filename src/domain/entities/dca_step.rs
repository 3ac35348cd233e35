//! 建仓步骤实体 (DcaStep)
//!
//! 对应数据库表 `dca_steps`，一个计划内按 `step_number` 从 1 开始编号

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::enums::StepStatus;

/// 建仓步骤实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaStep {
    /// 自增主键
    pub id: Option<i64>,

    /// 所属计划ID
    pub plan_id: i64,

    /// 步骤序号（计划内唯一，从1开始）
    pub step_number: i32,

    /// 目标挂单价（已做最小报价单位修正）
    pub target_price: Decimal,

    /// 目标投入金额
    pub target_amount: Decimal,

    /// 目标数量
    pub target_quantity: Decimal,

    /// 步骤状态
    pub status: StepStatus,

    /// 成交价格
    pub filled_price: Option<Decimal>,

    /// 成交数量
    pub filled_quantity: Option<Decimal>,

    /// 成交金额（未显式提供时 = 成交价 × 成交数量）
    pub filled_amount: Option<Decimal>,

    /// 券商/交易所订单ID
    pub order_id: Option<String>,

    /// 下单确认时间
    pub ordered_at: Option<DateTime<Utc>>,

    /// 成交时间
    pub filled_at: Option<DateTime<Utc>>,

    /// 价位来源标签（支撑位检测标签 / interpolated / equal_spaced / synthetic / aggressive_first）
    pub level_source: String,

    /// 修正前的原始价位（仅在发生最小报价单位修正时记录）
    pub original_price: Option<Decimal>,

    /// 是否发生了最小报价单位修正
    pub tick_adjusted: bool,

    /// 相对现价的距离百分比（保留2位小数）
    pub distance_pct: Decimal,
}

impl DcaStep {
    /// 由创建规格生成待下单步骤
    pub fn from_spec(plan_id: i64, spec: &NewDcaStep) -> Self {
        Self {
            id: None,
            plan_id,
            step_number: spec.step_number,
            target_price: spec.target_price,
            target_amount: spec.target_amount,
            target_quantity: spec.target_quantity,
            status: StepStatus::Pending,
            filled_price: None,
            filled_quantity: None,
            filled_amount: None,
            order_id: None,
            ordered_at: None,
            filled_at: None,
            level_source: spec.level_source.clone(),
            original_price: spec.original_price,
            tick_adjusted: spec.tick_adjusted,
            distance_pct: spec.distance_pct,
        }
    }
}

/// 步骤创建规格（尚未持久化、无ID）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDcaStep {
    pub step_number: i32,
    pub target_price: Decimal,
    pub target_amount: Decimal,
    pub target_quantity: Decimal,
    pub level_source: String,
    pub original_price: Option<Decimal>,
    pub tick_adjusted: bool,
    pub distance_pct: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_step_from_spec_starts_pending() {
        let spec = NewDcaStep {
            step_number: 1,
            target_price: dec!(99000),
            target_amount: dec!(150000),
            target_quantity: dec!(1.51515151),
            level_source: "fractal_low".to_string(),
            original_price: None,
            tick_adjusted: false,
            distance_pct: dec!(-1.00),
        };

        let step = DcaStep::from_spec(42, &spec);
        assert_eq!(step.plan_id, 42);
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.order_id.is_none());
        assert!(step.filled_price.is_none());
        assert_eq!(step.level_source, "fractal_low");
    }
}
