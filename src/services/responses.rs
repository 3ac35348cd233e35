//! 操作响应载荷
//!
//! 所有失败路径同样返回结构化结果（success=false + 可读的 error），
//! 不向调用方抛裸错误

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{DcaPlan, DcaStep};
use crate::domain::enums::StepStatus;
use crate::execution::StepExecutionResult;

/// 计划创建响应中的单步预览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepPreview {
    pub step: i32,
    pub price: Decimal,
    pub distance_pct: Decimal,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub source: String,
    /// 仅在发生最小报价单位修正时出现
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_adjusted: Option<bool>,
}

impl StepPreview {
    pub fn from_step(step: &DcaStep) -> Self {
        Self {
            step: step.step_number,
            price: step.target_price,
            distance_pct: step.distance_pct,
            amount: step.target_amount,
            quantity: step.target_quantity,
            source: step.level_source.clone(),
            original_price: step.original_price,
            tick_adjusted: if step.tick_adjusted { Some(true) } else { None },
        }
    }
}

/// 计划创建响应中的汇总信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub symbol: String,
    pub current_price: Decimal,
    pub rsi_14: Option<f64>,
    pub strategy: String,
    pub total_amount: Decimal,
    /// 数量加权平均目标价
    pub avg_target_price: Decimal,
    pub total_quantity: Decimal,
    /// 最深档位距现价的深度百分比
    pub price_range_pct: Decimal,
    pub weight_mode: String,
}

/// 计划创建操作响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dry_run: bool,
    pub executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<i64>,
    pub plans: Vec<StepPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PlanSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<Vec<StepExecutionResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_steps: Option<Vec<i32>>,
}

impl CreatePlanResponse {
    /// 持久化之前失败：无计划ID、无副作用
    pub fn failure(dry_run: bool, error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            dry_run,
            executed: false,
            plan_id: None,
            plans: Vec::new(),
            summary: None,
            execution_results: None,
            executed_steps: None,
        }
    }
}

/// 状态查询响应中的单步视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStatusView {
    pub step: i32,
    pub status: String,
    pub target_price: Decimal,
    pub target_amount: Decimal,
    pub target_quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_at: Option<DateTime<Utc>>,
    pub source: String,
    pub distance_pct: Decimal,
}

impl StepStatusView {
    pub fn from_step(step: &DcaStep) -> Self {
        Self {
            step: step.step_number,
            status: step.status.as_str().to_string(),
            target_price: step.target_price,
            target_amount: step.target_amount,
            target_quantity: step.target_quantity,
            filled_price: step.filled_price,
            filled_quantity: step.filled_quantity,
            filled_amount: step.filled_amount,
            order_id: step.order_id.clone(),
            ordered_at: step.ordered_at,
            filled_at: step.filled_at,
            source: step.level_source.clone(),
            distance_pct: step.distance_pct,
        }
    }
}

/// 计划进度统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanProgress {
    pub total_steps: usize,
    pub filled: usize,
    pub ordered: usize,
    pub pending: usize,
    pub cancelled: usize,
    pub partial: usize,
    pub skipped: usize,
    /// 已投入金额（已记录成交额的步骤之和）
    pub invested: Decimal,
    /// 剩余可投入金额
    pub remaining: Decimal,
    /// 数量加权平均成交价（无成交时缺省）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_filled_price: Option<Decimal>,
}

impl PlanProgress {
    pub fn from_plan(plan: &DcaPlan) -> Self {
        let count = |status: StepStatus| plan.steps.iter().filter(|s| s.status == status).count();

        let invested: Decimal = plan.steps.iter().filter_map(|s| s.filled_amount).sum();
        let filled_qty: Decimal = plan.steps.iter().filter_map(|s| s.filled_quantity).sum();
        let filled_value: Decimal = plan
            .steps
            .iter()
            .filter_map(|s| match (s.filled_price, s.filled_quantity) {
                (Some(price), Some(qty)) => Some(price * qty),
                _ => None,
            })
            .sum();

        let avg_filled_price = if filled_qty > Decimal::ZERO {
            Some((filled_value / filled_qty).round_dp(8))
        } else {
            None
        };

        Self {
            total_steps: plan.steps.len(),
            filled: count(StepStatus::Filled),
            ordered: count(StepStatus::Ordered),
            pending: count(StepStatus::Pending),
            cancelled: count(StepStatus::Cancelled),
            partial: count(StepStatus::Partial),
            skipped: count(StepStatus::Skipped),
            invested,
            remaining: plan.total_amount - invested,
            avg_filled_price,
        }
    }
}

/// 状态查询响应中的计划视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStatusView {
    pub plan_id: i64,
    pub symbol: String,
    pub market: String,
    pub status: String,
    pub total_amount: Decimal,
    pub splits: i32,
    pub strategy: String,
    pub rsi_14: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepStatusView>,
    pub progress: PlanProgress,
}

impl PlanStatusView {
    pub fn from_plan(plan: &DcaPlan) -> Self {
        Self {
            plan_id: plan.id.unwrap_or(0),
            symbol: plan.symbol.clone(),
            market: plan.market.as_str().to_string(),
            status: plan.status.as_str().to_string(),
            total_amount: plan.total_amount,
            splits: plan.split_count,
            strategy: plan.strategy.as_str().to_string(),
            rsi_14: plan.rsi_snapshot,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
            completed_at: plan.completed_at,
            steps: plan.steps.iter().map(StepStatusView::from_step).collect(),
            progress: PlanProgress::from_plan(plan),
        }
    }
}

/// 状态查询操作响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub plans: Vec<PlanStatusView>,
    pub total_plans: usize,
}

impl StatusResponse {
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            plans: Vec::new(),
            total_plans: 0,
        }
    }
}
