//! 计划仓储接口 - 定义数据访问的抽象

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::entities::{DcaPlan, DcaStep, NewDcaPlan};
use crate::domain::enums::PlanStatus;
use crate::error::Result;

/// 计划仓储接口
///
/// 计划与步骤的创建必须是一个原子单元：要么全部可见，要么全部不可见。
/// 步骤级的修改是最小粒度的行级操作，不附带任何生命周期规则——
/// 状态机规则由上层 `PlanLifecycleService` 负责。
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// 原子创建计划及其全部步骤，返回带生成ID的完整计划
    async fn create_plan(&self, new_plan: NewDcaPlan) -> Result<DcaPlan>;

    /// 按ID查询计划（可选按用户过滤），步骤按 step_number 升序
    async fn find_plan(&self, plan_id: i64, owner: Option<&str>) -> Result<Option<DcaPlan>>;

    /// 查询用户的计划列表，按创建时间倒序
    ///
    /// `status`/`symbol` 为精确过滤；`limit` 的合法范围（1-1000）
    /// 由面向调用方的操作层校验，这里不做静默截断
    async fn list_plans(
        &self,
        owner: &str,
        status: Option<PlanStatus>,
        symbol: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DcaPlan>>;

    /// 按ID查询单个步骤
    async fn find_step(&self, step_id: i64) -> Result<Option<DcaStep>>;

    /// 按券商订单ID反查步骤及其所属计划（供外部成交回报使用）
    async fn find_step_by_order_id(&self, order_id: &str) -> Result<Option<(DcaStep, DcaPlan)>>;

    /// 计划中序号最小的 pending 步骤
    async fn next_pending_step(&self, plan_id: i64) -> Result<Option<DcaStep>>;

    /// 标记步骤已下单：写入订单ID与下单时间
    ///
    /// 无条件覆盖（last-write-wins），不校验前置状态
    async fn mark_step_ordered(
        &self,
        step_id: i64,
        order_id: &str,
        ordered_at: DateTime<Utc>,
    ) -> Result<()>;

    /// 标记步骤已成交：写入成交价/量/额与成交时间
    async fn mark_step_filled(
        &self,
        step_id: i64,
        filled_price: Decimal,
        filled_quantity: Decimal,
        filled_amount: Decimal,
        filled_at: DateTime<Utc>,
    ) -> Result<()>;

    /// 标记单个步骤已取消
    async fn mark_step_cancelled(&self, step_id: i64) -> Result<()>;

    /// 将计划内所有 {pending, ordered, partial} 步骤置为 cancelled，返回受影响行数
    async fn cancel_open_steps(&self, plan_id: i64) -> Result<u64>;

    /// 更新计划状态（completed 时附带完成时间）
    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}
