//! 计划生命周期服务 (PlanLifecycleService)
//!
//! 在仓储的行级原语之上实现状态机规则：
//! 步骤流转、计划自动完成、计划取消级联。
//!
//! 步骤: pending → ordered → {partial → filled | filled}；
//!       {pending, ordered, partial} → cancelled；pending → skipped
//! 计划: active → completed / cancelled / expired，终态不可再转换。
//! expired 仅由外部触发，引擎不做定时扫描

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::entities::{DcaPlan, DcaStep};
use crate::domain::enums::PlanStatus;
use crate::domain::traits::PlanRepository;
use crate::error::{DcaError, Result};

pub struct PlanLifecycleService {
    repository: Arc<dyn PlanRepository>,
}

impl PlanLifecycleService {
    pub fn new(repository: Arc<dyn PlanRepository>) -> Self {
        Self { repository }
    }

    /// 标记步骤已向券商/交易所确认下单
    ///
    /// 无条件覆盖已有状态与订单ID（last-write-wins）。
    /// 不校验前置状态是产品侧确认保留的字面契约
    pub async fn mark_step_ordered(&self, step_id: i64, order_id: &str) -> Result<DcaStep> {
        self.repository
            .mark_step_ordered(step_id, order_id, Utc::now())
            .await?;

        self.repository
            .find_step(step_id)
            .await?
            .ok_or_else(|| DcaError::Inconsistent(format!("步骤标记后无法回读: {}", step_id)))
    }

    /// 标记步骤已成交，并检查计划是否就此完成
    ///
    /// `filled_amount` 未提供时按 成交价 × 成交数量 计算。
    /// 当父计划仍为 active 且所有步骤均已离开
    /// {pending, ordered, partial} 时，计划转为 completed；
    /// 非 active 计划（如已取消）不做任何转换
    pub async fn mark_step_filled(
        &self,
        step_id: i64,
        filled_price: Decimal,
        filled_quantity: Decimal,
        filled_amount: Option<Decimal>,
    ) -> Result<DcaStep> {
        let amount = filled_amount.unwrap_or(filled_price * filled_quantity);
        self.repository
            .mark_step_filled(step_id, filled_price, filled_quantity, amount, Utc::now())
            .await?;

        let step = self
            .repository
            .find_step(step_id)
            .await?
            .ok_or_else(|| DcaError::Inconsistent(format!("步骤标记后无法回读: {}", step_id)))?;

        self.check_plan_completion(step.plan_id).await?;
        Ok(step)
    }

    /// 标记单个步骤已取消（不影响计划状态）
    pub async fn mark_step_cancelled(&self, step_id: i64) -> Result<()> {
        self.repository.mark_step_cancelled(step_id).await
    }

    /// 取消计划并级联取消所有未到终态的步骤
    ///
    /// 计划不存在或不属于该用户时返回 None；
    /// 已到终态的计划原样返回，不再转换
    pub async fn cancel_plan(&self, plan_id: i64, owner: &str) -> Result<Option<DcaPlan>> {
        let plan = match self.repository.find_plan(plan_id, Some(owner)).await? {
            Some(plan) => plan,
            None => return Ok(None),
        };

        if plan.status.is_terminal() {
            warn!(
                "计划已处于终态，忽略取消请求: plan_id={}, status={}",
                plan_id,
                plan.status.as_str()
            );
            return Ok(Some(plan));
        }

        let affected = self.repository.cancel_open_steps(plan_id).await?;
        self.repository
            .update_plan_status(plan_id, PlanStatus::Cancelled, None)
            .await?;
        info!("计划已取消: plan_id={}, 级联取消步骤数={}", plan_id, affected);

        self.repository
            .find_plan(plan_id, Some(owner))
            .await?
            .ok_or_else(|| DcaError::Inconsistent(format!("计划取消后无法回读: {}", plan_id)))
            .map(Some)
    }

    /// 按券商订单ID反查步骤（供外部成交回报映射）
    pub async fn find_step_by_order_id(&self, order_id: &str) -> Result<Option<(DcaStep, DcaPlan)>> {
        self.repository.find_step_by_order_id(order_id).await
    }

    /// 计划中序号最小的 pending 步骤
    pub async fn next_pending_step(&self, plan_id: i64) -> Result<Option<DcaStep>> {
        self.repository.next_pending_step(plan_id).await
    }

    /// 计划完成检查：active 且所有步骤离开未决状态 → completed
    async fn check_plan_completion(&self, plan_id: i64) -> Result<()> {
        let plan = self
            .repository
            .find_plan(plan_id, None)
            .await?
            .ok_or_else(|| DcaError::Inconsistent(format!("步骤的父计划缺失: {}", plan_id)))?;

        if plan.status != PlanStatus::Active {
            return Ok(());
        }
        if !plan.all_steps_settled() {
            return Ok(());
        }

        self.repository
            .update_plan_status(plan_id, PlanStatus::Completed, Some(Utc::now()))
            .await?;
        info!("计划全部步骤已结清，自动完成: plan_id={}", plan_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{NewDcaPlan, NewDcaStep};
    use crate::domain::enums::{DcaStrategy, MarketClass, StepStatus};
    use crate::repositories::InMemoryPlanRepository;
    use rust_decimal_macros::dec;

    async fn setup(steps: usize) -> (Arc<InMemoryPlanRepository>, PlanLifecycleService, DcaPlan) {
        let repo = Arc::new(InMemoryPlanRepository::new());
        let service = PlanLifecycleService::new(repo.clone());

        let plan = repo
            .create_plan(NewDcaPlan {
                owner_id: "u1".to_string(),
                symbol: "BTC-USDT".to_string(),
                market: MarketClass::Crypto,
                total_amount: dec!(300000),
                split_count: steps as i32,
                strategy: DcaStrategy::Support,
                rsi_snapshot: Some(25.0),
                steps: (1..=steps)
                    .map(|i| NewDcaStep {
                        step_number: i as i32,
                        target_price: dec!(99000),
                        target_amount: dec!(100000),
                        target_quantity: dec!(1),
                        level_source: "synthetic".to_string(),
                        original_price: None,
                        tick_adjusted: false,
                        distance_pct: dec!(-1.00),
                    })
                    .collect(),
            })
            .await
            .unwrap();

        (repo, service, plan)
    }

    #[tokio::test]
    async fn test_mark_ordered_records_id_and_time() {
        let (_, service, plan) = setup(2).await;
        let step_id = plan.steps[0].id.unwrap();

        let step = service.mark_step_ordered(step_id, "ORD-1").await.unwrap();
        assert_eq!(step.status, StepStatus::Ordered);
        assert_eq!(step.order_id.as_deref(), Some("ORD-1"));
        assert!(step.ordered_at.is_some());
    }

    #[tokio::test]
    async fn test_filled_amount_defaults_to_price_times_qty() {
        let (_, service, plan) = setup(2).await;
        let step_id = plan.steps[0].id.unwrap();

        let step = service
            .mark_step_filled(step_id, dec!(98500), dec!(2), None)
            .await
            .unwrap();
        assert_eq!(step.filled_amount, Some(dec!(197000)));

        // 显式提供金额时以显式值为准
        let step_id2 = plan.steps[1].id.unwrap();
        let step2 = service
            .mark_step_filled(step_id2, dec!(98500), dec!(2), Some(dec!(196999)))
            .await
            .unwrap();
        assert_eq!(step2.filled_amount, Some(dec!(196999)));
    }

    #[tokio::test]
    async fn test_last_fill_completes_active_plan() {
        let (repo, service, plan) = setup(2).await;
        let plan_id = plan.id.unwrap();

        service
            .mark_step_filled(plan.steps[0].id.unwrap(), dec!(99000), dec!(1), None)
            .await
            .unwrap();
        let mid = repo.find_plan(plan_id, None).await.unwrap().unwrap();
        assert_eq!(mid.status, PlanStatus::Active);
        assert!(mid.completed_at.is_none());

        service
            .mark_step_filled(plan.steps[1].id.unwrap(), dec!(98000), dec!(1), None)
            .await
            .unwrap();
        let done = repo.find_plan(plan_id, None).await.unwrap().unwrap();
        assert_eq!(done.status, PlanStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_fill_on_cancelled_plan_does_not_resurrect() {
        let (repo, service, plan) = setup(2).await;
        let plan_id = plan.id.unwrap();

        service.cancel_plan(plan_id, "u1").await.unwrap();

        // 取消后到达的成交回报只更新步骤，不改变计划终态
        service
            .mark_step_filled(plan.steps[0].id.unwrap(), dec!(99000), dec!(1), None)
            .await
            .unwrap();
        service
            .mark_step_filled(plan.steps[1].id.unwrap(), dec!(98000), dec!(1), None)
            .await
            .unwrap();

        let reloaded = repo.find_plan(plan_id, None).await.unwrap().unwrap();
        assert_eq!(reloaded.status, PlanStatus::Cancelled);
        assert!(reloaded.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_plan_cascades_only_open_steps() {
        let (_repo, service, plan) = setup(3).await;
        let plan_id = plan.id.unwrap();

        service
            .mark_step_filled(plan.steps[0].id.unwrap(), dec!(99000), dec!(1), None)
            .await
            .unwrap();
        service
            .mark_step_ordered(plan.steps[2].id.unwrap(), "ORD-3")
            .await
            .unwrap();

        let cancelled = service.cancel_plan(plan_id, "u1").await.unwrap().unwrap();
        assert_eq!(cancelled.status, PlanStatus::Cancelled);
        assert_eq!(cancelled.steps[0].status, StepStatus::Filled);
        assert_eq!(cancelled.steps[1].status, StepStatus::Cancelled);
        assert_eq!(cancelled.steps[2].status, StepStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_plan_owner_scope_and_terminal() {
        let (_, service, plan) = setup(2).await;
        let plan_id = plan.id.unwrap();

        // 非拥有者取消返回 None
        assert!(service.cancel_plan(plan_id, "intruder").await.unwrap().is_none());

        let first = service.cancel_plan(plan_id, "u1").await.unwrap().unwrap();
        assert_eq!(first.status, PlanStatus::Cancelled);

        // 终态计划再次取消原样返回
        let again = service.cancel_plan(plan_id, "u1").await.unwrap().unwrap();
        assert_eq!(again.status, PlanStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_find_step_by_order_id_roundtrip() {
        let (_, service, plan) = setup(2).await;
        service
            .mark_step_ordered(plan.steps[1].id.unwrap(), "ORD-X")
            .await
            .unwrap();

        let (step, parent) = service.find_step_by_order_id("ORD-X").await.unwrap().unwrap();
        assert_eq!(step.step_number, 2);
        assert_eq!(parent.id, plan.id);
    }
}
