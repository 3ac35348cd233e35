//! 内存计划仓储
//!
//! 与 MySQL 实现遵守同一套接口语义（原子创建、行级修改、倒序列表），
//! 供测试与纸面交易环境使用，无外部依赖

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::entities::{DcaPlan, DcaStep, NewDcaPlan};
use crate::domain::enums::{PlanStatus, StepStatus};
use crate::domain::traits::PlanRepository;
use crate::error::{DcaError, Result};

pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<i64, DcaPlan>>,
    next_plan_id: AtomicI64,
    next_step_id: AtomicI64,
}

impl Default for InMemoryPlanRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
            next_plan_id: AtomicI64::new(1),
            next_step_id: AtomicI64::new(1),
        }
    }

    /// 定位包含指定步骤的计划并对该步骤应用修改
    async fn mutate_step<F>(&self, step_id: i64, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut DcaStep),
    {
        let mut plans = self.plans.write().await;
        for plan in plans.values_mut() {
            if let Some(step) = plan.steps.iter_mut().find(|s| s.id == Some(step_id)) {
                mutate(step);
                plan.updated_at = Utc::now();
                return Ok(());
            }
        }
        Err(DcaError::Database(format!("步骤不存在: {}", step_id)))
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn create_plan(&self, new_plan: NewDcaPlan) -> Result<DcaPlan> {
        let now = Utc::now();
        let plan_id = self.next_plan_id.fetch_add(1, Ordering::SeqCst);

        let mut steps = Vec::with_capacity(new_plan.steps.len());
        for spec in &new_plan.steps {
            let mut step = DcaStep::from_spec(plan_id, spec);
            step.id = Some(self.next_step_id.fetch_add(1, Ordering::SeqCst));
            steps.push(step);
        }
        steps.sort_by_key(|s| s.step_number);

        let plan = DcaPlan {
            id: Some(plan_id),
            owner_id: new_plan.owner_id,
            symbol: new_plan.symbol,
            market: new_plan.market,
            total_amount: new_plan.total_amount,
            split_count: new_plan.split_count,
            strategy: new_plan.strategy,
            status: PlanStatus::Active,
            rsi_snapshot: new_plan.rsi_snapshot,
            created_at: now,
            updated_at: now,
            completed_at: None,
            steps,
        };

        // 单次写锁插入即是原子创建
        self.plans.write().await.insert(plan_id, plan.clone());
        Ok(plan)
    }

    async fn find_plan(&self, plan_id: i64, owner: Option<&str>) -> Result<Option<DcaPlan>> {
        let plans = self.plans.read().await;
        Ok(plans
            .get(&plan_id)
            .filter(|p| owner.map_or(true, |o| p.owner_id == o))
            .cloned())
    }

    async fn list_plans(
        &self,
        owner: &str,
        status: Option<PlanStatus>,
        symbol: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DcaPlan>> {
        let plans = self.plans.read().await;
        let mut result: Vec<DcaPlan> = plans
            .values()
            .filter(|p| p.owner_id == owner)
            .filter(|p| status.map_or(true, |s| p.status == s))
            .filter(|p| symbol.map_or(true, |s| p.symbol == s))
            .cloned()
            .collect();

        // 创建时间相同（测试内常见）时用ID保证稳定排序
        result.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        result.truncate(limit.max(0) as usize);
        Ok(result)
    }

    async fn find_step(&self, step_id: i64) -> Result<Option<DcaStep>> {
        let plans = self.plans.read().await;
        Ok(plans
            .values()
            .flat_map(|p| p.steps.iter())
            .find(|s| s.id == Some(step_id))
            .cloned())
    }

    async fn find_step_by_order_id(&self, order_id: &str) -> Result<Option<(DcaStep, DcaPlan)>> {
        let plans = self.plans.read().await;
        for plan in plans.values() {
            if let Some(step) = plan
                .steps
                .iter()
                .find(|s| s.order_id.as_deref() == Some(order_id))
            {
                return Ok(Some((step.clone(), plan.clone())));
            }
        }
        Ok(None)
    }

    async fn next_pending_step(&self, plan_id: i64) -> Result<Option<DcaStep>> {
        let plans = self.plans.read().await;
        Ok(plans.get(&plan_id).and_then(|p| {
            p.steps
                .iter()
                .filter(|s| s.status == StepStatus::Pending)
                .min_by_key(|s| s.step_number)
                .cloned()
        }))
    }

    async fn mark_step_ordered(
        &self,
        step_id: i64,
        order_id: &str,
        ordered_at: DateTime<Utc>,
    ) -> Result<()> {
        let order_id = order_id.to_string();
        self.mutate_step(step_id, |step| {
            step.status = StepStatus::Ordered;
            step.order_id = Some(order_id);
            step.ordered_at = Some(ordered_at);
        })
        .await
    }

    async fn mark_step_filled(
        &self,
        step_id: i64,
        filled_price: Decimal,
        filled_quantity: Decimal,
        filled_amount: Decimal,
        filled_at: DateTime<Utc>,
    ) -> Result<()> {
        self.mutate_step(step_id, |step| {
            step.status = StepStatus::Filled;
            step.filled_price = Some(filled_price);
            step.filled_quantity = Some(filled_quantity);
            step.filled_amount = Some(filled_amount);
            step.filled_at = Some(filled_at);
        })
        .await
    }

    async fn mark_step_cancelled(&self, step_id: i64) -> Result<()> {
        self.mutate_step(step_id, |step| {
            step.status = StepStatus::Cancelled;
        })
        .await
    }

    async fn cancel_open_steps(&self, plan_id: i64) -> Result<u64> {
        let mut plans = self.plans.write().await;
        let plan = plans
            .get_mut(&plan_id)
            .ok_or_else(|| DcaError::Database(format!("计划不存在: {}", plan_id)))?;

        let mut affected = 0;
        for step in plan.steps.iter_mut() {
            if step.status.is_open() {
                step.status = StepStatus::Cancelled;
                affected += 1;
            }
        }
        plan.updated_at = Utc::now();
        Ok(affected)
    }

    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut plans = self.plans.write().await;
        let plan = plans
            .get_mut(&plan_id)
            .ok_or_else(|| DcaError::Database(format!("计划不存在: {}", plan_id)))?;
        plan.status = status;
        if completed_at.is_some() {
            plan.completed_at = completed_at;
        }
        plan.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewDcaStep;
    use crate::domain::enums::{DcaStrategy, MarketClass};
    use rust_decimal_macros::dec;

    fn new_plan(owner: &str, symbol: &str, steps: usize) -> NewDcaPlan {
        NewDcaPlan {
            owner_id: owner.to_string(),
            symbol: symbol.to_string(),
            market: MarketClass::Crypto,
            total_amount: dec!(300000),
            split_count: steps as i32,
            strategy: DcaStrategy::Support,
            rsi_snapshot: None,
            steps: (1..=steps)
                .map(|i| NewDcaStep {
                    step_number: i as i32,
                    target_price: dec!(99000) - Decimal::from(i as i64 * 1000),
                    target_amount: dec!(100000),
                    target_quantity: dec!(1),
                    level_source: "synthetic".to_string(),
                    original_price: None,
                    tick_adjusted: false,
                    distance_pct: dec!(-1.00),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_pending_steps() {
        let repo = InMemoryPlanRepository::new();
        let plan = repo.create_plan(new_plan("u1", "BTC-USDT", 3)).await.unwrap();

        assert!(plan.id.is_some());
        assert_eq!(plan.status, PlanStatus::Active);
        assert_eq!(plan.steps.len(), 3);
        assert!(plan.steps.iter().all(|s| s.id.is_some()));
        assert!(plan.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn test_find_plan_owner_scope() {
        let repo = InMemoryPlanRepository::new();
        let plan = repo.create_plan(new_plan("u1", "BTC-USDT", 2)).await.unwrap();
        let id = plan.id.unwrap();

        assert!(repo.find_plan(id, Some("u1")).await.unwrap().is_some());
        assert!(repo.find_plan(id, Some("u2")).await.unwrap().is_none());
        assert!(repo.find_plan(id, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_plans_filters_and_limit() {
        let repo = InMemoryPlanRepository::new();
        repo.create_plan(new_plan("u1", "BTC-USDT", 2)).await.unwrap();
        repo.create_plan(new_plan("u1", "ETH-USDT", 2)).await.unwrap();
        repo.create_plan(new_plan("u2", "BTC-USDT", 2)).await.unwrap();

        let all = repo.list_plans("u1", None, None, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        // 倒序：后创建的在前
        assert_eq!(all[0].symbol, "ETH-USDT");

        let btc = repo
            .list_plans("u1", None, Some("BTC-USDT"), 10)
            .await
            .unwrap();
        assert_eq!(btc.len(), 1);

        let limited = repo.list_plans("u1", None, None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let active = repo
            .list_plans("u1", Some(PlanStatus::Completed), None, 10)
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_mark_ordered_overwrites_last_write_wins() {
        let repo = InMemoryPlanRepository::new();
        let plan = repo.create_plan(new_plan("u1", "BTC-USDT", 2)).await.unwrap();
        let step_id = plan.steps[0].id.unwrap();

        repo.mark_step_ordered(step_id, "ORD-1", Utc::now()).await.unwrap();
        repo.mark_step_ordered(step_id, "ORD-2", Utc::now()).await.unwrap();

        let step = repo.find_step(step_id).await.unwrap().unwrap();
        assert_eq!(step.status, StepStatus::Ordered);
        assert_eq!(step.order_id.as_deref(), Some("ORD-2"));
        assert!(step.ordered_at.is_some());
    }

    #[tokio::test]
    async fn test_find_step_by_order_id() {
        let repo = InMemoryPlanRepository::new();
        let plan = repo.create_plan(new_plan("u1", "BTC-USDT", 2)).await.unwrap();
        let step_id = plan.steps[1].id.unwrap();

        repo.mark_step_ordered(step_id, "ORD-9", Utc::now()).await.unwrap();

        let (step, parent) = repo.find_step_by_order_id("ORD-9").await.unwrap().unwrap();
        assert_eq!(step.id, Some(step_id));
        assert_eq!(parent.id, plan.id);
        assert!(repo.find_step_by_order_id("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_pending_step_is_lowest_number() {
        let repo = InMemoryPlanRepository::new();
        let plan = repo.create_plan(new_plan("u1", "BTC-USDT", 3)).await.unwrap();
        let plan_id = plan.id.unwrap();

        let next = repo.next_pending_step(plan_id).await.unwrap().unwrap();
        assert_eq!(next.step_number, 1);

        repo.mark_step_ordered(plan.steps[0].id.unwrap(), "O1", Utc::now())
            .await
            .unwrap();
        let next = repo.next_pending_step(plan_id).await.unwrap().unwrap();
        assert_eq!(next.step_number, 2);
    }

    #[tokio::test]
    async fn test_cancel_open_steps_skips_terminal() {
        let repo = InMemoryPlanRepository::new();
        let plan = repo.create_plan(new_plan("u1", "BTC-USDT", 3)).await.unwrap();
        let plan_id = plan.id.unwrap();

        repo.mark_step_filled(
            plan.steps[0].id.unwrap(),
            dec!(99000),
            dec!(1),
            dec!(99000),
            Utc::now(),
        )
        .await
        .unwrap();

        let affected = repo.cancel_open_steps(plan_id).await.unwrap();
        assert_eq!(affected, 2);

        let reloaded = repo.find_plan(plan_id, None).await.unwrap().unwrap();
        assert_eq!(reloaded.steps[0].status, StepStatus::Filled);
        assert_eq!(reloaded.steps[1].status, StepStatus::Cancelled);
        assert_eq!(reloaded.steps[2].status, StepStatus::Cancelled);
    }
}
