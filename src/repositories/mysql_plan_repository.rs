//! 计划仓储实现 (基于 sqlx)
//!
//! 对应数据库表 `dca_plans` / `dca_steps`。
//! 计划与步骤在同一事务内落库；状态仅在本适配层与字符串互转

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, Pool};
use tracing::{debug, info};

use crate::domain::entities::{DcaPlan, DcaStep, NewDcaPlan};
use crate::domain::enums::{DcaStrategy, MarketClass, PlanStatus, StepStatus};
use crate::domain::traits::PlanRepository;
use crate::error::{DcaError, Result};

/// 计划数据库实体
#[derive(Debug, Clone, FromRow)]
struct DcaPlanRow {
    pub id: i64,
    pub owner_id: String,
    pub symbol: String,
    pub market: String,
    pub total_amount: Decimal,
    pub split_count: i32,
    pub strategy: String,
    pub status: String,
    pub rsi_snapshot: Option<f64>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    pub completed_at: Option<chrono::NaiveDateTime>,
}

/// 步骤数据库实体
#[derive(Debug, Clone, FromRow)]
struct DcaStepRow {
    pub id: i64,
    pub plan_id: i64,
    pub step_number: i32,
    pub target_price: Decimal,
    pub target_amount: Decimal,
    pub target_quantity: Decimal,
    pub status: String,
    pub filled_price: Option<Decimal>,
    pub filled_quantity: Option<Decimal>,
    pub filled_amount: Option<Decimal>,
    pub order_id: Option<String>,
    pub ordered_at: Option<chrono::NaiveDateTime>,
    pub filled_at: Option<chrono::NaiveDateTime>,
    pub level_source: String,
    pub original_price: Option<Decimal>,
    pub tick_adjusted: bool,
    pub distance_pct: Decimal,
}

impl DcaPlanRow {
    /// 转换为领域实体（不含步骤）
    fn to_domain(&self, steps: Vec<DcaStep>) -> Result<DcaPlan> {
        Ok(DcaPlan {
            id: Some(self.id),
            owner_id: self.owner_id.clone(),
            symbol: self.symbol.clone(),
            market: MarketClass::from_str(&self.market).map_err(DcaError::Inconsistent)?,
            total_amount: self.total_amount,
            split_count: self.split_count,
            strategy: DcaStrategy::from_str(&self.strategy).map_err(DcaError::Inconsistent)?,
            status: PlanStatus::from_str(&self.status).map_err(DcaError::Inconsistent)?,
            rsi_snapshot: self.rsi_snapshot,
            created_at: Utc.from_utc_datetime(&self.created_at),
            updated_at: Utc.from_utc_datetime(&self.updated_at),
            completed_at: self.completed_at.map(|dt| Utc.from_utc_datetime(&dt)),
            steps,
        })
    }
}

impl DcaStepRow {
    fn to_domain(&self) -> Result<DcaStep> {
        Ok(DcaStep {
            id: Some(self.id),
            plan_id: self.plan_id,
            step_number: self.step_number,
            target_price: self.target_price,
            target_amount: self.target_amount,
            target_quantity: self.target_quantity,
            status: StepStatus::from_str(&self.status).map_err(DcaError::Inconsistent)?,
            filled_price: self.filled_price,
            filled_quantity: self.filled_quantity,
            filled_amount: self.filled_amount,
            order_id: self.order_id.clone(),
            ordered_at: self.ordered_at.map(|dt| Utc.from_utc_datetime(&dt)),
            filled_at: self.filled_at.map(|dt| Utc.from_utc_datetime(&dt)),
            level_source: self.level_source.clone(),
            original_price: self.original_price,
            tick_adjusted: self.tick_adjusted,
            distance_pct: self.distance_pct,
        })
    }
}

const STEP_COLUMNS: &str = r#"id, plan_id, step_number, target_price, target_amount,
       target_quantity, status, filled_price, filled_quantity, filled_amount,
       order_id, ordered_at, filled_at, level_source, original_price,
       tick_adjusted, distance_pct"#;

const PLAN_COLUMNS: &str = r#"id, owner_id, symbol, market, total_amount, split_count,
       strategy, status, rsi_snapshot, created_at, updated_at, completed_at"#;

/// 计划仓储实现 (基于 sqlx)
pub struct MySqlPlanRepository {
    pool: Pool<MySql>,
}

impl MySqlPlanRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// 获取数据库连接池引用
    pub fn pool(&self) -> &Pool<MySql> {
        &self.pool
    }

    async fn load_steps(&self, plan_id: i64) -> Result<Vec<DcaStep>> {
        let sql = format!(
            "SELECT {} FROM dca_steps WHERE plan_id = ? ORDER BY step_number ASC",
            STEP_COLUMNS
        );
        let rows = sqlx::query_as::<_, DcaStepRow>(&sql)
            .bind(plan_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn load_plan_with_steps(&self, row: DcaPlanRow) -> Result<DcaPlan> {
        let steps = self.load_steps(row.id).await?;
        row.to_domain(steps)
    }
}

#[async_trait]
impl PlanRepository for MySqlPlanRepository {
    async fn create_plan(&self, new_plan: NewDcaPlan) -> Result<DcaPlan> {
        info!(
            "创建建仓计划: owner={}, symbol={}, strategy={}, splits={}",
            new_plan.owner_id,
            new_plan.symbol,
            new_plan.strategy.as_str(),
            new_plan.split_count
        );

        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"INSERT INTO dca_plans
               (owner_id, symbol, market, total_amount, split_count, strategy,
                status, rsi_snapshot, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&new_plan.owner_id)
        .bind(&new_plan.symbol)
        .bind(new_plan.market.as_str())
        .bind(new_plan.total_amount)
        .bind(new_plan.split_count)
        .bind(new_plan.strategy.as_str())
        .bind(PlanStatus::Active.as_str())
        .bind(new_plan.rsi_snapshot)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let plan_id = result.last_insert_id() as i64;

        for spec in &new_plan.steps {
            sqlx::query(
                r#"INSERT INTO dca_steps
                   (plan_id, step_number, target_price, target_amount, target_quantity,
                    status, level_source, original_price, tick_adjusted, distance_pct)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(plan_id)
            .bind(spec.step_number)
            .bind(spec.target_price)
            .bind(spec.target_amount)
            .bind(spec.target_quantity)
            .bind(StepStatus::Pending.as_str())
            .bind(&spec.level_source)
            .bind(spec.original_price)
            .bind(spec.tick_adjusted)
            .bind(spec.distance_pct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("建仓计划创建成功: plan_id={}", plan_id);

        // 回读校验：提交后的计划必须能立刻加载到
        self.find_plan(plan_id, None).await?.ok_or_else(|| {
            DcaError::Inconsistent(format!("计划创建后无法回读: plan_id={}", plan_id))
        })
    }

    async fn find_plan(&self, plan_id: i64, owner: Option<&str>) -> Result<Option<DcaPlan>> {
        debug!("查询计划: plan_id={}, owner={:?}", plan_id, owner);

        let row = match owner {
            Some(owner) => {
                let sql = format!(
                    "SELECT {} FROM dca_plans WHERE id = ? AND owner_id = ? LIMIT 1",
                    PLAN_COLUMNS
                );
                sqlx::query_as::<_, DcaPlanRow>(&sql)
                    .bind(plan_id)
                    .bind(owner)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM dca_plans WHERE id = ? LIMIT 1", PLAN_COLUMNS);
                sqlx::query_as::<_, DcaPlanRow>(&sql)
                    .bind(plan_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match row {
            Some(row) => Ok(Some(self.load_plan_with_steps(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_plans(
        &self,
        owner: &str,
        status: Option<PlanStatus>,
        symbol: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DcaPlan>> {
        debug!(
            "查询计划列表: owner={}, status={:?}, symbol={:?}, limit={}",
            owner, status, symbol, limit
        );

        let mut sql = format!("SELECT {} FROM dca_plans WHERE owner_id = ?", PLAN_COLUMNS);
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if symbol.is_some() {
            sql.push_str(" AND symbol = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, DcaPlanRow>(&sql).bind(owner);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        if let Some(symbol) = symbol {
            query = query.bind(symbol);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;

        let mut plans = Vec::with_capacity(rows.len());
        for row in rows {
            plans.push(self.load_plan_with_steps(row).await?);
        }
        Ok(plans)
    }

    async fn find_step(&self, step_id: i64) -> Result<Option<DcaStep>> {
        let sql = format!("SELECT {} FROM dca_steps WHERE id = ? LIMIT 1", STEP_COLUMNS);
        let row = sqlx::query_as::<_, DcaStepRow>(&sql)
            .bind(step_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.to_domain()).transpose()
    }

    async fn find_step_by_order_id(&self, order_id: &str) -> Result<Option<(DcaStep, DcaPlan)>> {
        debug!("根据订单ID反查步骤: order_id={}", order_id);

        let sql = format!(
            "SELECT {} FROM dca_steps WHERE order_id = ? LIMIT 1",
            STEP_COLUMNS
        );
        let row = sqlx::query_as::<_, DcaStepRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        let step = match row {
            Some(row) => row.to_domain()?,
            None => return Ok(None),
        };
        let plan = self.find_plan(step.plan_id, None).await?.ok_or_else(|| {
            DcaError::Inconsistent(format!("步骤存在但父计划缺失: plan_id={}", step.plan_id))
        })?;
        Ok(Some((step, plan)))
    }

    async fn next_pending_step(&self, plan_id: i64) -> Result<Option<DcaStep>> {
        let sql = format!(
            "SELECT {} FROM dca_steps WHERE plan_id = ? AND status = 'pending'
             ORDER BY step_number ASC LIMIT 1",
            STEP_COLUMNS
        );
        let row = sqlx::query_as::<_, DcaStepRow>(&sql)
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.to_domain()).transpose()
    }

    async fn mark_step_ordered(
        &self,
        step_id: i64,
        order_id: &str,
        ordered_at: DateTime<Utc>,
    ) -> Result<()> {
        info!("标记步骤已下单: step_id={}, order_id={}", step_id, order_id);

        sqlx::query(
            r#"UPDATE dca_steps SET status = 'ordered', order_id = ?, ordered_at = ?
               WHERE id = ?"#,
        )
        .bind(order_id)
        .bind(ordered_at.naive_utc())
        .bind(step_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_step_filled(
        &self,
        step_id: i64,
        filled_price: Decimal,
        filled_quantity: Decimal,
        filled_amount: Decimal,
        filled_at: DateTime<Utc>,
    ) -> Result<()> {
        info!(
            "标记步骤已成交: step_id={}, price={}, qty={}",
            step_id, filled_price, filled_quantity
        );

        sqlx::query(
            r#"UPDATE dca_steps SET status = 'filled', filled_price = ?,
               filled_quantity = ?, filled_amount = ?, filled_at = ?
               WHERE id = ?"#,
        )
        .bind(filled_price)
        .bind(filled_quantity)
        .bind(filled_amount)
        .bind(filled_at.naive_utc())
        .bind(step_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_step_cancelled(&self, step_id: i64) -> Result<()> {
        sqlx::query("UPDATE dca_steps SET status = 'cancelled' WHERE id = ?")
            .bind(step_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cancel_open_steps(&self, plan_id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE dca_steps SET status = 'cancelled'
               WHERE plan_id = ? AND status IN ('pending', 'ordered', 'partial')"#,
        )
        .bind(plan_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        info!(
            "更新计划状态: plan_id={}, status={}",
            plan_id,
            status.as_str()
        );

        match completed_at {
            Some(completed_at) => {
                sqlx::query(
                    r#"UPDATE dca_plans SET status = ?, completed_at = ?, updated_at = NOW()
                       WHERE id = ?"#,
                )
                .bind(status.as_str())
                .bind(completed_at.naive_utc())
                .bind(plan_id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("UPDATE dca_plans SET status = ?, updated_at = NOW() WHERE id = ?")
                    .bind(status.as_str())
                    .bind(plan_id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}
