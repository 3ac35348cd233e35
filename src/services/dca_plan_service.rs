//! 建仓计划服务 (DcaPlanService)
//!
//! 面向调用方的两个操作：创建计划（可选执行）与状态查询。
//! 所有外部协作方（行情、报价修正、下单网关）经构造函数注入

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ExecutionConfig;
use crate::domain::entities::{DcaPlan, NewDcaPlan};
use crate::domain::enums::{DcaStrategy, MarketClass, PlanStatus};
use crate::domain::traits::{MarketData, OrderGateway, PlanRepository, TickConformer};
use crate::domain::value_objects::PriceLevel;
use crate::error::{DcaError, Result};
use crate::execution::ExecutionCoordinator;
use crate::lifecycle::PlanLifecycleService;
use crate::planner;
use crate::services::responses::{
    CreatePlanResponse, PlanStatusView, PlanSummary, StatusResponse, StepPreview,
};

/// 计划创建请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanRequest {
    /// 用户ID
    pub owner: String,
    /// 标的代码
    pub symbol: String,
    /// 总投入资金（>0）
    pub total_amount: Decimal,
    /// 分批数量（2-5）
    pub split_count: i32,
    /// 策略（support | equal | aggressive）
    pub strategy: String,
    /// 仅生成计划、不实际下单（默认 true）
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// 市场类别提示，缺省按代码形态推断
    #[serde(default)]
    pub market: Option<MarketClass>,
    /// 仅执行指定步骤（1..=split_count 的子集）
    #[serde(default)]
    pub execute_steps: Option<Vec<i32>>,
}

fn default_dry_run() -> bool {
    true
}

/// 状态查询请求
///
/// `plan_id`、(`symbol`,`status`)、`status` 三选一；
/// status 还可取 "all"，默认 "active"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusRequest {
    pub owner: String,
    #[serde(default)]
    pub plan_id: Option<i64>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// 返回数量上限（1-1000，默认10）
    #[serde(default)]
    pub limit: Option<i64>,
}

pub struct DcaPlanService {
    market_data: Arc<dyn MarketData>,
    tick_conformer: Arc<dyn TickConformer>,
    repository: Arc<dyn PlanRepository>,
    lifecycle: Arc<PlanLifecycleService>,
    coordinator: ExecutionCoordinator,
}

impl DcaPlanService {
    pub fn new(
        market_data: Arc<dyn MarketData>,
        tick_conformer: Arc<dyn TickConformer>,
        repository: Arc<dyn PlanRepository>,
        gateway: Arc<dyn OrderGateway>,
        config: ExecutionConfig,
    ) -> Self {
        let lifecycle = Arc::new(PlanLifecycleService::new(repository.clone()));
        let coordinator = ExecutionCoordinator::new(gateway, lifecycle.clone(), config);
        Self {
            market_data,
            tick_conformer,
            repository,
            lifecycle,
            coordinator,
        }
    }

    /// 生命周期服务（供外部成交回报调用 mark_step_filled 等）
    pub fn lifecycle(&self) -> Arc<PlanLifecycleService> {
        self.lifecycle.clone()
    }

    /// 创建建仓计划，按需顺序执行
    ///
    /// 失败统一折叠为 `{success:false, error}`：
    /// 持久化之前失败不产生计划ID；执行中途失败仍返回计划ID与部分结果
    pub async fn create_plan(&self, request: CreatePlanRequest) -> CreatePlanResponse {
        let (plan, summary) = match self.prepare_and_persist(&request).await {
            Ok(ok) => ok,
            Err(e) => {
                warn!("计划创建失败: {}", e);
                return CreatePlanResponse::failure(request.dry_run, e.to_string());
            }
        };

        let previews: Vec<StepPreview> = plan.steps.iter().map(StepPreview::from_step).collect();
        let mut response = CreatePlanResponse {
            success: true,
            error: None,
            dry_run: request.dry_run,
            executed: false,
            plan_id: plan.id,
            plans: previews,
            summary: Some(summary),
            execution_results: None,
            executed_steps: None,
        };

        if request.dry_run {
            return response;
        }

        // 非 dry_run：顺序执行（全量或指定子集），失败即中止但保留已有进展
        let report = self
            .coordinator
            .execute_plan(&plan, request.execute_steps.as_deref())
            .await;

        response.executed = true;
        response.success = !report.aborted;
        if report.aborted {
            response.error = report
                .results
                .iter()
                .rev()
                .find_map(|r| r.error.clone())
                .or_else(|| Some("执行中止".to_string()));
        }
        response.executed_steps = Some(report.executed_steps.clone());
        response.execution_results = Some(report.results);
        response
    }

    /// 查询计划状态
    pub async fn plan_status(&self, request: StatusRequest) -> StatusResponse {
        match self.query_plans(&request).await {
            Ok(plans) => {
                let views: Vec<PlanStatusView> =
                    plans.iter().map(PlanStatusView::from_plan).collect();
                StatusResponse {
                    success: true,
                    error: None,
                    total_plans: views.len(),
                    plans: views,
                }
            }
            Err(e) => {
                warn!("计划状态查询失败: {}", e);
                StatusResponse::failure(e.to_string())
            }
        }
    }

    // ========================================================================
    // 内部实现
    // ========================================================================

    /// 校验 → 行情 → 规划 → 原子落库
    async fn prepare_and_persist(
        &self,
        request: &CreatePlanRequest,
    ) -> Result<(DcaPlan, PlanSummary)> {
        let strategy = self.validate_create(request)?;
        let market = request
            .market
            .unwrap_or_else(|| MarketClass::infer(&request.symbol));
        let symbol = request.symbol.trim();
        let split_count = request.split_count as usize;

        let sr = self.market_data.support_resistance(symbol).await?;
        let current_price = sr.current_price;
        if current_price <= Decimal::ZERO {
            return Err(DcaError::MarketData(format!(
                "现价非法: {}",
                current_price
            )));
        }

        // 支撑位要求低于现价、距现价由近到远；对外部数据做防御性整理
        let mut supports: Vec<PriceLevel> = sr
            .supports
            .into_iter()
            .filter(|s| s.price < current_price && s.price > Decimal::ZERO)
            .collect();
        supports.sort_by(|a, b| b.price.cmp(&a.price));

        // RSI 获取失败不阻断创建，仅降级为等权
        let rsi = match self.market_data.indicator(symbol, "rsi").await {
            Ok(v) => Some(v.value),
            Err(e) => {
                warn!("获取RSI失败，使用等权分配: symbol={}, err={}", symbol, e);
                None
            }
        };

        let weights = planner::compute_weights(rsi, split_count)?;
        let levels = planner::compute_levels(strategy, split_count, current_price, &supports)?;
        let steps = planner::allocate_steps(
            &levels,
            &weights,
            request.total_amount,
            current_price,
            market,
            self.tick_conformer.as_ref(),
        )?;

        let plan = self
            .repository
            .create_plan(NewDcaPlan {
                owner_id: request.owner.clone(),
                symbol: symbol.to_string(),
                market,
                total_amount: request.total_amount,
                split_count: request.split_count,
                strategy,
                rsi_snapshot: rsi,
                steps,
            })
            .await?;

        info!(
            "建仓计划已创建: plan_id={:?}, symbol={}, strategy={}, dry_run={}",
            plan.id,
            symbol,
            strategy.as_str(),
            request.dry_run
        );

        let summary = build_summary(&plan, current_price, rsi);
        Ok((plan, summary))
    }

    /// 输入校验：在任何持久化/网关调用之前完成，失败无副作用
    fn validate_create(&self, request: &CreatePlanRequest) -> Result<DcaStrategy> {
        if request.symbol.trim().is_empty() {
            return Err(DcaError::InvalidInput("标的代码不能为空".to_string()));
        }
        if request.total_amount <= Decimal::ZERO {
            return Err(DcaError::InvalidInput(format!(
                "总金额必须大于0: {}",
                request.total_amount
            )));
        }
        if !(2..=5).contains(&request.split_count) {
            return Err(DcaError::InvalidInput(format!(
                "分批数量必须在2-5之间: {}",
                request.split_count
            )));
        }
        let strategy = DcaStrategy::from_str(&request.strategy)
            .map_err(|_| DcaError::InvalidInput(format!("未知策略: {}", request.strategy)))?;

        if let Some(steps) = &request.execute_steps {
            if steps.is_empty() {
                return Err(DcaError::InvalidInput(
                    "execute_steps 不能为空列表".to_string(),
                ));
            }
            for n in steps {
                if !(1..=request.split_count).contains(n) {
                    return Err(DcaError::InvalidInput(format!(
                        "execute_steps 越界: {} (合法范围 1-{})",
                        n, request.split_count
                    )));
                }
            }
        }
        Ok(strategy)
    }

    async fn query_plans(&self, request: &StatusRequest) -> Result<Vec<DcaPlan>> {
        let limit = request.limit.unwrap_or(10);
        if !(1..=1000).contains(&limit) {
            return Err(DcaError::InvalidInput(format!(
                "limit 必须在1-1000之间: {}",
                limit
            )));
        }

        // 按计划ID查询时直接返回该计划（不附加状态过滤）
        if let Some(plan_id) = request.plan_id {
            return Ok(self
                .repository
                .find_plan(plan_id, Some(&request.owner))
                .await?
                .into_iter()
                .collect());
        }

        let status_filter = match request.status.as_deref().unwrap_or("active") {
            "all" => None,
            s => Some(
                PlanStatus::from_str(s)
                    .map_err(|_| DcaError::InvalidInput(format!("未知状态过滤: {}", s)))?,
            ),
        };

        self.repository
            .list_plans(
                &request.owner,
                status_filter,
                request.symbol.as_deref(),
                limit,
            )
            .await
    }
}

/// 汇总信息：数量加权均价、总数量、档位深度等
fn build_summary(plan: &DcaPlan, current_price: Decimal, rsi: Option<f64>) -> PlanSummary {
    let total_quantity: Decimal = plan.steps.iter().map(|s| s.target_quantity).sum();
    let weighted_value: Decimal = plan
        .steps
        .iter()
        .map(|s| s.target_price * s.target_quantity)
        .sum();
    let avg_target_price = if total_quantity > Decimal::ZERO {
        (weighted_value / total_quantity).round_dp(8)
    } else {
        Decimal::ZERO
    };

    let min_price = plan
        .steps
        .iter()
        .map(|s| s.target_price)
        .min()
        .unwrap_or(current_price);
    let price_range_pct =
        ((current_price - min_price) / current_price * Decimal::ONE_HUNDRED).round_dp(2);

    PlanSummary {
        symbol: plan.symbol.clone(),
        current_price,
        rsi_14: rsi,
        strategy: plan.strategy.as_str().to_string(),
        total_amount: plan.total_amount,
        avg_target_price,
        total_quantity,
        price_range_pct,
        weight_mode: planner::weight_mode(rsi).as_str().to_string(),
    }
}
