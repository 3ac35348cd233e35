//! 执行协调器 (ExecutionCoordinator)
//!
//! 将已持久化的计划逐步转化为真实委托。
//! 严格按 step_number 升序、单线程顺序执行：每一步的结果
//! （资金消耗、网关成败）决定是否继续下一步，任何失败立即中止
//! （fail-fast），已下出的委托不做回滚补偿。
//! 无论成败都返回已尝试步骤的结果列表，供调用方事后续跑

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::ExecutionConfig;
use crate::domain::entities::{DcaPlan, DcaStep};
use crate::domain::enums::{OrderSide, OrderType};
use crate::domain::traits::{OrderGateway, OrderRequest};
use crate::lifecycle::PlanLifecycleService;

/// 单步执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecutionResult {
    /// 步骤序号
    pub step: i32,
    /// 是否成功下单并记录
    pub success: bool,
    /// 券商订单ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// 委托价格
    pub price: Decimal,
    /// 委托金额
    pub amount: Decimal,
    /// 失败原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepExecutionResult {
    fn ok(step: &DcaStep, order_id: String) -> Self {
        Self {
            step: step.step_number,
            success: true,
            order_id: Some(order_id),
            price: step.target_price,
            amount: step.target_amount,
            error: None,
        }
    }

    fn failed(step: &DcaStep, error: String) -> Self {
        Self {
            step: step.step_number,
            success: false,
            order_id: None,
            price: step.target_price,
            amount: step.target_amount,
            error: Some(error),
        }
    }
}

/// 一次执行调用的汇总报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// 计划ID
    pub plan_id: i64,
    /// 已尝试步骤的逐一结果
    pub results: Vec<StepExecutionResult>,
    /// 实际成功下单的步骤序号
    pub executed_steps: Vec<i32>,
    /// 是否因失败提前中止
    pub aborted: bool,
}

pub struct ExecutionCoordinator {
    gateway: Arc<dyn OrderGateway>,
    lifecycle: Arc<PlanLifecycleService>,
    config: ExecutionConfig,
}

impl ExecutionCoordinator {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        lifecycle: Arc<PlanLifecycleService>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            gateway,
            lifecycle,
            config,
        }
    }

    /// 顺序执行计划中的步骤
    ///
    /// `execute_steps` 给出时仅执行该子集（仍按序号升序），
    /// 缺省执行全部步骤
    pub async fn execute_plan(
        &self,
        plan: &DcaPlan,
        execute_steps: Option<&[i32]>,
    ) -> ExecutionReport {
        let plan_id = plan.id.unwrap_or(0);
        let total = plan.split_count;

        let mut report = ExecutionReport {
            plan_id,
            results: Vec::new(),
            executed_steps: Vec::new(),
            aborted: false,
        };

        // 选中的序号必须都能在计划中找到，找不到按致命不一致处理
        if let Some(nums) = execute_steps {
            for n in nums {
                if plan.step_by_number(*n).is_none() {
                    let msg = format!("步骤 {} 在计划中不存在", n);
                    error!("plan_id={} {}", plan_id, msg);
                    report.results.push(StepExecutionResult {
                        step: *n,
                        success: false,
                        order_id: None,
                        price: Decimal::ZERO,
                        amount: Decimal::ZERO,
                        error: Some(msg),
                    });
                    report.aborted = true;
                    return report;
                }
            }
        }

        // steps 本身按 step_number 升序加载
        let selected: Vec<&DcaStep> = plan
            .steps
            .iter()
            .filter(|s| execute_steps.map_or(true, |nums| nums.contains(&s.step_number)))
            .collect();

        info!(
            "开始执行计划: plan_id={}, 选中步骤={:?}",
            plan_id,
            selected.iter().map(|s| s.step_number).collect::<Vec<_>>()
        );

        for step in selected {
            // 1. 单步资金上限（静态安全限制）
            if step.target_amount > self.config.max_step_amount {
                let msg = format!(
                    "步骤 {} 金额 {} 超过单步上限 {}",
                    step.step_number, step.target_amount, self.config.max_step_amount
                );
                error!("{}", msg);
                report.results.push(StepExecutionResult::failed(step, msg));
                report.aborted = true;
                break;
            }

            // 2. 提交限价买入委托，携带计划/步骤来源便于审计
            let request = OrderRequest {
                symbol: plan.symbol.clone(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                amount: step.target_amount,
                price: step.target_price,
                reason: format!("DCA plan {} step {}/{}", plan_id, step.step_number, total),
            };

            let ack = match self.gateway.place_order(&request).await {
                Ok(ack) => ack,
                Err(e) => {
                    error!("步骤 {} 下单请求失败: {}", step.step_number, e);
                    report
                        .results
                        .push(StepExecutionResult::failed(step, e.to_string()));
                    report.aborted = true;
                    break;
                }
            };

            if !ack.success {
                let msg = format!("网关拒绝下单: {}", ack.payload);
                error!("步骤 {} {}", step.step_number, msg);
                report.results.push(StepExecutionResult::failed(step, msg));
                report.aborted = true;
                break;
            }

            // 3. 网关称成功但解析不到订单ID，视为致命不一致
            let order_id = match ack.order_id() {
                Some(id) => id,
                None => {
                    let msg = format!("下单成功但响应中无订单ID: {}", ack.payload);
                    error!("步骤 {} {}", step.step_number, msg);
                    report.results.push(StepExecutionResult::failed(step, msg));
                    report.aborted = true;
                    break;
                }
            };

            // 4. 落库失败同样中止，绝不无声继续
            let step_id = match step.id {
                Some(id) => id,
                None => {
                    let msg = format!("步骤 {} 缺少持久化ID", step.step_number);
                    error!("{}", msg);
                    report.results.push(StepExecutionResult::failed(step, msg));
                    report.aborted = true;
                    break;
                }
            };
            if let Err(e) = self.lifecycle.mark_step_ordered(step_id, &order_id).await {
                let msg = format!("委托已提交({}), 但状态落库失败: {}", order_id, e);
                error!("步骤 {} {}", step.step_number, msg);
                report.results.push(StepExecutionResult::failed(step, msg));
                report.aborted = true;
                break;
            }

            info!(
                "步骤执行成功: plan_id={}, step={}, order_id={}",
                plan_id, step.step_number, order_id
            );
            report
                .results
                .push(StepExecutionResult::ok(step, order_id));
            report.executed_steps.push(step.step_number);
        }

        report
    }
}
