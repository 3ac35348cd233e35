//! 分批建仓（DCA）规划与执行引擎
//!
//! 给定总资金、分批数量与价位策略：
//! 1. `planner` 计算买入价位与各档资金权重
//! 2. `repositories` 将计划与步骤作为一个原子单元落库
//! 3. `execution` 按步骤顺序驱动下单网关，任一失败立即中止
//! 4. `lifecycle` 维护步骤/计划状态机（下单、成交、取消、自动完成）
//!
//! 行情、指标、最小报价单位修正、下单网关均为注入接口，
//! 见 [`domain::traits`]

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod execution;
pub mod lifecycle;
pub mod logger;
pub mod planner;
pub mod repositories;
pub mod services;

pub use config::ExecutionConfig;
pub use domain::entities::{DcaPlan, DcaStep};
pub use domain::enums::{DcaStrategy, MarketClass, OrderSide, OrderType, PlanStatus, StepStatus};
pub use domain::traits::{MarketData, OrderGateway, PlanRepository, TickConformer};
pub use error::{DcaError, Result};
pub use execution::{ExecutionCoordinator, ExecutionReport};
pub use lifecycle::PlanLifecycleService;
pub use repositories::{InMemoryPlanRepository, MySqlPlanRepository};
pub use services::{CreatePlanRequest, DcaPlanService, StatusRequest};
