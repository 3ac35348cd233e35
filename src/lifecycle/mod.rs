//! 计划生命周期服务

mod plan_lifecycle_service;

pub use plan_lifecycle_service::PlanLifecycleService;
