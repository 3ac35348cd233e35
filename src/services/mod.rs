//! 面向调用方的操作服务

mod dca_plan_service;
mod responses;

pub use dca_plan_service::{CreatePlanRequest, DcaPlanService, StatusRequest};
pub use responses::{
    CreatePlanResponse, PlanProgress, PlanStatusView, PlanSummary, StatusResponse, StepPreview,
    StepStatusView,
};
