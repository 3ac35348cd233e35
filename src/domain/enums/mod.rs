//! 领域枚举

mod order_enums;
mod plan_enums;

pub use order_enums::{OrderSide, OrderType};
pub use plan_enums::{DcaStrategy, MarketClass, PlanStatus, StepStatus, WeightMode};
