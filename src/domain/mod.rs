//! 领域层：实体、枚举、值对象与对外协作接口

pub mod entities;
pub mod enums;
pub mod traits;
pub mod value_objects;

pub use entities::{DcaPlan, DcaStep, NewDcaPlan, NewDcaStep};
pub use enums::{DcaStrategy, MarketClass, OrderSide, OrderType, PlanStatus, StepStatus, WeightMode};
pub use traits::{MarketData, OrderGateway, PlanRepository, TickConformer};
pub use value_objects::PriceLevel;
