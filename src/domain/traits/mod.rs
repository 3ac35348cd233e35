//! 对外协作接口与仓储接口
//!
//! 遵循依赖倒置原则：引擎依赖接口，具体实现由调用方注入，
//! 测试中可直接替换为 fake 实现

mod collaborators;
mod plan_repository;

pub use collaborators::{
    IndicatorValue, MarketData, OrderAck, OrderGateway, OrderRequest, SupportResistance,
    TickConformer,
};
pub use plan_repository::PlanRepository;
