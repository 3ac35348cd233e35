//! 统一错误类型定义

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DcaError>;

/// 引擎错误分类
///
/// - 输入校验错误在任何持久化/下单之前被拒绝，无副作用
/// - 分配错误使整个建仓计划创建失败，并指出问题步骤
/// - 执行期错误按步骤上报并中断顺序执行循环
#[derive(Error, Debug)]
pub enum DcaError {
    #[error("参数错误: {0}")]
    InvalidInput(String),

    #[error("步骤 {step} 分配金额过小, 最小可执行金额为 {min_amount}")]
    AllocationTooSmall { step: i32, min_amount: Decimal },

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("行情数据错误: {0}")]
    MarketData(String),

    #[error("下单网关错误: {0}")]
    Gateway(String),

    #[error("下单成功但无法从网关响应中解析订单ID: {0}")]
    MissingOrderId(String),

    #[error("数据不一致: {0}")]
    Inconsistent(String),

    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for DcaError {
    fn from(e: sqlx::Error) -> Self {
        DcaError::Database(e.to_string())
    }
}

impl From<anyhow::Error> for DcaError {
    fn from(e: anyhow::Error) -> Self {
        DcaError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for DcaError {
    fn from(e: serde_json::Error) -> Self {
        DcaError::Other(e.to_string())
    }
}
