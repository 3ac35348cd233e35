//! 外部协作方接口
//!
//! 现价/支撑阻力位发现、技术指标、最小报价单位修正、下单网关
//! 都不属于本引擎，这里只定义统一接口

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::enums::{MarketClass, OrderSide, OrderType};
use crate::domain::value_objects::PriceLevel;
use crate::error::Result;

/// 支撑/阻力位查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportResistance {
    /// 当前价格
    pub current_price: Decimal,
    /// 支撑位列表（距现价由近到远，均低于现价）
    pub supports: Vec<PriceLevel>,
    /// 阻力位列表
    pub resistances: Vec<PriceLevel>,
}

/// 技术指标查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub value: f64,
}

/// 行情数据接口
#[async_trait]
pub trait MarketData: Send + Sync {
    /// 获取现价与支撑/阻力位
    async fn support_resistance(&self, symbol: &str) -> Result<SupportResistance>;

    /// 获取技术指标（如 "rsi"）
    async fn indicator(&self, symbol: &str, name: &str) -> Result<IndicatorValue>;
}

/// 最小报价单位修正接口
///
/// 将价格修正到交易所合法的报价网格上，方向敏感：
/// 买单向更便宜方向取整，卖单向更贵方向取整
pub trait TickConformer: Send + Sync {
    fn conform(&self, price: Decimal, market: MarketClass, side: OrderSide) -> Decimal;
}

/// 下单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// 标的代码
    pub symbol: String,
    /// 买卖方向
    pub side: OrderSide,
    /// 订单类型
    pub order_type: OrderType,
    /// 委托金额
    pub amount: Decimal,
    /// 委托价格
    pub price: Decimal,
    /// 下单原因（携带计划/步骤来源，便于审计）
    pub reason: String,
}

/// 下单网关响应
///
/// 不同券商/交易所返回的订单ID字段名各不相同，
/// `payload` 保留原始响应体，由 [`OrderAck::order_id`] 按已知形态逐一尝试解析
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// 网关是否受理成功
    pub success: bool,
    /// 原始响应体
    pub payload: Value,
}

/// 订单ID可能出现的字段名（按优先级）
const ORDER_ID_KEYS: [&str; 4] = ["order_id", "orderId", "ordId", "id"];

fn probe_order_id(value: &Value) -> Option<String> {
    for key in ORDER_ID_KEYS {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

impl OrderAck {
    pub fn ok(payload: Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn rejected(payload: Value) -> Self {
        Self {
            success: false,
            payload,
        }
    }

    /// 从响应体中解析订单ID
    ///
    /// 依次尝试：顶层字段 → `data` 数组首元素或对象 → `output` 对象。
    /// 全部落空返回 None（网关称成功却拿不到订单ID，由调用方按致命不一致处理）
    pub fn order_id(&self) -> Option<String> {
        if let Some(id) = probe_order_id(&self.payload) {
            return Some(id);
        }
        if let Some(data) = self.payload.get("data") {
            let hit = match data {
                Value::Array(items) => items.first().and_then(probe_order_id),
                Value::Object(_) => probe_order_id(data),
                _ => None,
            };
            if hit.is_some() {
                return hit;
            }
        }
        self.payload.get("output").and_then(probe_order_id)
    }
}

/// 下单网关接口
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// 提交一笔委托，返回网关受理结果
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck>;
}
