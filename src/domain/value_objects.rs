//! 值对象

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 候选买入价位
///
/// `source` 为自由文本的来源标签：外部支撑位检测给出的标签
/// （如 "fractal_low"、"bollinger_lower"），或引擎生成的
/// "interpolated" / "equal_spaced" / "synthetic" / "aggressive_first"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub source: String,
}

impl PriceLevel {
    pub fn new(price: Decimal, source: impl Into<String>) -> Self {
        Self {
            price,
            source: source.into(),
        }
    }
}
