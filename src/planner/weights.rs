//! 资金权重计算
//!
//! RSI 超卖时前置加权（越早的步骤买得越多），超买时后置加权，
//! 中性区间或缺失时等权

use crate::domain::enums::WeightMode;
use crate::error::{DcaError, Result};

/// RSI 超卖阈值
const RSI_OVERSOLD: f64 = 30.0;
/// RSI 超买阈值
const RSI_OVERBOUGHT: f64 = 50.0;

/// 根据RSI判定权重分布模式
pub fn weight_mode(rsi: Option<f64>) -> WeightMode {
    match rsi {
        Some(v) if v < RSI_OVERSOLD => WeightMode::FrontLoaded,
        Some(v) if v > RSI_OVERBOUGHT => WeightMode::BackLoaded,
        _ => WeightMode::Equal,
    }
}

/// 计算各步骤的资金权重
///
/// 返回长度为 `split_count` 的非负权重向量，和为1（浮点容差内）。
/// 前置/后置加权采用线性斜坡：w_i ∝ (N+1-i) 或 w_i ∝ i
pub fn compute_weights(rsi: Option<f64>, split_count: usize) -> Result<Vec<f64>> {
    if !(2..=5).contains(&split_count) {
        return Err(DcaError::InvalidInput(format!(
            "分批数量必须在2-5之间: {}",
            split_count
        )));
    }

    let raw: Vec<f64> = match weight_mode(rsi) {
        WeightMode::FrontLoaded => (1..=split_count)
            .map(|i| (split_count + 1 - i) as f64)
            .collect(),
        WeightMode::BackLoaded => (1..=split_count).map(|i| i as f64).collect(),
        WeightMode::Equal => vec![1.0; split_count],
    };

    let total: f64 = raw.iter().sum();
    Ok(raw.into_iter().map(|w| w / total).collect())
}
