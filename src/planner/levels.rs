//! 买入价位计算
//!
//! 输入的支撑位列表要求距现价由近到远排序（价格降序）、且均低于现价

use rust_decimal::Decimal;

use crate::domain::enums::DcaStrategy;
use crate::domain::value_objects::PriceLevel;
use crate::error::{DcaError, Result};

/// 支撑位缺失时的兜底递减比例（2%）
fn default_decrement() -> Decimal {
    Decimal::new(2, 2)
}

/// 计算买入价位序列
///
/// 返回恰好 `split_count` 个价位，每个价位携带来源标签
pub fn compute_levels(
    strategy: DcaStrategy,
    split_count: usize,
    current_price: Decimal,
    supports: &[PriceLevel],
) -> Result<Vec<PriceLevel>> {
    if !(2..=5).contains(&split_count) {
        return Err(DcaError::InvalidInput(format!(
            "分批数量必须在2-5之间: {}",
            split_count
        )));
    }
    if current_price <= Decimal::ZERO {
        return Err(DcaError::InvalidInput(format!(
            "现价必须大于0: {}",
            current_price
        )));
    }

    match strategy {
        DcaStrategy::Support => Ok(support_levels(split_count, current_price, supports)),
        DcaStrategy::Equal => Ok(equal_levels(split_count, current_price, supports)),
        DcaStrategy::Aggressive => {
            // 首单贴近现价抢先成交，其余按支撑位算法铺开
            let mut levels = vec![PriceLevel::new(
                current_price * Decimal::new(995, 3),
                "aggressive_first",
            )];
            levels.extend(support_levels(split_count - 1, current_price, supports));
            Ok(levels)
        }
    }
}

/// 支撑位策略
///
/// - 支撑位足够：直接取最近的N个，保留原始来源标签
/// - 支撑位不足：全部用上，再按最后两个支撑位的间距向下外推，标记 interpolated
/// - 没有支撑位：按现价每档递减2%合成，标记 synthetic
fn support_levels(count: usize, current_price: Decimal, supports: &[PriceLevel]) -> Vec<PriceLevel> {
    if supports.len() >= count {
        return supports[..count].to_vec();
    }

    if supports.is_empty() {
        let pct = default_decrement();
        return (1..=count)
            .map(|k| {
                PriceLevel::new(
                    current_price * (Decimal::ONE - pct * Decimal::from(k as i64)),
                    "synthetic",
                )
            })
            .collect();
    }

    let mut levels: Vec<PriceLevel> = supports.to_vec();
    let last = supports[supports.len() - 1].price;
    let gap = if supports.len() >= 2 {
        supports[supports.len() - 2].price - last
    } else {
        last * default_decrement()
    };
    // 支撑位排序异常导致间距非正时退回2%间距
    let gap = if gap > Decimal::ZERO {
        gap
    } else {
        last * default_decrement()
    };

    let mut price = last;
    while levels.len() < count {
        price -= gap;
        levels.push(PriceLevel::new(price, "interpolated"));
    }
    levels
}

/// 等间距策略
///
/// 在现价（不含）与下边界之间均分N档；下边界取最低支撑位，
/// 无支撑位时取现价的90%。第N档正好落在下边界上
fn equal_levels(count: usize, current_price: Decimal, supports: &[PriceLevel]) -> Vec<PriceLevel> {
    let floor = supports
        .iter()
        .map(|s| s.price)
        .min()
        .filter(|p| *p < current_price)
        .unwrap_or_else(|| current_price * Decimal::new(90, 2));

    let span = current_price - floor;
    (1..=count)
        .map(|k| {
            PriceLevel::new(
                current_price - span * Decimal::from(k as i64) / Decimal::from(count as i64),
                "equal_spaced",
            )
        })
        .collect()
}
