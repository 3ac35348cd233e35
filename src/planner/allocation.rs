//! 步骤资金分配与数量推导
//!
//! 价位 × 权重 → 每步金额；价格过最小报价单位修正后推导数量。
//! 任一步骤数量归零时整个计划创建失败，而不是悄悄跳过该步骤

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::domain::entities::NewDcaStep;
use crate::domain::enums::{MarketClass, OrderSide};
use crate::domain::traits::TickConformer;
use crate::domain::value_objects::PriceLevel;
use crate::error::{DcaError, Result};

/// 加密货币数量精度（小数位）
const CRYPTO_QTY_SCALE: u32 = 8;

/// 由价位与权重推导各步骤规格
///
/// - `step_amount = total_amount × weight_i`
/// - 原始价位经 `TickConformer` 做买方向修正；发生修正时保留原始价并打标
/// - 数量：加密货币按金额/价格保留8位小数，股票向下取整到整数股
/// - `distance_pct`：修正后价格相对现价的距离百分比，保留2位小数
pub fn allocate_steps(
    levels: &[PriceLevel],
    weights: &[f64],
    total_amount: Decimal,
    current_price: Decimal,
    market: MarketClass,
    tick_conformer: &dyn TickConformer,
) -> Result<Vec<NewDcaStep>> {
    if levels.len() != weights.len() {
        return Err(DcaError::Inconsistent(format!(
            "价位数量({})与权重数量({})不一致",
            levels.len(),
            weights.len()
        )));
    }

    let mut steps = Vec::with_capacity(levels.len());
    for (idx, (level, weight)) in levels.iter().zip(weights.iter()).enumerate() {
        let step_number = (idx + 1) as i32;

        let weight = Decimal::from_f64(*weight)
            .ok_or_else(|| DcaError::Inconsistent(format!("步骤 {} 权重非法: {}", step_number, weight)))?;
        let amount = total_amount * weight;

        let conformed = tick_conformer.conform(level.price, market, OrderSide::Buy);
        if conformed <= Decimal::ZERO {
            return Err(DcaError::InvalidInput(format!(
                "步骤 {} 修正后价格非法: {}",
                step_number, conformed
            )));
        }
        let tick_adjusted = conformed != level.price;

        let quantity = match market {
            MarketClass::Crypto => (amount / conformed).round_dp(CRYPTO_QTY_SCALE),
            MarketClass::DomesticEquity | MarketClass::ForeignEquity => (amount / conformed).floor(),
        };
        if quantity <= Decimal::ZERO {
            // 最小可执行金额 = 一个最小交易单位的价格
            let min_unit = if market.is_equity() {
                Decimal::ONE
            } else {
                Decimal::new(1, CRYPTO_QTY_SCALE)
            };
            return Err(DcaError::AllocationTooSmall {
                step: step_number,
                min_amount: conformed * min_unit,
            });
        }

        let distance_pct =
            ((conformed - current_price) / current_price * Decimal::ONE_HUNDRED).round_dp(2);

        steps.push(NewDcaStep {
            step_number,
            target_price: conformed,
            target_amount: amount,
            target_quantity: quantity,
            level_source: level.source.clone(),
            original_price: if tick_adjusted { Some(level.price) } else { None },
            tick_adjusted,
            distance_pct,
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// 原样放行的修正器（加密货币等无修正场景）
    struct PassThroughTick;

    impl TickConformer for PassThroughTick {
        fn conform(&self, price: Decimal, _market: MarketClass, _side: OrderSide) -> Decimal {
            price
        }
    }

    /// 向下取整到500的倍数（国内股票典型报价档位）
    struct StepOf500Tick;

    impl TickConformer for StepOf500Tick {
        fn conform(&self, price: Decimal, _market: MarketClass, side: OrderSide) -> Decimal {
            let unit = dec!(500);
            match side {
                OrderSide::Buy => (price / unit).floor() * unit,
                OrderSide::Sell => (price / unit).ceil() * unit,
            }
        }
    }

    fn levels(prices: &[i64]) -> Vec<PriceLevel> {
        prices
            .iter()
            .map(|p| PriceLevel::new(Decimal::from(*p), "synthetic"))
            .collect()
    }

    #[test]
    fn test_amounts_follow_weights() {
        let steps = allocate_steps(
            &levels(&[99000, 98000]),
            &[0.5, 0.5],
            dec!(300000),
            dec!(100000),
            MarketClass::Crypto,
            &PassThroughTick,
        )
        .unwrap();

        assert_eq!(steps[0].target_amount, dec!(150000));
        assert_eq!(steps[1].target_amount, dec!(150000));
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[1].step_number, 2);
    }

    #[test]
    fn test_crypto_quantity_rounds_to_eight_decimals() {
        let steps = allocate_steps(
            &levels(&[30000, 29000]),
            &[0.5, 0.5],
            dec!(200),
            dec!(31000),
            MarketClass::Crypto,
            &PassThroughTick,
        )
        .unwrap();
        // 100 / 30000 = 0.00333333...
        assert_eq!(steps[0].target_quantity, dec!(0.00333333));
    }

    #[test]
    fn test_equity_quantity_floors_to_whole_shares() {
        let steps = allocate_steps(
            &levels(&[70000, 69000]),
            &[0.5, 0.5],
            dec!(300000),
            dec!(71000),
            MarketClass::DomesticEquity,
            &PassThroughTick,
        )
        .unwrap();
        // 150000 / 70000 = 2.14... → 2股
        assert_eq!(steps[0].target_quantity, dec!(2));
        assert_eq!(steps[1].target_quantity, dec!(2));
    }

    #[test]
    fn test_zero_quantity_fails_whole_allocation() {
        let result = allocate_steps(
            &levels(&[1000000, 990000]),
            &[0.5, 0.5],
            dec!(1000),
            dec!(1010000),
            MarketClass::DomesticEquity,
            &PassThroughTick,
        );

        match result {
            Err(DcaError::AllocationTooSmall { step, min_amount }) => {
                assert_eq!(step, 1);
                assert_eq!(min_amount, dec!(1000000));
            }
            other => panic!("expected AllocationTooSmall, got {:?}", other),
        }
    }

    #[test]
    fn test_tick_adjustment_keeps_original_price() {
        let steps = allocate_steps(
            &levels(&[99123, 98000]),
            &[0.5, 0.5],
            dec!(10000000),
            dec!(100000),
            MarketClass::DomesticEquity,
            &StepOf500Tick,
        )
        .unwrap();

        // 99123 → 99000，发生修正
        assert_eq!(steps[0].target_price, dec!(99000));
        assert!(steps[0].tick_adjusted);
        assert_eq!(steps[0].original_price, Some(dec!(99123)));

        // 98000 本身就在档位上，不附带修正元数据
        assert_eq!(steps[1].target_price, dec!(98000));
        assert!(!steps[1].tick_adjusted);
        assert!(steps[1].original_price.is_none());
    }

    #[test]
    fn test_distance_pct_rounded_to_two_decimals() {
        let steps = allocate_steps(
            &levels(&[98765, 97000]),
            &[0.5, 0.5],
            dec!(1000000),
            dec!(100000),
            MarketClass::Crypto,
            &PassThroughTick,
        )
        .unwrap();

        // (98765 - 100000) / 100000 * 100 = -1.235 → -1.24 (银行家舍入到偶数位)
        assert_eq!(steps[0].distance_pct, dec!(-1.24));
        assert_eq!(steps[1].distance_pct, dec!(-3.00));
    }
}
