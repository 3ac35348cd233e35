//! 环境变量配置读取

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

/// 读取布尔型环境变量：支持 true/false/1/0（大小写不敏感）
pub fn env_is_true(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v == "1"
        }
        Err(_) => default,
    }
}

/// 读取字符串环境变量，若不存在则返回默认值
pub fn env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) => v,
        Err(_) => default.to_string(),
    }
}

/// 读取 i64 环境变量，不存在或解析失败返回默认值
pub fn env_i64(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(v) => v.trim().parse::<i64>().ok().unwrap_or(default),
        Err(_) => default,
    }
}

/// 读取定点数环境变量，不存在或解析失败返回默认值
pub fn env_decimal(key: &str, default: Decimal) -> Decimal {
    match env::var(key) {
        Ok(v) => Decimal::from_str(v.trim()).unwrap_or(default),
        Err(_) => default,
    }
}

/// 执行协调器配置
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// 单步资金上限（静态安全限制），任一步骤超过该金额时整次执行中止
    pub max_step_amount: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_step_amount: Decimal::from(1_000_000),
        }
    }
}

impl ExecutionConfig {
    /// 从环境变量加载
    ///
    /// - `DCA_MAX_STEP_AMOUNT`：单步资金上限，默认 1,000,000
    pub fn from_env() -> Self {
        Self {
            max_step_amount: env_decimal("DCA_MAX_STEP_AMOUNT", Decimal::from(1_000_000)),
        }
    }
}
