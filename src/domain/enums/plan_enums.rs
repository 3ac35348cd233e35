//! 建仓计划相关枚举
//!
//! 状态在领域层始终是封闭枚举，仅在持久化适配层序列化为字符串

use serde::{Deserialize, Serialize};

/// 市场类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketClass {
    /// 国内股票
    DomesticEquity,
    /// 海外股票
    ForeignEquity,
    /// 加密货币
    Crypto,
}

impl MarketClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketClass::DomesticEquity => "domestic_equity",
            MarketClass::ForeignEquity => "foreign_equity",
            MarketClass::Crypto => "crypto",
        }
    }

    /// 是否为股票类市场（数量只能为整数股）
    pub fn is_equity(&self) -> bool {
        matches!(
            self,
            MarketClass::DomesticEquity | MarketClass::ForeignEquity
        )
    }

    /// 根据代码形态推断市场类别（调用方未提供 market 提示时的兜底）
    ///
    /// - 6位纯数字 → 国内股票
    /// - 5位以内纯大写字母 → 海外股票
    /// - 其他（含 "-" / "/" 的交易对等） → 加密货币
    pub fn infer(symbol: &str) -> Self {
        let s = symbol.trim();
        if s.len() == 6 && s.chars().all(|c| c.is_ascii_digit()) {
            return MarketClass::DomesticEquity;
        }
        if !s.is_empty() && s.len() <= 5 && s.chars().all(|c| c.is_ascii_uppercase()) {
            return MarketClass::ForeignEquity;
        }
        MarketClass::Crypto
    }
}

impl std::str::FromStr for MarketClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "domestic_equity" => Ok(MarketClass::DomesticEquity),
            "foreign_equity" => Ok(MarketClass::ForeignEquity),
            "crypto" => Ok(MarketClass::Crypto),
            _ => Err(format!("Unknown market class: {}", s)),
        }
    }
}

/// 分批建仓策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcaStrategy {
    /// 按支撑位挂单
    Support,
    /// 等间距挂单
    Equal,
    /// 激进：首单贴近现价，其余按支撑位
    Aggressive,
}

impl DcaStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DcaStrategy::Support => "support",
            DcaStrategy::Equal => "equal",
            DcaStrategy::Aggressive => "aggressive",
        }
    }
}

impl std::str::FromStr for DcaStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "support" => Ok(DcaStrategy::Support),
            "equal" => Ok(DcaStrategy::Equal),
            "aggressive" => Ok(DcaStrategy::Aggressive),
            _ => Err(format!("Unknown dca strategy: {}", s)),
        }
    }
}

/// 计划状态
///
/// active → completed / cancelled / expired，终态之间不可再转换。
/// expired 仅由外部触发，引擎内部没有定时器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// 进行中
    Active,
    /// 已完成（全部步骤进入终态且存在成交）
    Completed,
    /// 已取消
    Cancelled,
    /// 已过期
    Expired,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
            PlanStatus::Expired => "expired",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlanStatus::Completed | PlanStatus::Cancelled | PlanStatus::Expired
        )
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PlanStatus::Active),
            "completed" => Ok(PlanStatus::Completed),
            "cancelled" => Ok(PlanStatus::Cancelled),
            "expired" => Ok(PlanStatus::Expired),
            _ => Err(format!("Unknown plan status: {}", s)),
        }
    }
}

/// 步骤状态
///
/// pending → ordered → {partial → filled | filled}；
/// {pending, ordered, partial} → cancelled；
/// pending → skipped（仅供外部调用方使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// 待下单
    Pending,
    /// 已向券商/交易所确认下单
    Ordered,
    /// 部分成交
    Partial,
    /// 全部成交
    Filled,
    /// 已取消
    Cancelled,
    /// 已跳过
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Ordered => "ordered",
            StepStatus::Partial => "partial",
            StepStatus::Filled => "filled",
            StepStatus::Cancelled => "cancelled",
            StepStatus::Skipped => "skipped",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Filled | StepStatus::Cancelled | StepStatus::Skipped
        )
    }

    /// 是否仍占用计划额度（未到终态）
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            StepStatus::Pending | StepStatus::Ordered | StepStatus::Partial
        )
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StepStatus::Pending),
            "ordered" => Ok(StepStatus::Ordered),
            "partial" => Ok(StepStatus::Partial),
            "filled" => Ok(StepStatus::Filled),
            "cancelled" => Ok(StepStatus::Cancelled),
            "skipped" => Ok(StepStatus::Skipped),
            _ => Err(format!("Unknown step status: {}", s)),
        }
    }
}

/// 资金权重分布模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// 前置加权：超卖时前面的步骤分配更多资金
    FrontLoaded,
    /// 后置加权：超买时后面的步骤分配更多资金
    BackLoaded,
    /// 等权
    Equal,
}

impl WeightMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightMode::FrontLoaded => "front_loaded",
            WeightMode::BackLoaded => "back_loaded",
            WeightMode::Equal => "equal",
        }
    }
}
