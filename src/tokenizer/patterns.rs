//! 内置识别规则定义
//!
//! 包含金额、商户名两类敏感信息的识别模式，以及各类型对应的 Token 前缀和掩码字面量

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token 标记的起始字面量
pub const MARKER_PREFIX: &str = "[TOKEN:";

/// Token 标记的结束字面量
pub const MARKER_SUFFIX: &str = "]";

/// 敏感信息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// 金额 ($71.75)
    Amount,
    /// 商户名 (at LOS POLLOS)
    Merchant,
}

impl TokenType {
    /// 所有类型
    pub const ALL: [TokenType; 2] = [TokenType::Amount, TokenType::Merchant];

    /// 获取显示名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "AMOUNT",
            Self::Merchant => "MERCHANT",
        }
    }

    /// Token 前缀 (不含下划线)
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Amount => "AMT",
            Self::Merchant => "MER",
        }
    }

    /// 掩码字面量
    ///
    /// 与原值长度和内容无关，只暴露类型信息
    pub fn mask(&self) -> &'static str {
        match self {
            Self::Amount => "$***.**",
            Self::Merchant => "***MERCHANT***",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 识别规则
///
/// 正则中可用命名分组 `value` 指定原值 (缺省为整个匹配)，
/// 命名分组 `numeric` 为附带的数值部分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationRule {
    /// 规则 ID (唯一)
    pub id: String,
    /// 规则名称
    pub name: String,
    /// 正则表达式模式
    pub pattern: String,
    /// 敏感信息类型
    pub token_type: TokenType,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TokenizationRule {
    /// 创建新规则
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        token_type: TokenType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pattern: pattern.into(),
            token_type,
            enabled: true,
        }
    }

    /// 以禁用状态返回规则
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// 内置金额规则 ID
pub const AMOUNT_RULE_ID: &str = "amount";

/// 内置商户名规则 ID
pub const MERCHANT_RULE_ID: &str = "merchant";

/// 内置规则集 (顺序即执行顺序：金额先于商户名)
pub static BUILTIN_RULES: Lazy<Vec<TokenizationRule>> = Lazy::new(|| {
    vec![
        // $ + 数字，可选恰好两位小数
        TokenizationRule::new(
            AMOUNT_RULE_ID,
            "Monetary Amount",
            r"\$(?P<numeric>[0-9]+(?:\.[0-9]{2})?)",
            TokenType::Amount,
        ),
        // at + 大写商户名，止于 " and"、句点或文本结尾 (终止符被匹配但不会被改写)
        TokenizationRule::new(
            MERCHANT_RULE_ID,
            "Merchant Name",
            r"\bat\s+(?P<value>[A-Z][A-Z0-9\s&]+?)(?:\s+and|\s*\.|$)",
            TokenType::Merchant,
        ),
    ]
});
