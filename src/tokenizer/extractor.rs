//! 模式识别器
//!
//! 按固定顺序排列的匹配器列表。每个匹配器是纯函数 `text -> Vec<Extraction>`，
//! 引擎依次在上一个匹配器的输出上运行下一个。

use regex::Regex;

use super::error::TokenizerError;
use super::patterns::{TokenizationRule, TokenType, BUILTIN_RULES};

/// 原值所在的命名分组
const VALUE_GROUP: &str = "value";

/// 附带数值所在的命名分组
const NUMERIC_GROUP: &str = "numeric";

/// 一次识别结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// 要被掩码替换的字节区间起点
    pub start: usize,
    /// 字节区间终点 (不含)
    pub end: usize,
    /// 原始值，等于 `text[start..end]`
    pub value: String,
    /// 附带数值 (如金额的纯数字部分)
    pub numeric: Option<String>,
}

/// 匹配器
pub trait Matcher: Send + Sync {
    /// 规则 ID
    fn id(&self) -> &str;

    /// 识别出的敏感信息类型
    fn token_type(&self) -> TokenType;

    /// 返回识别结果；引擎会排序并丢弃越界、重叠或落在已掩码区间内的结果
    fn find(&self, text: &str) -> Vec<Extraction>;
}

/// 基于正则的匹配器
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    rule: TokenizationRule,
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(rule: TokenizationRule) -> Result<Self, TokenizerError> {
        let regex = Regex::new(&rule.pattern)?;
        Ok(Self { rule, regex })
    }
}

impl Matcher for RegexMatcher {
    fn id(&self) -> &str {
        &self.rule.id
    }

    fn token_type(&self) -> TokenType {
        self.rule.token_type
    }

    fn find(&self, text: &str) -> Vec<Extraction> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let group = caps.name(VALUE_GROUP).or_else(|| caps.get(0))?;
                // 只替换去掉首尾空白后的区间，空白原样保留
                let raw = group.as_str();
                let leading = raw.len() - raw.trim_start().len();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let start = group.start() + leading;
                Some(Extraction {
                    start,
                    end: start + trimmed.len(),
                    value: trimmed.to_string(),
                    numeric: caps.name(NUMERIC_GROUP).map(|m| m.as_str().to_string()),
                })
            })
            .collect()
    }
}

/// 有序匹配器列表
pub struct PatternExtractor {
    matchers: Vec<Box<dyn Matcher>>,
}

impl PatternExtractor {
    /// 从规则列表创建，跳过禁用的规则，保持原有顺序
    pub fn new(rules: Vec<TokenizationRule>) -> Result<Self, TokenizerError> {
        let matchers = rules
            .into_iter()
            .filter(|r| r.enabled)
            .map(|r| RegexMatcher::new(r).map(|m| Box::new(m) as Box<dyn Matcher>))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// 使用内置规则创建
    pub fn with_defaults() -> Result<Self, TokenizerError> {
        Self::new(BUILTIN_RULES.clone())
    }

    /// 直接使用自定义匹配器
    pub fn from_matchers(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn matchers(&self) -> &[Box<dyn Matcher>] {
        &self.matchers
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
