//! Tokenizer 核心引擎实现
//!
//! 掩码: 每个识别出的区间替换为 `<掩码> [TOKEN:<token>]`
//! 还原: 从左到右扫描 Token 标记，解析成功则移除标记及紧邻其前的掩码并写回原值

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};

use super::config::TokenizerConfig;
use super::error::TokenizerError;
use super::extractor::{Extraction, Matcher, PatternExtractor};
use super::patterns::{TokenizationRule, TokenType, BUILTIN_RULES, MARKER_PREFIX, MARKER_SUFFIX};
use super::registry::{Token, TokenRegistry};
use super::rewriter::Rewriter;

/// Token 标记: [TOKEN:<\w+>]
static MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[TOKEN:(?P<token>\w+)\]").expect("marker pattern is valid"));

/// 掩码与标记之间的分隔符
const SEPARATOR: &str = " ";

/// 生成 `[TOKEN:<token>]`
pub fn format_marker(token: &str) -> String {
    format!("{MARKER_PREFIX}{token}{MARKER_SUFFIX}")
}

/// 掩码统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationStats {
    /// 各类型匹配计数
    pub counts: HashMap<TokenType, usize>,
    /// 总匹配数
    pub total: usize,
}

impl TokenizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录匹配
    pub fn record(&mut self, token_type: TokenType, count: usize) {
        *self.counts.entry(token_type).or_insert(0) += count;
        self.total += count;
    }

    pub fn count(&self, token_type: TokenType) -> usize {
        self.counts.get(&token_type).copied().unwrap_or(0)
    }
}

/// 掩码结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizationResult {
    /// 掩码后的文本
    pub masked_text: String,
    /// token -> 原值
    pub token_mappings: HashMap<String, String>,
    /// 统计信息
    pub stats: TokenizationStats,
    /// 是否有任何匹配
    pub has_matches: bool,
}

impl TokenizationResult {
    /// 创建无匹配结果
    pub fn no_matches(text: String) -> Self {
        Self {
            masked_text: text,
            token_mappings: HashMap::new(),
            stats: TokenizationStats::default(),
            has_matches: false,
        }
    }
}

/// 可逆掩码引擎
pub struct Tokenizer {
    extractor: PatternExtractor,
    registry: Arc<TokenRegistry>,
}

impl Tokenizer {
    /// 使用指定规则 (按顺序执行) 和注册表创建
    pub fn new(
        rules: Vec<TokenizationRule>,
        registry: Arc<TokenRegistry>,
    ) -> Result<Self, TokenizerError> {
        Ok(Self {
            extractor: PatternExtractor::new(rules)?,
            registry,
        })
    }

    /// 内置规则 + 独立的新注册表
    pub fn with_defaults() -> Result<Self, TokenizerError> {
        Self::with_registry(Arc::new(TokenRegistry::new()))
    }

    /// 内置规则 + 共享注册表
    pub fn with_registry(registry: Arc<TokenRegistry>) -> Result<Self, TokenizerError> {
        Self::new(BUILTIN_RULES.clone(), registry)
    }

    /// 内置规则之后追加自定义规则
    pub fn with_custom_rules(
        custom_rules: Vec<TokenizationRule>,
        registry: Arc<TokenRegistry>,
    ) -> Result<Self, TokenizerError> {
        let mut rules = BUILTIN_RULES.clone();
        rules.extend(custom_rules);
        Self::new(rules, registry)
    }

    /// 从持久化配置创建
    pub fn from_config(
        config: &TokenizerConfig,
        registry: Arc<TokenRegistry>,
    ) -> Result<Self, TokenizerError> {
        config.validate()?;
        Self::new(config.merged_rules(), registry)
    }

    /// 使用任意匹配器
    pub fn with_matchers(matchers: Vec<Box<dyn Matcher>>, registry: Arc<TokenRegistry>) -> Self {
        Self {
            extractor: PatternExtractor::from_matchers(matchers),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    /// 生效的匹配器数量
    pub fn rule_count(&self) -> usize {
        self.extractor.len()
    }

    /// 识别并掩码文本
    ///
    /// 匹配器依次执行，每个都作用于上一个的输出；已写入的 `<掩码> [TOKEN:..]` 区间
    /// 对后续匹配器只读。无匹配时原样返回，映射为空。
    pub fn tokenize_and_mask(&self, text: &str) -> Result<TokenizationResult, TokenizerError> {
        let mut current = text.to_string();
        let mut protected: Vec<Range<usize>> = Vec::new();
        let mut mappings = HashMap::new();
        let mut stats = TokenizationStats::new();

        for matcher in self.extractor.matchers() {
            let extractions = select_extractions(matcher.as_ref(), &current, &protected);
            if extractions.is_empty() {
                continue;
            }

            let token_type = matcher.token_type();
            // 整轮校验通过后才签发，被拒绝的调用不会改动注册表
            if extractions.iter().any(|e| contains_reserved_syntax(&e.value)) {
                warn!(
                    rule = matcher.id(),
                    token_type = %token_type,
                    "Rejected value containing mask or marker syntax"
                );
                return Err(TokenizerError::AmbiguousValue {
                    rule: matcher.id().to_string(),
                    token_type,
                });
            }

            let mut rw = Rewriter::with_capacity(current.len() + extractions.len() * 32);
            let mut next_protected = Vec::with_capacity(protected.len() + extractions.len());
            let mut cursor = 0;

            for extraction in &extractions {
                let token = self
                    .registry
                    .get_or_create_token(&extraction.value, token_type)?;

                let gap = cursor..extraction.start;
                carry_protected(&protected, gap, rw.len(), &mut next_protected);
                rw.emit(&current[cursor..extraction.start]);

                let span_start = rw.len();
                rw.emit(token_type.mask());
                rw.emit(SEPARATOR);
                rw.emit(&format_marker(&token));
                next_protected.push(span_start..rw.len());
                cursor = extraction.end;

                mappings.insert(token, extraction.value.clone());
            }
            carry_protected(&protected, cursor..current.len(), rw.len(), &mut next_protected);
            rw.emit(&current[cursor..]);

            stats.record(token_type, extractions.len());
            current = rw.finish();
            protected = next_protected;
        }

        if stats.total == 0 {
            return Ok(TokenizationResult::no_matches(current));
        }

        debug!(
            total = stats.total,
            amounts = stats.count(TokenType::Amount),
            merchants = stats.count(TokenType::Merchant),
            "Tokenized text"
        );

        Ok(TokenizationResult {
            masked_text: current,
            token_mappings: mappings,
            stats,
            has_matches: true,
        })
    }

    /// 还原掩码文本
    ///
    /// 未知 Token 或前面缺少对应掩码的标记原样保留。
    pub fn detokenize(&self, masked_text: &str) -> String {
        let mut rw = Rewriter::with_capacity(masked_text.len());
        let mut cursor = 0;

        // SCANNING: 复制标记之前的文本
        for caps in MARKER_REGEX.captures_iter(masked_text) {
            let Some(marker) = caps.get(0) else { continue };
            rw.emit(&masked_text[cursor..marker.start()]);
            cursor = marker.end();

            // RESOLVING
            let resolved = caps
                .name("token")
                .and_then(|m| self.registry.get_token_info(m.as_str()));

            // SPLICING
            match resolved {
                Some(token) if rw.retract(&mask_with_separator(token.token_type)) => {
                    rw.emit_committed(&token.original_value);
                }
                Some(token) => {
                    warn!(
                        token = %token.token_value,
                        "Marker without preceding mask, left verbatim"
                    );
                    rw.emit_committed(marker.as_str());
                }
                None => rw.emit_committed(marker.as_str()),
            }
        }
        rw.emit(&masked_text[cursor..]);
        rw.finish()
    }

    /// 查询 Token 信息
    pub fn get_token_info(&self, token: &str) -> Option<Token> {
        self.registry.get_token_info(token)
    }

    /// 清空注册表
    pub fn clear_token_store(&self) {
        self.registry.clear();
    }
}

/// 过滤匹配器的输出: 按起点排序，丢弃越界、非字符边界、相互重叠
/// 或落在已写入掩码区间内的结果
fn select_extractions(
    matcher: &dyn Matcher,
    text: &str,
    protected: &[Range<usize>],
) -> Vec<Extraction> {
    let mut found = matcher.find(text);
    found.sort_by_key(|e| (e.start, e.end));

    let mut selected = Vec::with_capacity(found.len());
    let mut cursor = 0;
    for extraction in found {
        let in_bounds = extraction.start < extraction.end
            && extraction.end <= text.len()
            && text.is_char_boundary(extraction.start)
            && text.is_char_boundary(extraction.end);
        if !in_bounds || extraction.value.is_empty() {
            warn!(
                rule = matcher.id(),
                start = extraction.start,
                end = extraction.end,
                "Skipped invalid extraction span"
            );
            continue;
        }
        if extraction.start < cursor {
            warn!(
                rule = matcher.id(),
                start = extraction.start,
                end = extraction.end,
                "Skipped overlapping extraction"
            );
            continue;
        }
        if protected
            .iter()
            .any(|r| extraction.start < r.end && r.start < extraction.end)
        {
            debug!(
                rule = matcher.id(),
                start = extraction.start,
                "Skipped extraction inside masked span"
            );
            continue;
        }
        cursor = extraction.end;
        selected.push(extraction);
    }
    selected
}

/// 把完全落在 `gap` 内的保护区间平移到新输出中 `base` 对应的位置
fn carry_protected(
    protected: &[Range<usize>],
    gap: Range<usize>,
    base: usize,
    out: &mut Vec<Range<usize>>,
) {
    out.extend(
        protected
            .iter()
            .filter(|r| r.start >= gap.start && r.end <= gap.end)
            .map(|r| (r.start - gap.start + base)..(r.end - gap.start + base)),
    );
}

fn mask_with_separator(token_type: TokenType) -> String {
    format!("{}{}", token_type.mask(), SEPARATOR)
}

/// 原值中出现掩码字面量或标记语法会导致还原歧义
fn contains_reserved_syntax(value: &str) -> bool {
    value.contains(MARKER_PREFIX) || TokenType::ALL.iter().any(|t| value.contains(t.mask()))
}
