//! Tokenizer 模块 - 可逆掩码引擎
//!
//! 识别文本中的金额和商户名，替换为固定掩码 + `[TOKEN:<token>]` 标记，
//! 并可通过注册表把标记还原为原值。

mod config;
mod engine;
mod error;
mod extractor;
mod patterns;
mod registry;
mod rewriter;

pub use config::{validate_regex_pattern, TokenizerConfig};
pub use engine::{format_marker, TokenizationResult, TokenizationStats, Tokenizer};
pub use error::TokenizerError;
pub use extractor::{Extraction, Matcher, PatternExtractor, RegexMatcher};
pub use patterns::{
    TokenType, TokenizationRule, AMOUNT_RULE_ID, BUILTIN_RULES, MARKER_PREFIX, MARKER_SUFFIX,
    MERCHANT_RULE_ID,
};
pub use registry::{
    RandomTokenGenerator, Token, TokenGenerator, TokenRegistry, MAX_GENERATION_ATTEMPTS,
    TOKEN_SUFFIX_LEN,
};


#[cfg(test)]
mod extended_tests;
