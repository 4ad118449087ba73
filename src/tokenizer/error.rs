//! Tokenizer 错误类型定义

use thiserror::Error;

use super::patterns::TokenType;

/// Tokenizer 错误类型
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// 无效的正则表达式模式
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// 配置校验时发现的无效正则
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),

    /// 规则校验错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 配置文件读写错误
    #[error("Config error: {0}")]
    ConfigError(String),

    /// 序列化错误
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token 生成多次重试后仍然冲突
    #[error("Failed to issue a unique {token_type} token after {attempts} attempts")]
    TokenSpaceExhausted { token_type: TokenType, attempts: usize },

    /// 原值包含掩码字面量或 Token 标记语法，无法可逆还原
    ///
    /// 错误信息中不携带原值本身
    #[error("Rule '{rule}' captured a {token_type} value containing mask or marker syntax")]
    AmbiguousValue { rule: String, token_type: TokenType },
}
