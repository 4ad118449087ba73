//! Token 注册表
//!
//! 维护 原值 <-> Token 的双向映射：
//! - 正向: token_value -> Token
//! - 反向: (TokenType, original_value) -> token_value
//!
//! 两个映射在同一把锁下更新，保证同一 (值, 类型) 在注册表生命周期内只对应一个 Token。

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::error::TokenizerError;
use super::patterns::TokenType;

/// Token 随机部分的字符集
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Token 随机部分长度
pub const TOKEN_SUFFIX_LEN: usize = 8;

/// 冲突时最多重试生成的次数
pub const MAX_GENERATION_ATTEMPTS: usize = 16;

/// 已签发的 Token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// 原始值 (匹配到的子串)
    pub original_value: String,
    /// Token 值，如 AMT_7F3K9Q2A
    pub token_value: String,
    /// 敏感信息类型
    pub token_type: TokenType,
    /// 签发时间 (仅用于审计)
    pub issued_at: DateTime<Utc>,
}

/// Token 生成器
pub trait TokenGenerator: Send + Sync {
    /// 为指定类型生成一个候选 Token，唯一性由注册表负责校验
    fn generate(&self, token_type: TokenType) -> String;
}

/// 基于系统随机源的生成器: `<PREFIX>_` + 8 位 [A-Z0-9]
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self, token_type: TokenType) -> String {
        let mut rng = OsRng;
        let mut token = String::with_capacity(token_type.prefix().len() + 1 + TOKEN_SUFFIX_LEN);
        token.push_str(token_type.prefix());
        token.push('_');
        for _ in 0..TOKEN_SUFFIX_LEN {
            let idx = rng.gen_range(0..TOKEN_ALPHABET.len());
            token.push(TOKEN_ALPHABET[idx] as char);
        }
        token
    }
}

#[derive(Default)]
struct RegistryMaps {
    forward: HashMap<String, Token>,
    reverse: HashMap<(TokenType, String), String>,
}

/// Token 注册表
///
/// 通过 `Arc<TokenRegistry>` 在多个 [`Tokenizer`](super::Tokenizer) 间共享；
/// 不同实例之间互相独立 (例如按租户隔离)。
pub struct TokenRegistry {
    maps: RwLock<RegistryMaps>,
    generator: Box<dyn TokenGenerator>,
}

impl TokenRegistry {
    /// 创建使用系统随机源的空注册表
    pub fn new() -> Self {
        Self::with_generator(RandomTokenGenerator)
    }

    /// 使用自定义生成器创建空注册表
    pub fn with_generator(generator: impl TokenGenerator + 'static) -> Self {
        Self {
            maps: RwLock::new(RegistryMaps::default()),
            generator: Box::new(generator),
        }
    }

    // 映射只在 Token 构造完成后才写入，锁中毒时数据仍然一致
    fn read(&self) -> RwLockReadGuard<'_, RegistryMaps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryMaps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 获取或签发 Token
    ///
    /// 已存在则直接返回；否则生成新 Token 并同时写入正反向映射。
    /// 生成的 Token 与现有 Token 冲突时重试，绝不覆盖已有映射。
    pub fn get_or_create_token(
        &self,
        value: &str,
        token_type: TokenType,
    ) -> Result<String, TokenizerError> {
        let key = (token_type, value.to_string());

        let existing = self.read().reverse.get(&key).cloned();
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let mut guard = self.write();
        let maps = &mut *guard;
        let slot = match maps.reverse.entry(key) {
            // 读锁释放后可能已被其他线程签发
            Entry::Occupied(entry) => return Ok(entry.get().clone()),
            Entry::Vacant(slot) => slot,
        };

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = self.generator.generate(token_type);
            if maps.forward.contains_key(&candidate) {
                warn!(token_type = %token_type, attempt, "Token collision, regenerating");
                continue;
            }

            let token = Token {
                original_value: value.to_string(),
                token_value: candidate.clone(),
                token_type,
                issued_at: Utc::now(),
            };
            maps.forward.insert(candidate.clone(), token);
            slot.insert(candidate.clone());
            debug!(token = %candidate, token_type = %token_type, "Issued token");
            return Ok(candidate);
        }

        Err(TokenizerError::TokenSpaceExhausted {
            token_type,
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    /// 查询 Token 信息，未知 Token 返回 None
    pub fn get_token_info(&self, token_value: &str) -> Option<Token> {
        self.read().forward.get(token_value).cloned()
    }

    /// 清空正反向映射
    pub fn clear(&self) {
        let mut maps = self.write();
        let count = maps.forward.len();
        maps.forward.clear();
        maps.reverse.clear();
        debug!(count, "Cleared token registry");
    }

    /// 已签发 Token 数量
    pub fn len(&self) -> usize {
        self.read().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 所有 Token 的快照，按签发时间排序
    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.read().forward.values().cloned().collect();
        tokens.sort_by(|a, b| {
            a.issued_at
                .cmp(&b.issued_at)
                .then_with(|| a.token_value.cmp(&b.token_value))
        });
        tokens
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}
