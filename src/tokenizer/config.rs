//! 识别规则配置模块
//!
//! 持久化内置规则的启停状态和自定义规则，加载时整体校验

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::TokenizerError;
use super::patterns::{TokenizationRule, BUILTIN_RULES};

/// 配置文件名
const CONFIG_FILENAME: &str = "tokenization-rules.json";

/// 识别规则配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenizerConfig {
    /// 内置规则启停覆盖 (rule_id -> enabled)，未出现的沿用规则自身状态
    #[serde(default)]
    pub builtin_enabled: HashMap<String, bool>,
    /// 自定义规则，排在内置规则之后执行
    #[serde(default)]
    pub custom_rules: Vec<TokenizationRule>,
}

impl TokenizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置文件完整路径
    pub fn config_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILENAME)
    }

    /// 从配置目录加载；文件不存在时返回空配置
    ///
    /// 文件中的规则与手动添加的规则经过同样的校验
    pub fn load(config_dir: &Path) -> Result<Self, TokenizerError> {
        let path = Self::config_path(config_dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No tokenizer config, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(TokenizerError::ConfigError(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TokenizerError::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 写入配置目录，目录不存在时创建
    pub fn save(&self, config_dir: &Path) -> Result<(), TokenizerError> {
        let path = Self::config_path(config_dir);
        let io_err = |e: io::Error| {
            TokenizerError::ConfigError(format!("cannot write {}: {}", path.display(), e))
        };

        fs::create_dir_all(config_dir).map_err(io_err)?;
        fs::write(&path, serde_json::to_string_pretty(self)?).map_err(io_err)?;

        debug!(
            path = %path.display(),
            custom_rules = self.custom_rules.len(),
            "Saved tokenizer config"
        );
        Ok(())
    }

    /// 校验覆盖项指向内置规则、自定义规则合法且 ID 唯一
    pub fn validate(&self) -> Result<(), TokenizerError> {
        if let Some(unknown) = self.builtin_enabled.keys().find(|id| !is_builtin(id)) {
            return Err(TokenizerError::ValidationError(format!(
                "'{unknown}' is not a built-in rule"
            )));
        }

        let mut seen: HashSet<&str> = BUILTIN_RULES.iter().map(|r| r.id.as_str()).collect();
        for rule in &self.custom_rules {
            validate_rule(rule)?;
            if !seen.insert(rule.id.as_str()) {
                return Err(duplicate_id(&rule.id));
            }
        }
        Ok(())
    }

    /// 执行顺序的规则列表: 内置规则 (应用覆盖) + 自定义规则
    pub fn merged_rules(&self) -> Vec<TokenizationRule> {
        BUILTIN_RULES
            .iter()
            .map(|builtin| TokenizationRule {
                enabled: self
                    .builtin_enabled
                    .get(&builtin.id)
                    .copied()
                    .unwrap_or(builtin.enabled),
                ..builtin.clone()
            })
            .chain(self.custom_rules.iter().cloned())
            .collect()
    }

    /// 覆盖内置规则的启停状态
    pub fn set_builtin_enabled(
        &mut self,
        rule_id: &str,
        enabled: bool,
    ) -> Result<(), TokenizerError> {
        if !is_builtin(rule_id) {
            return Err(TokenizerError::ValidationError(format!(
                "'{rule_id}' is not a built-in rule"
            )));
        }
        self.builtin_enabled.insert(rule_id.to_string(), enabled);
        Ok(())
    }

    /// 追加自定义规则
    pub fn add_custom_rule(&mut self, rule: TokenizationRule) -> Result<(), TokenizerError> {
        if is_builtin(&rule.id) || self.custom_rule(&rule.id).is_some() {
            return Err(duplicate_id(&rule.id));
        }
        validate_rule(&rule)?;
        self.custom_rules.push(rule);
        Ok(())
    }

    /// 删除自定义规则，返回被删除的规则
    pub fn remove_custom_rule(
        &mut self,
        rule_id: &str,
    ) -> Result<TokenizationRule, TokenizerError> {
        let idx = self
            .custom_rules
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or_else(|| missing_id(rule_id))?;
        Ok(self.custom_rules.remove(idx))
    }

    /// 原位替换同 ID 的自定义规则，执行顺序不变
    pub fn update_custom_rule(&mut self, rule: TokenizationRule) -> Result<(), TokenizerError> {
        validate_rule(&rule)?;
        let slot = self
            .custom_rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or_else(|| missing_id(&rule.id))?;
        *slot = rule;
        Ok(())
    }

    pub fn custom_rule(&self, rule_id: &str) -> Option<&TokenizationRule> {
        self.custom_rules.iter().find(|r| r.id == rule_id)
    }
}

fn is_builtin(rule_id: &str) -> bool {
    BUILTIN_RULES.iter().any(|r| r.id == rule_id)
}

fn duplicate_id(rule_id: &str) -> TokenizerError {
    TokenizerError::ValidationError(format!("rule id '{rule_id}' is already in use"))
}

fn missing_id(rule_id: &str) -> TokenizerError {
    TokenizerError::ValidationError(format!("no custom rule with id '{rule_id}'"))
}

fn validate_rule(rule: &TokenizationRule) -> Result<(), TokenizerError> {
    if rule.id.trim().is_empty() || rule.name.trim().is_empty() {
        return Err(TokenizerError::ValidationError(
            "rule id and name must not be blank".to_string(),
        ));
    }
    validate_regex_pattern(&rule.pattern)
}

/// 校验正则: 非空且可编译
pub fn validate_regex_pattern(pattern: &str) -> Result<(), TokenizerError> {
    if pattern.trim().is_empty() {
        return Err(TokenizerError::ValidationError(
            "regex pattern must not be blank".to_string(),
        ));
    }
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| TokenizerError::InvalidRegex(e.to_string()))
}
