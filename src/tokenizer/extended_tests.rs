//! 扩展测试套件
//!
//! 包含:
//! - 漏识别防护测试
//! - 误识别防护测试
//! - 属性测试 (Property-based Testing)

use super::engine::Tokenizer;
use super::patterns::TokenType;
use super::registry::TokenRegistry;

// ============================================================================
// 漏识别防护测试 - 确保不漏掉敏感信息
// ============================================================================

#[cfg(test)]
mod false_negative_tests {
    use super::*;

    #[test]
    fn test_amount_without_decimals() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let result = tokenizer.tokenize_and_mask("limit is $15000 today").unwrap();
        assert_eq!(result.stats.count(TokenType::Amount), 1);
        assert!(!result.masked_text.contains("15000"));
    }

    #[test]
    fn test_adjacent_amounts() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let text = "$1.00$2.00";
        let result = tokenizer.tokenize_and_mask(text).unwrap();
        assert_eq!(result.stats.count(TokenType::Amount), 2);
        assert_eq!(tokenizer.detokenize(&result.masked_text), text);
    }

    #[test]
    fn test_merchant_with_ampersand_and_digits() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let text = "bought at AT&T STORE 42.";
        let result = tokenizer.tokenize_and_mask(text).unwrap();
        assert_eq!(
            result.token_mappings.values().next().map(String::as_str),
            Some("AT&T STORE 42")
        );
        assert_eq!(tokenizer.detokenize(&result.masked_text), text);
    }

    #[test]
    fn test_merchant_at_end_of_text() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let result = tokenizer.tokenize_and_mask("coffee at BLUE BOTTLE").unwrap();
        assert_eq!(result.stats.count(TokenType::Merchant), 1);
        assert!(result.masked_text.ends_with(']'));
    }

    #[test]
    fn test_merchant_before_spaced_period() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let text = "paid at QMART  .";
        let result = tokenizer.tokenize_and_mask(text).unwrap();
        assert_eq!(
            result.token_mappings.values().next().map(String::as_str),
            Some("QMART")
        );
        assert_eq!(tokenizer.detokenize(&result.masked_text), text);
    }
}

// ============================================================================
// 误识别防护测试 - 确保普通文本不被改写
// ============================================================================

#[cfg(test)]
mod false_positive_tests {
    use super::*;

    #[test]
    fn test_dollar_without_digits() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let text = "costs $ a lot, maybe $$";
        let result = tokenizer.tokenize_and_mask(text).unwrap();
        assert!(!result.has_matches);
        assert_eq!(result.masked_text, text);
    }

    #[test]
    fn test_lowercase_after_at() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let text = "meet at noon and at the park.";
        let result = tokenizer.tokenize_and_mask(text).unwrap();
        assert!(!result.has_matches);
    }

    #[test]
    fn test_at_inside_word() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let text = "that QMART. what BAR.";
        let result = tokenizer.tokenize_and_mask(text).unwrap();
        assert!(!result.has_matches);
    }

    #[test]
    fn test_single_letter_merchant() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let result = tokenizer.tokenize_and_mask("at X.").unwrap();
        assert!(!result.has_matches);
    }

    #[test]
    fn test_masked_text_not_retokenized() {
        let tokenizer = Tokenizer::with_defaults().unwrap();
        let once = tokenizer
            .tokenize_and_mask("Spent $71.75 at LOS POLLOS and $43.43 at QMART.")
            .unwrap();
        let twice = tokenizer.tokenize_and_mask(&once.masked_text).unwrap();
        assert!(!twice.has_matches);
        assert_eq!(twice.masked_text, once.masked_text);
    }

    #[test]
    fn test_unrelated_brackets_preserved() {
        let registry = std::sync::Arc::new(TokenRegistry::new());
        let tokenizer = Tokenizer::with_registry(registry).unwrap();
        let text = "[TOKEN:] [TOKEN:has space] [token:AMT_AAAAAAAA]";
        assert_eq!(tokenizer.detokenize(text), text);
    }
}

// ============================================================================
// 属性测试 (Property-Based Testing)
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// 小写填充文本 + 金额 + 多词商户名
    fn segment() -> impl Strategy<Value = (String, String, String)> {
        (
            "[a-z ,]{0,12}",
            r"\$[0-9]{1,6}(\.[0-9]{2})?",
            "[A-Z]{2,8}( [A-Z&]{2,8}){1,2}",
        )
    }

    fn build_text(segments: &[(String, String, String)]) -> String {
        let body: Vec<String> = segments
            .iter()
            .map(|(filler, amount, merchant)| format!("{filler} {amount} at {merchant}"))
            .collect();
        format!("{}.", body.join(" and "))
    }

    proptest! {
        /// 不变式: 还原后与原文完全一致
        #[test]
        fn prop_round_trip(segments in prop::collection::vec(segment(), 0..6)) {
            let text = build_text(&segments);
            let tokenizer = Tokenizer::with_defaults().unwrap();
            let result = tokenizer.tokenize_and_mask(&text).unwrap();

            prop_assert_eq!(tokenizer.detokenize(&result.masked_text), text);
        }

        /// 不变式: 任意文本的掩码-还原往返
        #[test]
        fn prop_round_trip_arbitrary_text(text in "[a-zA-Z0-9 $.,&\n]{0,300}") {
            let tokenizer = Tokenizer::with_defaults().unwrap();
            let result = tokenizer.tokenize_and_mask(&text).unwrap();

            prop_assert_eq!(tokenizer.detokenize(&result.masked_text), text);
        }

        /// 不变式: 掩码后的文本不包含任何原值
        #[test]
        fn prop_masked_never_contains_originals(segments in prop::collection::vec(segment(), 1..6)) {
            let text = build_text(&segments);
            let tokenizer = Tokenizer::with_defaults().unwrap();
            let result = tokenizer.tokenize_and_mask(&text).unwrap();

            for (_, amount, merchant) in &segments {
                prop_assert!(!result.masked_text.contains(amount.as_str()));
                prop_assert!(!result.masked_text.contains(merchant.as_str()));
            }
        }

        /// 不变式: 不含金额和商户名的文本原样返回
        #[test]
        fn prop_pass_through(text in "[a-z0-9 ,.]{0,300}") {
            let tokenizer = Tokenizer::with_defaults().unwrap();
            let result = tokenizer.tokenize_and_mask(&text).unwrap();

            prop_assert!(!result.has_matches);
            prop_assert!(result.token_mappings.is_empty());
            prop_assert_eq!(result.masked_text, text);
        }

        /// 不变式: 重复签发返回同一 Token
        #[test]
        fn prop_idempotent_issuance(
            value in ".{1,40}",
            token_type in prop::sample::select(TokenType::ALL.to_vec())
        ) {
            let registry = TokenRegistry::new();
            let first = registry.get_or_create_token(&value, token_type).unwrap();
            let second = registry.get_or_create_token(&value, token_type).unwrap();

            prop_assert_eq!(&first, &second);
            prop_assert!(first.starts_with(token_type.prefix()));
            prop_assert_eq!(registry.len(), 1);
        }

        /// 不变式: 未注册的 Token 标记原样保留
        #[test]
        fn prop_unknown_token_untouched(
            before in "[a-z $.*]{0,30}",
            id in "[A-Z0-9_]{1,20}",
            after in "[a-z ]{0,30}"
        ) {
            let tokenizer = Tokenizer::with_defaults().unwrap();
            let text = format!("{before}[TOKEN:{id}]{after}");

            prop_assert_eq!(tokenizer.detokenize(&text), text);
        }

        /// 不变式: 统计数据一致性
        #[test]
        fn prop_stats_consistency(text in "[a-zA-Z0-9 $.,]{0,300}") {
            let tokenizer = Tokenizer::with_defaults().unwrap();
            let result = tokenizer.tokenize_and_mask(&text).unwrap();

            let sum: usize = result.stats.counts.values().sum();
            prop_assert_eq!(sum, result.stats.total);
            prop_assert_eq!(result.has_matches, result.stats.total > 0);
            prop_assert!(result.token_mappings.len() <= result.stats.total);
        }
    }
}
