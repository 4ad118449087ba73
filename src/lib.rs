// Ledger Tokenizer Library
// Reversible masking of monetary amounts and merchant names in transaction text

pub mod tokenizer;

pub use tokenizer::{
    Token, TokenRegistry, TokenType, TokenizationResult, TokenizationRule, Tokenizer,
    TokenizerConfig, TokenizerError,
};
