//! Formula text handling: lexing and position-independent reference forms.

pub mod relative;
pub mod tokenizer;

pub use relative::{shift_formula, translate};
pub use tokenizer::{tokenize, Token, TokenKind};
