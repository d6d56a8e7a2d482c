//! A small lexer for spreadsheet formula text.
//!
//! Tokens cover the input contiguously, so concatenating every token's text
//! reproduces the formula exactly. Nothing is evaluated; the lexer only needs
//! to tell operands (where references live) apart from string literals,
//! error literals, array constants and function names.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// References, ranges, numbers, names (`A1`, `Sheet1!$B$2:C3`, `1.5E+3`)
    Operand,
    /// Function name including its opening parenthesis (`SUM(`)
    Function,
    Operator,
    /// String literal including quotes
    Text,
    /// Error literal (`#REF!`, `#N/A`)
    Error,
    /// Array constant including braces
    Array,
    Whitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl Token<'_> {
    /// Operands that start with a digit are numbers or row ranges.
    pub fn is_numeric(&self) -> bool {
        self.text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '^' | '&' | '=' | '<' | '>' | '%' | ',' | ';' | '(' | ')' | '@'
    )
}

fn is_operand_char(c: char) -> bool {
    !c.is_whitespace() && !is_operator_char(c) && !matches!(c, '"' | '{' | '}')
}

type Chars<'a> = Peekable<CharIndices<'a>>;

/// Consume a quoted run whose opening quote was already taken. A doubled
/// quote is an escaped quote.
fn consume_quoted(chars: &mut Chars<'_>, quote: char) {
    while let Some((_, c)) = chars.next() {
        if c == quote {
            if chars.peek().is_some_and(|&(_, next)| next == quote) {
                chars.next();
                continue;
            }
            return;
        }
    }
}

fn consume_error(chars: &mut Chars<'_>) {
    while chars
        .peek()
        .is_some_and(|&(_, c)| c.is_ascii_alphanumeric() || c == '/')
    {
        chars.next();
    }
    if chars.peek().is_some_and(|&(_, c)| c == '!' || c == '?') {
        chars.next();
    }
}

fn consume_array(chars: &mut Chars<'_>) {
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => consume_quoted(chars, '"'),
            '}' => return,
            _ => {}
        }
    }
}

/// Returns `true` when the operand turned out to be a function name.
fn consume_operand(chars: &mut Chars<'_>, first: char) -> bool {
    if first == '\'' {
        consume_quoted(chars, '\'');
    }
    let numeric = first.is_ascii_digit() || first == '.';
    let mut prev = first;
    while let Some(&(_, c)) = chars.peek() {
        let exponent_sign = numeric && matches!(prev, 'E' | 'e') && matches!(c, '+' | '-');
        if c == '\'' {
            chars.next();
            consume_quoted(chars, '\'');
        } else if is_operand_char(c) || exponent_sign {
            chars.next();
        } else {
            break;
        }
        prev = c;
    }
    if chars.peek().is_some_and(|&(_, c)| c == '(') {
        chars.next();
        return true;
    }
    false
}

/// Split formula text (without or with its leading `=`) into tokens.
pub fn tokenize(formula: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = formula.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let kind = match ch {
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
                    chars.next();
                }
                TokenKind::Whitespace
            }
            '"' => {
                consume_quoted(&mut chars, '"');
                TokenKind::Text
            }
            '#' => {
                consume_error(&mut chars);
                TokenKind::Error
            }
            '{' => {
                consume_array(&mut chars);
                TokenKind::Array
            }
            c if is_operator_char(c) => {
                if let Some(&(_, next)) = chars.peek() {
                    if matches!((c, next), ('<', '=' | '>') | ('>', '=')) {
                        chars.next();
                    }
                }
                TokenKind::Operator
            }
            c => {
                if consume_operand(&mut chars, c) {
                    TokenKind::Function
                } else {
                    TokenKind::Operand
                }
            }
        };
        let end = chars.peek().map_or(formula.len(), |&(i, _)| i);
        tokens.push(Token {
            kind,
            text: formula.get(start..end).unwrap_or_default(),
        });
    }

    tokens
}
