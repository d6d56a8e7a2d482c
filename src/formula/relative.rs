//! Position-independent ("relative") formula forms.
//!
//! Every reference token is rewritten as `R<row>C<col>`. A component pinned
//! with `$` prints the 0-based absolute index; an unpinned component prints
//! the signed offset from the anchor cell, always with a sign. Two cells whose
//! formulas are the same formula filled across a range translate to the same
//! string from their own positions.

use once_cell::sync::Lazy;
use regex::{Match, Regex};

use crate::cell_ref::{CellReference, MAX_COLS, MAX_ROWS};
use crate::error::Result;
use crate::types::CellAddr;

use super::tokenizer::{tokenize, Token, TokenKind};

#[allow(clippy::expect_used)]
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?[A-Z]+\$?[0-9]+").expect("reference pattern compiles"));

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

/// Byte ranges of the `'...'` quoted parts of an operand (sheet names).
/// A doubled `''` inside quotes is an escaped quote.
fn quoted_spans(operand: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut chars = operand.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut end = operand.len();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if chars.peek().is_some_and(|&(_, next)| next == '\'') {
                    chars.next();
                    continue;
                }
                end = i + 1;
                break;
            }
        }
        spans.push((start, end));
    }
    spans
}

/// References embedded in an operand token, skipping matches that are only
/// part of a longer name (`LOG10`, `Data2024!`, `x1A2`) or that sit inside a
/// quoted sheet name (`'Q1 2024'!A1`).
fn references<'t>(operand: &'t str) -> impl Iterator<Item = Match<'t>> + 't {
    let quoted = quoted_spans(operand);
    REFERENCE.find_iter(operand).filter(move |m| {
        if quoted.iter().any(|&(start, end)| (start..end).contains(&m.start())) {
            return false;
        }
        let before = operand.get(..m.start()).and_then(|s| s.chars().next_back());
        let after = operand.get(m.end()..).and_then(|s| s.chars().next());
        !before.is_some_and(is_name_char)
            && !after.is_some_and(|c| is_name_char(c) || c == '(' || c == '!')
    })
}

fn carries_references(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Operand && !token.is_numeric()
}

/// Whether the formula contains at least one reference token.
pub fn has_references(formula: &str) -> bool {
    tokenize(formula)
        .iter()
        .filter(|t| carries_references(t))
        .any(|t| references(t.text).next().is_some())
}

fn component(value: u32, anchor: u32, pinned: bool) -> String {
    if pinned {
        value.to_string()
    } else {
        format!("{:+}", i64::from(value) - i64::from(anchor))
    }
}

fn relative_reference(anchor: CellAddr, reference: &CellReference) -> String {
    format!(
        "R{}C{}",
        component(reference.row, anchor.row, reference.row_pinned),
        component(reference.col, anchor.col, reference.col_pinned)
    )
}

/// Rewrite each reference in `text` with `rewrite`, leaving the rest intact.
fn replace_references(
    text: &str,
    mut rewrite: impl FnMut(&CellReference) -> String,
) -> Result<String> {
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for m in references(text) {
        out.push_str(text.get(last..m.start()).unwrap_or_default());
        out.push_str(&rewrite(&CellReference::decode(m.as_str())?));
        last = m.end();
    }
    out.push_str(text.get(last..).unwrap_or_default());
    Ok(out)
}

/// Translate a formula into its relative form as seen from `anchor`.
///
/// Formulas without references come back unchanged. Otherwise the leading
/// `=` and all whitespace are dropped and the tokens are joined with single
/// spaces, so `A1/B11-67` at `(0, 0)` becomes `R+0C+0 / R+10C+1 - 67`.
///
/// # Errors
/// Returns [`crate::error::XlblocksError::CellRef`] when a reference token
/// cannot be decoded (row 0, beyond the sheet limits).
pub fn translate(anchor: CellAddr, formula: &str) -> Result<String> {
    if !has_references(formula) {
        return Ok(formula.to_string());
    }

    let body = formula.trim_start();
    let body = body.strip_prefix('=').unwrap_or(body);

    let mut parts = Vec::new();
    for token in tokenize(body) {
        if token.kind == TokenKind::Whitespace {
            continue;
        }
        if carries_references(&token) {
            parts.push(replace_references(token.text, |r| {
                relative_reference(anchor, r)
            })?);
        } else {
            parts.push(token.text.to_string());
        }
    }
    Ok(parts.join(" "))
}

fn shift_index(value: u32, delta: i64, limit: u32) -> Option<u32> {
    let shifted = i64::from(value).checked_add(delta)?;
    u32::try_from(shifted).ok().filter(|&v| v < limit)
}

/// Move every unpinned reference by `(d_row, d_col)`, keeping the formula's
/// text otherwise byte for byte. References pushed off the sheet become `#REF!`.
///
/// This is how a shared formula written once for a range is materialized in
/// each dependent cell.
///
/// # Errors
/// Returns [`crate::error::XlblocksError::CellRef`] for undecodable references.
pub fn shift_formula(formula: &str, d_row: i64, d_col: i64) -> Result<String> {
    let mut out = String::with_capacity(formula.len());
    for token in tokenize(formula) {
        if !carries_references(&token) {
            out.push_str(token.text);
            continue;
        }
        out.push_str(&replace_references(token.text, |r| {
            let row = if r.row_pinned {
                Some(r.row)
            } else {
                shift_index(r.row, d_row, MAX_ROWS)
            };
            let col = if r.col_pinned {
                Some(r.col)
            } else {
                shift_index(r.col, d_col, MAX_COLS)
            };
            match (row, col) {
                (Some(row), Some(col)) => CellReference { row, col, ..*r }.to_string(),
                _ => "#REF!".to_string(),
            }
        })?);
    }
    Ok(out)
}
