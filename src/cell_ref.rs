//! Utilities for parsing and formatting Excel-style cell references.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, XlblocksError};
use crate::types::CellAddr;

/// Number of columns in a worksheet (`A`..=`XFD`).
pub const MAX_COLS: u32 = 16_384;
/// Number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Parse a cell reference like "A1" into (col, row) where col and row are 0-indexed.
///
/// Lenient: `$` markers are ignored and letters may be lower case. Use
/// [`CellReference::decode`] where malformed input must be rejected.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Bytes equivalent of [`parse_cell_ref`] for raw XML attribute values.
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            let upper = b.to_ascii_uppercase();
            col = col
                .saturating_mul(26)
                .saturating_add(u32::from(upper - b'A') + 1);
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            saw_row = true;
        }
    }

    if !saw_col || !saw_row {
        return None;
    }

    Some((col.saturating_sub(1), row.saturating_sub(1)))
}

/// Convert a 0-based column index to its letters (0 -> "A", 27 -> "AB").
pub fn col_to_letter(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = u64::from(col) + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + u8::try_from(n % 26).unwrap_or(0));
        n /= 26;
    }
    letters.iter().rev().map(|&b| char::from(b)).collect()
}

/// Format a 0-based coordinate as an A1 reference.
pub fn format_cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letter(col), u64::from(row) + 1)
}

/// Format inclusive bounds as an A1 range; a single cell collapses to one reference.
pub fn format_range(top_left: CellAddr, bottom_right: CellAddr) -> String {
    if top_left == bottom_right {
        return top_left.to_a1();
    }
    format!("{}:{}", top_left.to_a1(), bottom_right.to_a1())
}

/// Parse a range like "A1:B10" or "A1" into its inclusive corners.
pub fn parse_cell_range(range: &str) -> Option<(CellAddr, CellAddr)> {
    let (start, end) = range.split_once(':').unwrap_or((range, range));
    let (start_col, start_row) = parse_cell_ref(start)?;
    let (end_col, end_row) = parse_cell_ref(end)?;
    Some((
        CellAddr::new(start_row, start_col),
        CellAddr::new(end_row, end_col),
    ))
}

/// A decoded reference token such as `B7`, `$B7`, `B$7` or `$B$7`.
///
/// Coordinates are 0-based; the pin flags record which parts carried `$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellReference {
    pub row: u32,
    pub col: u32,
    pub row_pinned: bool,
    pub col_pinned: bool,
}

impl CellReference {
    /// Strictly decode a reference token: upper-case letters, a row number of
    /// at least 1, and both parts inside the worksheet limits.
    pub fn decode(token: &str) -> Result<Self> {
        let invalid = |why: &str| XlblocksError::CellRef(format!("{token}: {why}"));

        let (col_pinned, rest) = match token.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let letters_end = rest
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(letters_end);
        if letters.is_empty() {
            return Err(invalid("missing column letters"));
        }
        let (row_pinned, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("missing row number"));
        }

        let mut col: u32 = 0;
        for b in letters.bytes() {
            col = col
                .checked_mul(26)
                .and_then(|c| c.checked_add(u32::from(b - b'A') + 1))
                .ok_or_else(|| invalid("column out of range"))?;
        }
        if col > MAX_COLS {
            return Err(invalid("column out of range"));
        }

        let row: u32 = digits.parse().map_err(|_| invalid("row out of range"))?;
        if row == 0 || row > MAX_ROWS {
            return Err(invalid("row out of range"));
        }

        Ok(Self {
            row: row - 1,
            col: col - 1,
            row_pinned,
            col_pinned,
        })
    }

    pub fn addr(&self) -> CellAddr {
        CellAddr::new(self.row, self.col)
    }
}

impl FromStr for CellReference {
    type Err = XlblocksError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col_pin = if self.col_pinned { "$" } else { "" };
        let row_pin = if self.row_pinned { "$" } else { "" };
        write!(
            f,
            "{col_pin}{}{row_pin}{}",
            col_to_letter(self.col),
            u64::from(self.row) + 1
        )
    }
}
