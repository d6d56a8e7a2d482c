use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cell_ref::format_cell_ref;
use crate::color::FillColor;

/// A 0-based (row, col) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1-style reference, e.g. `(0, 1)` -> `"B1"`.
    pub fn to_a1(self) -> String {
        format_cell_ref(self.row, self.col)
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// A single worksheet cell as seen by the scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Row (0-indexed)
    pub row: u32,
    /// Column (0-indexed)
    pub col: u32,
    /// Cached display value
    #[serde(default)]
    pub value: String,
    /// Raw formula text including the leading `=`, empty when the cell holds none
    #[serde(default)]
    pub formula: String,
    #[serde(default, skip_serializing_if = "FillColor::is_none")]
    pub fill: FillColor,
    /// Note attached directly to the cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    #[must_use]
    pub fn with_fill(mut self, fill: impl Into<FillColor>) -> Self {
        self.fill = fill.into();
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn addr(&self) -> CellAddr {
        CellAddr::new(self.row, self.col)
    }

    pub fn has_formula(&self) -> bool {
        !self.formula.is_empty()
    }
}
