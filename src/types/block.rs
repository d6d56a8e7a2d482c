use serde::{Deserialize, Serialize};

use crate::cell_ref::format_range;
use crate::color::FillColor;

use super::{Cell, CellAddr};

/// A discovered formula region.
///
/// `members` lists the cells that matched during growth, in row-major order.
/// Staircase growth can leave cells inside the bounds that are not members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub top_left: CellAddr,
    /// Inclusive
    pub bottom_right: CellAddr,
    pub color: FillColor,
    pub canonical_formula: String,
    pub members: Vec<Cell>,
}

impl Block {
    /// A1-style range of the bounds, e.g. `"B2:D5"` (or `"B2"` for one cell).
    pub fn range(&self) -> String {
        format_range(self.top_left, self.bottom_right)
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.top_left.row..=self.bottom_right.row).contains(&row)
            && (self.top_left.col..=self.bottom_right.col).contains(&col)
    }

    pub fn is_member(&self, row: u32, col: u32) -> bool {
        self.members.iter().any(|c| c.row == row && c.col == col)
    }
}
