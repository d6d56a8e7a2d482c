//! Stacking call-out boxes so they never overlap.
//!
//! Data columns are handled right to left. The i-th column handled gets its
//! boxes in box column `base + 2 * i`; inside a column the boxes stack top
//! down in collector order, each starting where the previous one's rounded-up
//! height ends.

use serde::{Deserialize, Serialize};

use crate::types::{ColumnComments, PlacedCallout};

use super::f64_to_u32_clamped;
use super::text_height::TextHeight;

/// Columns between the box columns of neighbouring data columns.
const COLUMN_STRIDE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Fixed first box column; defaults to the first annotation's column + 1
    pub box_column: Option<u32>,
    /// Row at which every column's stack starts
    pub first_box_row: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            box_column: None,
            first_box_row: 1,
        }
    }
}

/// Whole rows taken by a box of the given measured height. Non-positive or
/// NaN heights count as one row.
pub fn rows_for_height(height: f64) -> u32 {
    if height.is_nan() || height <= 0.0 {
        return 1;
    }
    f64_to_u32_clamped(height.ceil()).max(1)
}

/// Assign `box_row` / `box_col` to every annotation and return the placed
/// boxes in layout order.
pub fn layout_callouts<H>(
    columns: &mut ColumnComments,
    oracle: &H,
    options: &LayoutOptions,
) -> Vec<PlacedCallout>
where
    H: TextHeight + ?Sized,
{
    let base = options.box_column.unwrap_or_else(|| {
        columns
            .values()
            .rev()
            .find_map(|group| group.first())
            .map_or(0, |first| first.address.col.saturating_add(1))
    });

    let mut placed = Vec::new();
    let non_empty = columns.iter_mut().rev().filter(|(_, group)| !group.is_empty());
    for (i, (&data_column, group)) in (0u32..).zip(non_empty) {
        let box_col = base.saturating_add(COLUMN_STRIDE.saturating_mul(i));
        let mut cursor = options.first_box_row;
        for annotation in group.iter_mut() {
            let height_rows = rows_for_height(oracle.height_of(&annotation.text, data_column));
            annotation.box_row = Some(cursor);
            annotation.box_col = Some(box_col);
            placed.push(PlacedCallout {
                address: annotation.address,
                box_row: cursor,
                box_col,
                height_rows,
                text: annotation.text.clone(),
            });
            cursor = cursor.saturating_add(height_rows);
        }
    }
    placed
}
