use serde::{Deserialize, Serialize};

use super::Cell;

/// Cells of one worksheet, stored row by row.
///
/// Rows are ragged: each row keeps only its populated cells, sorted by column.
/// Inserting a cell at an occupied coordinate replaces the previous cell, so
/// coordinates stay unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells<I: IntoIterator<Item = Cell>>(cells: I) -> Self {
        let mut grid = Self::new();
        for cell in cells {
            grid.insert(cell);
        }
        grid
    }

    pub fn insert(&mut self, cell: Cell) {
        let row_idx = cell.row as usize;
        if self.rows.len() <= row_idx {
            self.rows.resize_with(row_idx + 1, Vec::new);
        }
        let Some(row) = self.rows.get_mut(row_idx) else {
            return;
        };
        match row.binary_search_by_key(&cell.col, |c| c.col) {
            Ok(pos) => {
                if let Some(slot) = row.get_mut(pos) {
                    *slot = cell;
                }
            }
            Err(pos) => row.insert(pos, cell),
        }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Cell> {
        let cells = self.rows.get(row as usize)?;
        let pos = cells.binary_search_by_key(&col, |c| c.col).ok()?;
        cells.get(pos)
    }

    pub fn get_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        let cells = self.rows.get_mut(row as usize)?;
        let pos = cells.binary_search_by_key(&col, |c| c.col).ok()?;
        cells.get_mut(pos)
    }

    /// Number of row slots, i.e. last populated row + 1.
    pub fn row_count(&self) -> u32 {
        u32::try_from(self.rows.len()).unwrap_or(u32::MAX)
    }

    /// Row-major iteration over populated cells.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// Column width in Excel character units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColWidth {
    pub col: u32,
    pub width: f64,
}

/// A worksheet as delivered by the reader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worksheet {
    pub name: String,
    /// `hidden` or `veryHidden` in the workbook
    #[serde(default)]
    pub hidden: bool,
    pub grid: Grid,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub col_widths: Vec<ColWidth>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
            ..Self::default()
        }
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.col_widths
            .iter()
            .find(|cw| cw.col == col)
            .map(|cw| cw.width)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows() {
        let grid = Grid::from_cells([Cell::new(0, 0), Cell::new(0, 3), Cell::new(2, 1)]);
        assert!(grid.get(0, 3).is_some());
        assert!(grid.get(0, 1).is_none());
        assert!(grid.get(1, 0).is_none());
        assert!(grid.get(2, 1).is_some());
        assert!(grid.get(7, 0).is_none());
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_insert_replaces_same_coordinate() {
        let mut grid = Grid::new();
        grid.insert(Cell::new(1, 1).with_value("old"));
        grid.insert(Cell::new(1, 1).with_value("new"));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.get(1, 1).unwrap().value, "new");
    }

    #[test]
    fn test_iter_is_row_major() {
        let grid = Grid::from_cells([
            Cell::new(1, 0),
            Cell::new(0, 2),
            Cell::new(0, 1),
            Cell::new(1, 5),
        ]);
        let order: Vec<(u32, u32)> = grid.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(order, vec![(0, 1), (0, 2), (1, 0), (1, 5)]);
    }
}
