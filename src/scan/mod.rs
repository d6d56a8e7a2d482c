//! Greedy formula-block extraction.
//!
//! One row-major pass over a worksheet grid. Each unclaimed cell with the
//! target fill anchors a block that grows right along the anchor row, then
//! down row by row. A later row is accepted only while the cell at the
//! current right edge still matches, and may push the right edge further
//! (staircase growth). The right edge never moves left.

pub mod guard;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::color::FillColor;
use crate::error::Result;
use crate::formula::translate;
use crate::types::{Block, Cell, CellAddr, Grid, Worksheet};

pub use guard::OverlapGuard;

/// What to look for and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanOptions {
    pub target_color: FillColor,
    /// Also scan worksheets marked hidden in the workbook
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target_color: FillColor::new("FFFF00"),
            include_hidden: false,
        }
    }
}

/// Result of scanning one worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub blocks: Vec<Block>,
    /// Distinct fills seen anywhere in the grid
    pub observed_colors: BTreeSet<FillColor>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Scan results of one worksheet of a workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetScan {
    pub sheet: String,
    pub report: ScanReport,
}

struct BlockScanner<'a> {
    grid: &'a Grid,
    target: &'a FillColor,
    guard: OverlapGuard,
    blocks: Vec<Block>,
}

impl<'a> BlockScanner<'a> {
    fn new(grid: &'a Grid, target: &'a FillColor) -> Self {
        Self {
            grid,
            target,
            guard: OverlapGuard::new(),
            blocks: Vec::new(),
        }
    }

    /// A cell joins the current block when it exists, carries the target
    /// fill, lies outside earlier blocks, and has the block's relative form.
    fn matching_cell(&self, row: u32, col: u32, canonical: &str) -> Result<Option<&'a Cell>> {
        let Some(cell) = self.grid.get(row, col) else {
            return Ok(None);
        };
        if cell.fill != *self.target || self.guard.claim(row, col) {
            return Ok(None);
        }
        let relative = translate(cell.addr(), &cell.formula)?;
        Ok((relative == canonical).then_some(cell))
    }

    /// Extend rightward from `from` while cells match; returns the new right edge.
    fn extend_right(
        &self,
        row: u32,
        from: u32,
        canonical: &str,
        members: &mut Vec<Cell>,
    ) -> Result<u32> {
        let mut right = from;
        while let Some(next) = right.checked_add(1) {
            match self.matching_cell(row, next, canonical)? {
                Some(cell) => {
                    members.push(cell.clone());
                    right = next;
                }
                None => break,
            }
        }
        Ok(right)
    }

    fn grow(&self, anchor: &Cell) -> Result<Block> {
        let canonical = translate(anchor.addr(), &anchor.formula)?;
        let mut members = vec![anchor.clone()];

        let mut right = self.extend_right(anchor.row, anchor.col, &canonical, &mut members)?;
        let mut bottom = anchor.row;

        for row in anchor.row.saturating_add(1)..self.grid.row_count() {
            if self.matching_cell(row, right, &canonical)?.is_none() {
                break;
            }
            for col in anchor.col..=right {
                if let Some(cell) = self.matching_cell(row, col, &canonical)? {
                    members.push(cell.clone());
                }
            }
            right = self.extend_right(row, right, &canonical, &mut members)?;
            bottom = row;
        }

        Ok(Block {
            top_left: anchor.addr(),
            bottom_right: CellAddr::new(bottom, right),
            color: anchor.fill.clone(),
            canonical_formula: canonical,
            members,
        })
    }

    fn run(mut self) -> Result<ScanReport> {
        let mut observed_colors = BTreeSet::new();
        let grid = self.grid;

        for cell in grid.iter() {
            if !cell.fill.is_none() && !observed_colors.contains(&cell.fill) {
                observed_colors.insert(cell.fill.clone());
            }
            if cell.fill != *self.target || self.guard.claim(cell.row, cell.col) {
                continue;
            }
            let block = self.grow(cell)?;
            debug!(
                range = %block.range(),
                members = block.members.len(),
                formula = %block.canonical_formula,
                "closed block"
            );
            self.guard.insert(block.top_left, block.bottom_right);
            self.blocks.push(block);
        }

        Ok(ScanReport {
            blocks: self.blocks,
            observed_colors,
        })
    }
}

/// Partition one grid into formula blocks of the target fill.
///
/// An empty `blocks` list is a normal outcome; `observed_colors` then tells
/// the caller which fills the grid does carry.
///
/// # Errors
/// Any reference that cannot be decoded aborts the scan; no partial result is
/// returned.
pub fn scan_grid(grid: &Grid, target: &FillColor) -> Result<ScanReport> {
    BlockScanner::new(grid, target).run()
}

/// Scan every worksheet of a workbook, skipping hidden ones unless asked not to.
///
/// # Errors
/// The first worksheet that fails to scan aborts the whole call.
pub fn scan_workbook(sheets: &[Worksheet], options: &ScanOptions) -> Result<Vec<SheetScan>> {
    let mut scans = Vec::new();
    for sheet in sheets {
        if sheet.hidden && !options.include_hidden {
            debug!(sheet = %sheet.name, "skipping hidden worksheet");
            continue;
        }
        let report = scan_grid(&sheet.grid, &options.target_color)?;
        if report.is_empty() {
            let seen: Vec<&str> = report.observed_colors.iter().map(FillColor::as_str).collect();
            warn!(
                sheet = %sheet.name,
                target = %options.target_color,
                observed = ?seen,
                "no cells with the target fill"
            );
        } else {
            debug!(sheet = %sheet.name, blocks = report.blocks.len(), "scanned worksheet");
        }
        scans.push(SheetScan {
            sheet: sheet.name.clone(),
            report,
        });
    }
    Ok(scans)
}
