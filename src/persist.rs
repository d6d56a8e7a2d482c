//! Persistence sink for scan results.
//!
//! [`BlockStore`] is what a database layer implements; the scanner itself
//! never talks to storage. [`MemoryStore`] keeps everything in vectors and is
//! what the CLI serializes.

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, XlblocksError};
use crate::scan::ScanReport;
use crate::types::{Block, Cell};

/// Identifier a store hands out for a created block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub u64);

/// Destination for blocks and their member cells.
pub trait BlockStore {
    fn create_block(&mut self, sheet: &str, block: &Block) -> Result<BlockId>;

    fn create_cell(&mut self, block_id: BlockId, cell: &Cell) -> Result<()>;

    /// Record the block's textual range, e.g. `"B2:D9"`.
    fn update_block_range(&mut self, block_id: BlockId, range: &str) -> Result<()>;
}

/// Write every block of `report`: the block row, then its members, then its
/// range. Stops at the first store error.
///
/// # Errors
/// Propagates whatever the store returns.
pub fn persist_report<S>(store: &mut S, sheet: &str, report: &ScanReport) -> Result<Vec<BlockId>>
where
    S: BlockStore + ?Sized,
{
    let mut ids = Vec::with_capacity(report.blocks.len());
    for block in &report.blocks {
        let id = store.create_block(sheet, block)?;
        for cell in &block.members {
            store.create_cell(id, cell)?;
        }
        store.update_block_range(id, &block.range())?;
        ids.push(id);
    }
    debug!(sheet, blocks = ids.len(), "persisted scan report");
    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlock {
    pub id: BlockId,
    pub sheet: String,
    pub range: Option<String>,
    pub color: String,
    pub formula: String,
    pub cells: Vec<Cell>,
}

/// In-memory [`BlockStore`]. Ids count up from 1.
#[derive(Debug, Default, Serialize)]
pub struct MemoryStore {
    blocks: Vec<StoredBlock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[StoredBlock] {
        &self.blocks
    }

    pub fn get(&self, id: BlockId) -> Option<&StoredBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BlockId) -> Result<&mut StoredBlock> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| XlblocksError::Store(format!("no block with id {}", id.0)))
    }
}

impl BlockStore for MemoryStore {
    fn create_block(&mut self, sheet: &str, block: &Block) -> Result<BlockId> {
        let id = BlockId(self.blocks.len() as u64 + 1);
        self.blocks.push(StoredBlock {
            id,
            sheet: sheet.to_string(),
            range: None,
            color: block.color.as_str().to_string(),
            formula: block.canonical_formula.clone(),
            cells: Vec::with_capacity(block.members.len()),
        });
        Ok(id)
    }

    fn create_cell(&mut self, block_id: BlockId, cell: &Cell) -> Result<()> {
        self.get_mut(block_id)?.cells.push(cell.clone());
        Ok(())
    }

    fn update_block_range(&mut self, block_id: BlockId, range: &str) -> Result<()> {
        self.get_mut(block_id)?.range = Some(range.to_string());
        Ok(())
    }
}
