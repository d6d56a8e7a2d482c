//! Merges block-level point remarks and cell notes into per-column lists.

use std::collections::HashMap;

use crate::types::{Block, BlockRemark, CellAddr, ColumnComments, CommentAnnotation, Grid};

/// Start of every points line.
pub(crate) const POINTS_PREFIX: &str = "Points = ";

/// `"Points = 2.50. Well done"`; without a remark the trailing space goes.
/// Line breaks in the remark become spaces, so the points line is always the
/// first and only line it occupies in a note.
pub fn points_text(remark: &BlockRemark) -> String {
    let comment = remark
        .comment
        .as_deref()
        .unwrap_or_default()
        .replace(['\r', '\n'], " ");
    format!("{POINTS_PREFIX}{:.2}. {comment}", remark.marks)
        .trim_end()
        .to_string()
}

/// Append-only accumulator of annotation text keyed by cell address.
///
/// Addresses keep the order in which they were first seen, which is the
/// order annotations are stacked in later.
#[derive(Debug, Default)]
pub struct CommentCollector {
    entries: Vec<CommentAnnotation>,
    index: HashMap<CellAddr, usize>,
}

impl CommentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, address: CellAddr, text: &str, data_column: u32) {
        if text.is_empty() {
            return;
        }
        if let Some(entry) = self
            .index
            .get(&address)
            .and_then(|&idx| self.entries.get_mut(idx))
        {
            if !entry.text.is_empty() {
                entry.text.push('\n');
            }
            entry.text.push_str(text);
            return;
        }
        self.index.insert(address, self.entries.len());
        self.entries
            .push(CommentAnnotation::new(address, text, data_column));
    }

    /// Put the block's points line on every member, grouped under the
    /// block's leftmost column.
    pub fn add_block(&mut self, block: &Block, remark: &BlockRemark) {
        let text = points_text(remark);
        for cell in &block.members {
            self.append(cell.addr(), &text, block.top_left.col);
        }
    }

    /// Add a note written directly on a cell. If the address already carries
    /// text, the note goes on a new line after it.
    pub fn add_cell_comment(&mut self, address: CellAddr, comment: &str, data_column: u32) {
        self.append(address, comment, data_column);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group the collected annotations by data column.
    pub fn finish(self) -> ColumnComments {
        let mut columns = ColumnComments::new();
        for entry in self.entries {
            columns.entry(entry.data_column).or_default().push(entry);
        }
        columns
    }
}

/// Build the column map for one scanned worksheet.
///
/// Blocks with a remark contribute their points line; every cell note in the
/// grid is then appended. A note on a block member is grouped with its block,
/// any other note under its own column.
pub fn collect_sheet_comments<F>(blocks: &[Block], grid: &Grid, mut remark_for: F) -> ColumnComments
where
    F: FnMut(usize, &Block) -> Option<BlockRemark>,
{
    let mut collector = CommentCollector::new();
    let mut owner: HashMap<CellAddr, u32> = HashMap::new();

    for (idx, block) in blocks.iter().enumerate() {
        for cell in &block.members {
            owner.insert(cell.addr(), block.top_left.col);
        }
        if let Some(remark) = remark_for(idx, block) {
            collector.add_block(block, &remark);
        }
    }

    for cell in grid.iter() {
        let Some(comment) = cell.comment.as_deref() else {
            continue;
        };
        let data_column = owner.get(&cell.addr()).copied().unwrap_or(cell.col);
        collector.add_cell_comment(cell.addr(), comment, data_column);
    }

    collector.finish()
}
