//! Annotation run configuration, read from JSON.
//!
//! ```json
//! {
//!   "scan": { "targetColor": "FFFF00", "includeHidden": false },
//!   "layout": { "boxColumn": null, "firstBoxRow": 1 },
//!   "textHeight": { "charsPerLine": 30, "linesPerRow": 1, "paddingRows": 1 },
//!   "remarks": [
//!     { "sheet": "Sheet1", "range": "B2:C4", "marks": 2, "comment": "ok" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::cell_ref::parse_cell_range;
use crate::error::Result;
use crate::layout::{EstimatedTextHeight, LayoutOptions};
use crate::scan::ScanOptions;
use crate::types::{Block, BlockRemark};

/// Remark for the block covering `range` on `sheet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemarkEntry {
    pub sheet: String,
    /// Block range in A1 notation, `$` pins are ignored
    pub range: String,
    #[serde(flatten)]
    pub remark: BlockRemark,
}

impl RemarkEntry {
    fn matches(&self, sheet: &str, block: &Block) -> bool {
        if self.sheet != sheet {
            return false;
        }
        let range = self.range.replace('$', "").to_ascii_uppercase();
        match parse_cell_range(&range) {
            Some((start, end)) => start == block.top_left && end == block.bottom_right,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotateConfig {
    pub scan: ScanOptions,
    pub layout: LayoutOptions,
    pub text_height: EstimatedTextHeight,
    pub remarks: Vec<RemarkEntry>,
}

impl AnnotateConfig {
    /// Parse a configuration document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if `json` is not a valid configuration object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Remark for `block` on `sheet`; the first matching entry wins.
    pub fn remark_for(&self, sheet: &str, block: &Block) -> Option<BlockRemark> {
        self.remarks
            .iter()
            .find(|entry| entry.matches(sheet, block))
            .map(|entry| entry.remark.clone())
    }
}
