use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CellAddr;

/// Grading input for one block: the marks awarded and an optional remark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRemark {
    pub marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl BlockRemark {
    pub fn new(marks: f64) -> Self {
        Self {
            marks,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A piece of text waiting to be rendered next to `address`.
///
/// `box_row` / `box_col` stay `None` until the layout pass assigns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAnnotation {
    pub address: CellAddr,
    pub text: String,
    /// Column used for layout grouping
    pub data_column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_col: Option<u32>,
}

impl CommentAnnotation {
    pub fn new(address: CellAddr, text: impl Into<String>, data_column: u32) -> Self {
        Self {
            address,
            text: text.into(),
            data_column,
            box_row: None,
            box_col: None,
        }
    }
}

/// Annotations grouped by data column, each group in emission order.
pub type ColumnComments = BTreeMap<u32, Vec<CommentAnnotation>>;

/// A laid-out call-out box, ready for a writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedCallout {
    pub address: CellAddr,
    pub box_row: u32,
    pub box_col: u32,
    /// Rows the box occupies, as measured by the text-height oracle
    pub height_rows: u32,
    pub text: String,
}
