//! Text-height oracles: how many worksheet rows a call-out box needs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::usize_to_f64;

/// Measures the rendered height of `text` in rows, for a box that belongs to
/// data column `column`.
///
/// Any `Fn(&str, u32) -> f64` closure is an oracle.
pub trait TextHeight {
    fn height_of(&self, text: &str, column: u32) -> f64;
}

impl<F> TextHeight for F
where
    F: Fn(&str, u32) -> f64,
{
    fn height_of(&self, text: &str, column: u32) -> f64 {
        self(text, column)
    }
}

/// Font-free estimate: wrap each line at a fixed character width, then
/// convert the wrapped line count to rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EstimatedTextHeight {
    /// Characters per wrapped line inside a box
    pub chars_per_line: f64,
    /// Wrapped text lines that fit in one worksheet row
    pub lines_per_row: f64,
    /// Rows added for the box border and margins
    pub padding_rows: f64,
    /// Per data column overrides of `chars_per_line`
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub column_chars: HashMap<u32, f64>,
}

impl Default for EstimatedTextHeight {
    fn default() -> Self {
        Self {
            chars_per_line: 30.0,
            lines_per_row: 1.0,
            padding_rows: 1.0,
            column_chars: HashMap::new(),
        }
    }
}

impl EstimatedTextHeight {
    /// Derive per-column line widths from worksheet column widths
    /// (character units); a box spans two columns.
    #[must_use]
    pub fn with_column_widths(mut self, widths: impl IntoIterator<Item = (u32, f64)>) -> Self {
        for (col, width) in widths {
            if width > 0.0 {
                self.column_chars.insert(col, width * 2.0);
            }
        }
        self
    }

    fn wrapped_lines(&self, text: &str, column: u32) -> f64 {
        let width = self
            .column_chars
            .get(&column)
            .copied()
            .unwrap_or(self.chars_per_line)
            .max(1.0);
        text.split('\n')
            .map(|line| (usize_to_f64(line.chars().count()) / width).ceil().max(1.0))
            .sum()
    }
}

impl TextHeight for EstimatedTextHeight {
    fn height_of(&self, text: &str, column: u32) -> f64 {
        let lines_per_row = if self.lines_per_row > 0.0 {
            self.lines_per_row
        } else {
            1.0
        };
        self.wrapped_lines(text, column) / lines_per_row + self.padding_rows
    }
}
