//! Writing call-out boxes back into a workbook.
//!
//! [`CalloutWriter`] is the seam between layout and a concrete file format.
//! [`XlsxCalloutWriter`] patches the original XLSX archive: each touched
//! sheet gets its note layer (comments part plus VML drawing) rebuilt from
//! the boxes handed to the writer, everything else is passed through
//! byte-identical.

pub(crate) mod callout_xml;
pub(crate) mod zip_patcher;

use std::collections::BTreeMap;
use std::io::Cursor;
use zip::ZipArchive;

use crate::error::{Result, XlblocksError};
use crate::parser::list_sheets;
use crate::parser::relationships::SheetInfo;
use crate::types::PlacedCallout;

/// Sink for laid-out call-out boxes.
pub trait CalloutWriter {
    /// Remove every call-out box of `sheet`, including ones from earlier runs.
    fn clear_callouts(&mut self, sheet: &str) -> Result<()>;

    /// Add one box to `sheet`. A second box for the same cell replaces the first.
    fn write_callout(&mut self, sheet: &str, callout: &PlacedCallout) -> Result<()>;

    /// Produce the output file.
    fn finish(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}

/// [`CalloutWriter`] over an XLSX file held in memory.
pub struct XlsxCalloutWriter {
    original: Vec<u8>,
    sheets: Vec<SheetInfo>,
    /// Touched sheets by index, with their boxes in write order
    pending: BTreeMap<usize, Vec<PlacedCallout>>,
}

impl XlsxCalloutWriter {
    /// # Errors
    /// Returns an error if `original` is not a readable XLSX package.
    pub fn new(original: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(original))?;
        let sheets = list_sheets(&mut archive)?;
        Ok(Self {
            original: original.to_vec(),
            sheets,
            pending: BTreeMap::new(),
        })
    }

    /// Names of the workbook's sheets in tab order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    fn sheet_index(&self, sheet: &str) -> Result<usize> {
        self.sheets
            .iter()
            .position(|s| s.name == sheet)
            .ok_or_else(|| XlblocksError::Parse(format!("unknown sheet: {sheet}")))
    }
}

impl CalloutWriter for XlsxCalloutWriter {
    fn clear_callouts(&mut self, sheet: &str) -> Result<()> {
        let idx = self.sheet_index(sheet)?;
        self.pending.insert(idx, Vec::new());
        Ok(())
    }

    fn write_callout(&mut self, sheet: &str, callout: &PlacedCallout) -> Result<()> {
        let idx = self.sheet_index(sheet)?;
        let callouts = self.pending.entry(idx).or_default();
        match callouts.iter_mut().find(|c| c.address == callout.address) {
            Some(existing) => *existing = callout.clone(),
            None => callouts.push(callout.clone()),
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        if self.pending.is_empty() {
            return Ok(self.original);
        }
        zip_patcher::patch_callouts(&self.original, &self.sheets, &self.pending)
    }
}
