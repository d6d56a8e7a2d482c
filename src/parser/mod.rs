//! XLSX reader
//!
//! Pulls what block scanning needs out of the package: per worksheet the
//! cells with their cached value, formula text and resolved fill colour,
//! the column widths and the cell notes.

mod comments;
pub(crate) mod relationships;
mod styles;
mod worksheet;

use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

use crate::error::Result;
use crate::types::{Cell, Worksheet};

use comments::read_sheet_comments;
use relationships::{
    get_sheet_info, parse_shared_strings, parse_theme, parse_workbook_relationships, SheetInfo,
};
use styles::{fill_table, parse_stylesheet};
use worksheet::{parse_sheet, SheetContext};

/// Worksheets of the package in tab order.
pub(crate) fn list_sheets<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<SheetInfo>> {
    let rels = parse_workbook_relationships(archive)?;
    get_sheet_info(archive, &rels.worksheets)
}

/// Read every worksheet of an XLSX file, hidden ones included.
///
/// # Errors
/// Returns an error if the bytes are not a ZIP archive, the workbook part is
/// missing, or an XML part is malformed.
pub fn read_workbook(data: &[u8]) -> Result<Vec<Worksheet>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let rels = parse_workbook_relationships(&mut archive)?;
    let theme = parse_theme(&mut archive, rels.theme.as_deref());
    let shared_strings = parse_shared_strings(&mut archive, rels.shared_strings.as_deref())?;
    let stylesheet = parse_stylesheet(&mut archive, rels.styles.as_deref())?;
    let fills = fill_table(&stylesheet, &theme);
    let infos = get_sheet_info(&mut archive, &rels.worksheets)?;

    debug!(
        sheets = infos.len(),
        shared_strings = shared_strings.len(),
        cell_formats = fills.len(),
        "reading workbook"
    );

    let context = SheetContext {
        shared_strings: &shared_strings,
        fills: &fills,
    };

    let mut sheets = Vec::with_capacity(infos.len());
    for info in &infos {
        let mut sheet = parse_sheet(&mut archive, info, &context)?;
        for (addr, text) in read_sheet_comments(&mut archive, &info.path)? {
            match sheet.grid.get_mut(addr.row, addr.col) {
                Some(cell) => cell.comment = Some(text),
                None => sheet
                    .grid
                    .insert(Cell::new(addr.row, addr.col).with_comment(text)),
            }
        }
        debug!(sheet = %sheet.name, cells = sheet.grid.len(), hidden = sheet.hidden, "read sheet");
        sheets.push(sheet);
    }

    Ok(sheets)
}
