//! xlblocks - formula block extraction for XLSX worksheets
//!
//! Finds rectangular-ish blocks of cells that share a fill colour and the
//! same formula in relative form, and writes grading call-out boxes next to
//! them:
//! - XLSX reading (cells, formulas, resolved fills, notes)
//! - Relative (R1C1-style) formula canonicalisation
//! - Greedy block scanning with staircase growth
//! - Non-overlapping call-out layout and note writing
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { extract_blocks, annotate_xlsx } from 'xlblocks';
//! await init();
//! const scans = extract_blocks(data, 'FFFF00');
//! const annotated = annotate_xlsx(data, JSON.stringify(config), measure);
//! ```
//!
//! # Usage (Rust)
//!
//! ```no_run
//! use xlblocks::{parser::read_workbook, scan::{scan_workbook, ScanOptions}};
//!
//! # fn main() -> xlblocks::Result<()> {
//! let data = std::fs::read("marks.xlsx")?;
//! let sheets = read_workbook(&data)?;
//! for scan in scan_workbook(&sheets, &ScanOptions::default())? {
//!     println!("{}: {} blocks", scan.sheet, scan.report.blocks.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotate;
pub mod cell_ref;
pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod formula;
pub mod layout;
pub mod parser;
pub mod persist;
pub mod scan;
pub mod types;
pub mod xml_helpers;

use wasm_bindgen::prelude::*;

pub use annotate::{annotate_xlsx_with, AnnotatedWorkbook, SheetAnnotation};
pub use color::FillColor;
pub use config::AnnotateConfig;
pub use error::{Result, XlblocksError};
pub use export::{CalloutWriter, XlsxCalloutWriter};
pub use layout::{EstimatedTextHeight, LayoutOptions, TextHeight};
pub use persist::{persist_report, BlockId, BlockStore, MemoryStore};
pub use scan::{scan_grid, scan_workbook, ScanOptions, ScanReport, SheetScan};
pub use types::*;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Text-height oracle backed by a JavaScript `(text, column) => rows`
/// function. Throwing or returning a non-number counts as one row.
struct JsTextHeight(js_sys::Function);

impl TextHeight for JsTextHeight {
    fn height_of(&self, text: &str, column: u32) -> f64 {
        self.0
            .call2(&JsValue::NULL, &JsValue::from_str(text), &JsValue::from(column))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::NAN)
    }
}

/// Scan every visible worksheet for blocks of the given fill colour
///
/// # Arguments
/// * `data` - The raw bytes of the XLSX file
/// * `color` - Target fill as `RRGGBB`, `#RRGGBB` or `AARRGGBB`
///
/// # Returns
/// An array of `{ sheet, report: { blocks, observedColors } }`
///
/// # Errors
/// Returns an error if the XLSX file is invalid or a formula reference
/// cannot be decoded.
#[wasm_bindgen]
pub fn extract_blocks(data: &[u8], color: &str) -> std::result::Result<JsValue, JsValue> {
    let sheets = parser::read_workbook(data).map_err(js_error)?;
    let options = ScanOptions {
        target_color: FillColor::new(color),
        ..ScanOptions::default()
    };
    let scans = scan_workbook(&sheets, &options).map_err(js_error)?;

    serde_wasm_bindgen::to_value(&scans)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Write call-out boxes into an XLSX file and return the new file
///
/// `height_fn`, when given, measures each box; otherwise the estimate from
/// the configuration is used.
///
/// # Errors
/// Returns an error if the configuration JSON is invalid or the XLSX file
/// cannot be read or rewritten.
#[wasm_bindgen]
pub fn annotate_xlsx(
    data: &[u8],
    config_json: &str,
    height_fn: Option<js_sys::Function>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let config = AnnotateConfig::from_json(config_json).map_err(js_error)?;
    let annotated = match height_fn {
        Some(f) => annotate_xlsx_with(data, &config, &JsTextHeight(f)),
        None => annotate::annotate_xlsx(data, &config),
    }
    .map_err(js_error)?;
    Ok(annotated.bytes)
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
