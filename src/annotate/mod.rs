//! Annotation pipeline: read, scan, collect, lay out, write.

pub mod collector;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AnnotateConfig;
use crate::error::Result;
use crate::export::{CalloutWriter, XlsxCalloutWriter};
use crate::layout::{layout_callouts, TextHeight};
use crate::parser::read_workbook;
use crate::scan::scan_workbook;
use crate::types::PlacedCallout;

pub use collector::{collect_sheet_comments, points_text, CommentCollector};

/// What one annotation run placed on a worksheet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetAnnotation {
    pub sheet: String,
    pub blocks: usize,
    pub callouts: Vec<PlacedCallout>,
}

/// The rewritten file plus a per-sheet summary.
#[derive(Debug, Clone)]
pub struct AnnotatedWorkbook {
    pub bytes: Vec<u8>,
    pub sheets: Vec<SheetAnnotation>,
}

/// Annotate an XLSX file, measuring boxes with the configured estimate
/// (adjusted to each sheet's column widths).
///
/// # Errors
/// Returns an error if the file cannot be read, a formula reference cannot
/// be decoded, or the patched package cannot be written.
pub fn annotate_xlsx(data: &[u8], config: &AnnotateConfig) -> Result<AnnotatedWorkbook> {
    annotate(data, config, None)
}

/// Annotate an XLSX file, measuring boxes with a caller-supplied oracle.
///
/// # Errors
/// Same as [`annotate_xlsx`].
pub fn annotate_xlsx_with(
    data: &[u8],
    config: &AnnotateConfig,
    oracle: &dyn TextHeight,
) -> Result<AnnotatedWorkbook> {
    annotate(data, config, Some(oracle))
}

fn annotate(
    data: &[u8],
    config: &AnnotateConfig,
    custom_oracle: Option<&dyn TextHeight>,
) -> Result<AnnotatedWorkbook> {
    let sheets = read_workbook(data)?;
    let scans = scan_workbook(&sheets, &config.scan)?;
    let mut writer = XlsxCalloutWriter::new(data)?;
    let mut summary = Vec::with_capacity(scans.len());

    for scan in scans {
        let Some(sheet) = sheets.iter().find(|s| s.name == scan.sheet) else {
            continue;
        };

        let mut columns = collect_sheet_comments(&scan.report.blocks, &sheet.grid, |_, block| {
            config.remark_for(&sheet.name, block)
        });

        let estimated;
        let oracle: &dyn TextHeight = match custom_oracle {
            Some(oracle) => oracle,
            None => {
                estimated = config
                    .text_height
                    .clone()
                    .with_column_widths(sheet.col_widths.iter().map(|cw| (cw.col, cw.width)));
                &estimated
            }
        };
        let placed = layout_callouts(&mut columns, oracle, &config.layout);

        writer.clear_callouts(&sheet.name)?;
        for callout in &placed {
            writer.write_callout(&sheet.name, callout)?;
        }
        debug!(sheet = %sheet.name, blocks = scan.report.blocks.len(), callouts = placed.len(), "annotated sheet");

        summary.push(SheetAnnotation {
            sheet: scan.sheet,
            blocks: scan.report.blocks.len(),
            callouts: placed,
        });
    }

    let bytes = writer.finish()?;
    info!(
        sheets = summary.len(),
        callouts = summary.iter().map(|s| s.callouts.len()).sum::<usize>(),
        "annotation finished"
    );
    Ok(AnnotatedWorkbook {
        bytes,
        sheets: summary,
    })
}
