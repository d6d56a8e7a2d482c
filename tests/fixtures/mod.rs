//! Test fixtures for generating valid XLSX files in memory.
//!
//! This module provides builders for creating XLSX files programmatically,
//! useful for testing the xlblocks reader, scanner and call-out writer with
//! known inputs.
//!
//! # Example
//!
//! ```rust,ignore
//! use fixtures::{XlsxBuilder, SheetBuilder, StyleBuilder};
//!
//! let yellow = StyleBuilder::new().bg_color("#FFFF00");
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Marks")
//!             .cell("A1", 10, None)
//!             .formula("B1", "A1*2", Some(yellow.clone()))
//!             .comment("A1", "Reviewer", "typo"),
//!     )
//!     .build();
//!
//! let sheets = xlblocks::parser::read_workbook(&xlsx).unwrap();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_lossless
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

// ============================================================================
// Style Builder
// ============================================================================

/// Colour reference as written into `<fgColor>` / `<bgColor>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorRef {
    Rgb(String),
    Theme(u32, Option<f64>),
    Indexed(u32),
}

impl ColorRef {
    fn attrs(&self) -> String {
        match self {
            ColorRef::Rgb(rgb) => format!(r#"rgb="{rgb}""#),
            ColorRef::Theme(theme, Some(tint)) => format!(r#"theme="{theme}" tint="{tint}""#),
            ColorRef::Theme(theme, None) => format!(r#"theme="{theme}""#),
            ColorRef::Indexed(idx) => format!(r#"indexed="{idx}""#),
        }
    }
}

/// Builder for cell fill styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuilder {
    pub pattern_type: Option<String>,
    pub fg_color: Option<ColorRef>,
    pub bg_color: Option<ColorRef>,
}

impl StyleBuilder {
    /// Create a new empty style builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a solid fill colour as #RRGGBB or AARRGGBB.
    #[must_use]
    pub fn bg_color(mut self, color: &str) -> Self {
        self.fg_color = Some(ColorRef::Rgb(normalize_color(color)));
        if self.pattern_type.is_none() {
            self.pattern_type = Some("solid".to_string());
        }
        self
    }

    /// Set a solid fill from a theme colour slot.
    #[must_use]
    pub fn theme_fill(mut self, theme: u32, tint: Option<f64>) -> Self {
        self.fg_color = Some(ColorRef::Theme(theme, tint));
        if self.pattern_type.is_none() {
            self.pattern_type = Some("solid".to_string());
        }
        self
    }

    /// Set a solid fill from the indexed palette.
    #[must_use]
    pub fn indexed_fill(mut self, idx: u32) -> Self {
        self.fg_color = Some(ColorRef::Indexed(idx));
        if self.pattern_type.is_none() {
            self.pattern_type = Some("solid".to_string());
        }
        self
    }

    /// Set the pattern background colour.
    #[must_use]
    pub fn pattern_bg(mut self, color: &str) -> Self {
        self.bg_color = Some(ColorRef::Rgb(normalize_color(color)));
        self
    }

    /// Set the pattern type (solid, gray125, darkGrid, ...).
    #[must_use]
    pub fn pattern(mut self, pattern_type: &str) -> Self {
        self.pattern_type = Some(pattern_type.to_string());
        self
    }
}

// ============================================================================
// Cell Value
// ============================================================================

/// Represents a cell value that can be added to a sheet.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// A string value (stored in the shared string table).
    String(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// An inline string (not shared).
    InlineString(String),
    /// An empty cell (style only).
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

/// `<f>` element of a cell.
#[derive(Debug, Clone)]
pub enum FormulaDef {
    /// Ordinary formula, text without the leading `=`.
    Normal(String),
    /// Master cell of a shared formula group.
    SharedMaster { text: String, si: u32, range: String },
    /// Dependent cell of a shared formula group.
    SharedChild { si: u32 },
}

/// A cell in the sheet.
#[derive(Debug, Clone)]
pub struct CellEntry {
    pub cell_ref: String,
    pub value: CellValue,
    pub formula: Option<FormulaDef>,
    pub style: Option<StyleBuilder>,
}

/// A column width definition (1-based, inclusive).
#[derive(Debug, Clone)]
pub struct ColumnWidth {
    pub min: u32,
    pub max: u32,
    pub width: f64,
}

/// A cell comment.
#[derive(Debug, Clone)]
pub struct Comment {
    pub cell_ref: String,
    pub author: String,
    pub text: String,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub cells: Vec<CellEntry>,
    pub col_widths: Vec<ColumnWidth>,
    pub comments: Vec<Comment>,
    /// `state` attribute in workbook.xml (`hidden`, `veryHidden`)
    pub state: Option<String>,
}

impl SheetBuilder {
    /// Create a new sheet builder with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Add a cell with a value and optional style.
    #[must_use]
    pub fn cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
            formula: None,
            style,
        });
        self
    }

    /// Add an empty cell with only a style.
    #[must_use]
    pub fn styled_cell(mut self, cell_ref: &str, style: StyleBuilder) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Empty,
            formula: None,
            style: Some(style),
        });
        self
    }

    /// Add a formula cell (`text` without the leading `=`) with a cached 0.
    #[must_use]
    pub fn formula(mut self, cell_ref: &str, text: &str, style: Option<StyleBuilder>) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Number(0.0),
            formula: Some(FormulaDef::Normal(text.to_string())),
            style,
        });
        self
    }

    /// Add the master cell of a shared formula covering `range`.
    #[must_use]
    pub fn shared_formula(
        mut self,
        cell_ref: &str,
        text: &str,
        si: u32,
        range: &str,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Number(0.0),
            formula: Some(FormulaDef::SharedMaster {
                text: text.to_string(),
                si,
                range: range.to_string(),
            }),
            style,
        });
        self
    }

    /// Add a dependent cell of shared formula group `si`.
    #[must_use]
    pub fn shared_child(mut self, cell_ref: &str, si: u32, style: Option<StyleBuilder>) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Number(0.0),
            formula: Some(FormulaDef::SharedChild { si }),
            style,
        });
        self
    }

    /// Set column width for a range of columns (1-based).
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push(ColumnWidth { min, max, width });
        self
    }

    /// Attach a note to a cell.
    #[must_use]
    pub fn comment(mut self, cell_ref: &str, author: &str, text: &str) -> Self {
        self.comments.push(Comment {
            cell_ref: cell_ref.to_string(),
            author: author.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Mark the sheet as hidden in the workbook.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.state = Some("hidden".to_string());
        self
    }
}

// ============================================================================
// XLSX Builder
// ============================================================================

/// Builder for creating complete XLSX files.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    theme_colors: Option<Vec<String>>,
}

impl XlsxBuilder {
    /// Create a new XLSX builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet.
    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Set custom theme colors.
    #[must_use]
    pub fn theme_colors(mut self, colors: Vec<String>) -> Self {
        self.theme_colors = Some(colors);
        self
    }

    /// Build the XLSX file as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut styles = StylesCollector::new();
        let mut shared_strings: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let Some(ref style) = cell.style {
                    styles.add_style(style);
                }
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut write = |name: &str, body: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };

        write("[Content_Types].xml", &generate_content_types(&self.sheets));
        write("_rels/.rels", RELS_XML);
        write(
            "xl/_rels/workbook.xml.rels",
            &generate_workbook_rels(self.sheets.len()),
        );
        write("xl/workbook.xml", &generate_workbook(&self.sheets));
        write("xl/styles.xml", &styles.generate_styles_xml());
        write(
            "xl/sharedStrings.xml",
            &generate_shared_strings(&shared_strings),
        );
        write(
            "xl/theme/theme1.xml",
            &generate_theme(self.theme_colors.as_deref()),
        );

        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            write(
                &format!("xl/worksheets/sheet{n}.xml"),
                &generate_sheet_xml(sheet, &shared_strings, &styles),
            );
            if !sheet.comments.is_empty() {
                write(
                    &format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                    &generate_sheet_rels(n),
                );
                write(
                    &format!("xl/comments{n}.xml"),
                    &generate_comments(&sheet.comments),
                );
                write(
                    &format!("xl/drawings/vmlDrawing{n}.vml"),
                    &generate_vml(&sheet.comments),
                );
            }
        }

        zip.finish().expect("Failed to finish ZIP").into_inner()
    }
}

// ============================================================================
// Styles Collector
// ============================================================================

/// Collects and deduplicates fills; every distinct style becomes one cellXfs entry.
#[derive(Debug)]
struct StylesCollector {
    fills: Vec<StyleBuilder>,
    style_map: Vec<(StyleBuilder, u32)>,
}

impl StylesCollector {
    fn new() -> Self {
        // fills 0 and 1 are the required none and gray125 entries
        Self {
            fills: vec![
                StyleBuilder::new().pattern("none"),
                StyleBuilder::new().pattern("gray125"),
            ],
            style_map: Vec::new(),
        }
    }

    fn add_style(&mut self, style: &StyleBuilder) -> u32 {
        if let Some(idx) = self.get_style_index(style) {
            return idx;
        }
        self.fills.push(style.clone());
        let idx = self.style_map.len() as u32 + 1;
        self.style_map.push((style.clone(), idx));
        idx
    }

    fn get_style_index(&self, style: &StyleBuilder) -> Option<u32> {
        self.style_map
            .iter()
            .find(|(existing, _)| existing == style)
            .map(|(_, idx)| *idx)
    }

    fn generate_styles_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );
        xml.push_str(r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#);

        xml.push_str(&format!(r#"<fills count="{}">"#, self.fills.len()));
        for fill in &self.fills {
            let pattern = fill.pattern_type.as_deref().unwrap_or("none");
            let fg = fill
                .fg_color
                .as_ref()
                .map(|c| format!("<fgColor {}/>", c.attrs()))
                .unwrap_or_default();
            let bg = fill
                .bg_color
                .as_ref()
                .map(|c| format!("<bgColor {}/>", c.attrs()))
                .unwrap_or_default();
            if fg.is_empty() && bg.is_empty() {
                xml.push_str(&format!(r#"<fill><patternFill patternType="{pattern}"/></fill>"#));
            } else {
                xml.push_str(&format!(
                    r#"<fill><patternFill patternType="{pattern}">{fg}{bg}</patternFill></fill>"#
                ));
            }
        }
        xml.push_str("</fills>");

        xml.push_str(r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#);
        xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

        xml.push_str(&format!(
            r#"<cellXfs count="{}"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
            self.style_map.len() + 1
        ));
        // style i (1-based) uses fill i + 1
        for (_, idx) in &self.style_map {
            xml.push_str(&format!(
                r#"<xf numFmtId="0" fontId="0" fillId="{}" borderId="0" xfId="0" applyFill="1"/>"#,
                idx + 1
            ));
        }
        xml.push_str("</cellXfs>");
        xml.push_str("</styleSheet>");
        xml
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

/// Normalize color to ARGB format (without #).
fn normalize_color(color: &str) -> String {
    let color = color.trim_start_matches('#');
    if color.len() == 8 {
        color.to_uppercase()
    } else {
        format!("FF{}", color.to_uppercase())
    }
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Generate [Content_Types].xml
fn generate_content_types(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    if sheets.iter().any(|s| !s.comments.is_empty()) {
        xml.push_str(r#"<Default Extension="vml" ContentType="application/vnd.openxmlformats-officedocument.vmlDrawing"/>"#);
    }
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#);

    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        if !sheet.comments.is_empty() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/comments{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/>"#
            ));
        }
    }

    xml.push_str("</Types>");
    xml
}

/// Generate xl/_rels/workbook.xml.rels
fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    let rid = sheet_count + 1;
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        rid
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        rid + 1
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>"#,
        rid + 2
    ));
    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/workbook.xml
fn generate_workbook(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    xml.push_str("<sheets>");
    for (i, sheet) in sheets.iter().enumerate() {
        let state = sheet
            .state
            .as_deref()
            .map(|s| format!(r#" state="{s}""#))
            .unwrap_or_default();
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            i + 1,
            state,
            i + 1
        ));
    }
    xml.push_str("</sheets>");
    xml.push_str("</workbook>");
    xml
}

/// Generate xl/sharedStrings.xml
fn generate_shared_strings(strings: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    ));
    for s in strings {
        xml.push_str(&format!(
            r#"<si><t xml:space="preserve">{}</t></si>"#,
            escape_xml(s)
        ));
    }
    xml.push_str("</sst>");
    xml
}

/// Generate xl/theme/theme1.xml
fn generate_theme(colors: Option<&[String]>) -> String {
    let default_colors = [
        "000000", "FFFFFF", "44546A", "E7E6E6", "4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5",
        "70AD47", "0563C1", "954F72",
    ];
    let color_names = [
        "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5",
        "accent6", "hlink", "folHlink",
    ];
    let colors = colors.unwrap_or(&[]);

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">"#);
    xml.push_str(r#"<a:themeElements><a:clrScheme name="Office">"#);
    for (i, name) in color_names.iter().enumerate() {
        let color = colors
            .get(i)
            .map(|c| c.trim_start_matches('#'))
            .unwrap_or(default_colors[i]);
        xml.push_str(&format!(r#"<a:{name}><a:srgbClr val="{color}"/></a:{name}>"#));
    }
    xml.push_str("</a:clrScheme></a:themeElements></a:theme>");
    xml
}

/// Generate a sheet XML file
fn generate_sheet_xml(
    sheet: &SheetBuilder,
    shared_strings: &[String],
    styles: &StylesCollector,
) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);

    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for col in &sheet.col_widths {
            xml.push_str(&format!(
                r#"<col min="{}" max="{}" width="{}" customWidth="1"/>"#,
                col.min, col.max, col.width
            ));
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    let mut rows: BTreeMap<u32, Vec<&CellEntry>> = BTreeMap::new();
    for cell in &sheet.cells {
        let (_, row) = parse_cell_ref(&cell.cell_ref);
        rows.entry(row).or_default().push(cell);
    }

    for (row_num, cells) in rows {
        xml.push_str(&format!(r#"<row r="{row_num}">"#));
        for cell in cells {
            let mut cell_attrs = format!(r#"r="{}""#, cell.cell_ref);
            if let Some(idx) = cell.style.as_ref().and_then(|s| styles.get_style_index(s)) {
                cell_attrs.push_str(&format!(r#" s="{idx}""#));
            }

            let formula = match &cell.formula {
                Some(FormulaDef::Normal(text)) => format!("<f>{}</f>", escape_xml(text)),
                Some(FormulaDef::SharedMaster { text, si, range }) => format!(
                    r#"<f t="shared" ref="{range}" si="{si}">{}</f>"#,
                    escape_xml(text)
                ),
                Some(FormulaDef::SharedChild { si }) => format!(r#"<f t="shared" si="{si}"/>"#),
                None => String::new(),
            };

            match &cell.value {
                CellValue::String(s) => {
                    let idx = shared_strings.iter().position(|x| x == s).unwrap_or(0);
                    cell_attrs.push_str(r#" t="s""#);
                    xml.push_str(&format!(r#"<c {cell_attrs}>{formula}<v>{idx}</v></c>"#));
                }
                CellValue::Number(n) => {
                    xml.push_str(&format!(r#"<c {cell_attrs}>{formula}<v>{n}</v></c>"#));
                }
                CellValue::Boolean(b) => {
                    cell_attrs.push_str(r#" t="b""#);
                    let v = if *b { "1" } else { "0" };
                    xml.push_str(&format!(r#"<c {cell_attrs}>{formula}<v>{v}</v></c>"#));
                }
                CellValue::InlineString(s) => {
                    cell_attrs.push_str(r#" t="inlineStr""#);
                    xml.push_str(&format!(
                        r#"<c {cell_attrs}><is><t>{}</t></is></c>"#,
                        escape_xml(s)
                    ));
                }
                CellValue::Empty => {
                    xml.push_str(&format!(r#"<c {cell_attrs}/>"#));
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !sheet.comments.is_empty() {
        xml.push_str(r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#);
        xml.push_str(r#"<legacyDrawing r:id="rId2"/>"#);
    }

    xml.push_str("</worksheet>");
    xml
}

/// Generate xl/worksheets/_rels/sheetN.xml.rels for a sheet with comments
fn generate_sheet_rels(n: usize) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments{n}.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing" Target="../drawings/vmlDrawing{n}.vml"/>"#,
            "</Relationships>"
        ),
        n = n
    )
}

/// Generate xl/commentsN.xml
fn generate_comments(comments: &[Comment]) -> String {
    let mut authors: Vec<&str> = Vec::new();
    for c in comments {
        if !authors.contains(&c.author.as_str()) {
            authors.push(&c.author);
        }
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors>"#);
    for author in &authors {
        xml.push_str(&format!("<author>{}</author>", escape_xml(author)));
    }
    xml.push_str("</authors><commentList>");
    for c in comments {
        let author_id = authors.iter().position(|a| *a == c.author).unwrap_or(0);
        xml.push_str(&format!(
            r#"<comment ref="{}" authorId="{}"><text><r><t xml:space="preserve">{}</t></r></text></comment>"#,
            c.cell_ref,
            author_id,
            escape_xml(&c.text)
        ));
    }
    xml.push_str("</commentList></comments>");
    xml
}

/// Generate xl/drawings/vmlDrawingN.vml with one hidden note per comment
fn generate_vml(comments: &[Comment]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<xml xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:x="urn:schemas-microsoft-com:office:excel">"#);
    for (i, c) in comments.iter().enumerate() {
        let (col, row) = parse_cell_ref(&c.cell_ref);
        xml.push_str(&format!(
            r##"<v:shape id="_x0000_s{}" type="#_x0000_t202" style="visibility:hidden"><x:ClientData ObjectType="Note"><x:Row>{}</x:Row><x:Column>{}</x:Column></x:ClientData></v:shape>"##,
            1025 + i,
            row - 1,
            col - 1
        ));
    }
    xml.push_str("</xml>");
    xml
}

/// Parse a cell reference like "A1" into (col, row) as 1-indexed.
fn parse_cell_ref(cell_ref: &str) -> (u32, u32) {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut in_letters = true;

    for c in cell_ref.chars() {
        if in_letters && c.is_ascii_alphabetic() {
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else {
            in_letters = false;
            if let Some(d) = c.to_digit(10) {
                row = row * 10 + d;
            }
        }
    }

    (col, row)
}

// ============================================================================
// Package Inspection
// ============================================================================

/// Names of all entries in an XLSX package, in archive order.
pub fn entry_names(xlsx: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(xlsx)).expect("valid zip");
    archive.file_names().map(str::to_string).collect()
}

/// Read one entry of an XLSX package as text.
pub fn read_entry(xlsx: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(xlsx)).expect("valid zip");
    let mut file = archive.by_name(name).ok()?;
    let mut out = String::new();
    file.read_to_string(&mut out).ok()?;
    Some(out)
}

// ============================================================================
// Convenience Functions
// ============================================================================

/// Solid yellow fill, the default target colour.
#[must_use]
pub fn yellow() -> Option<StyleBuilder> {
    Some(StyleBuilder::new().bg_color("#FFFF00"))
}

/// Solid green fill.
#[must_use]
pub fn green() -> Option<StyleBuilder> {
    Some(StyleBuilder::new().bg_color("#92D050"))
}

/// A marking sheet: inputs in column A, a yellow two-column block in B:C
/// where every cell doubles its left neighbour, and a yellow total in E1.
#[must_use]
pub fn marking_sheet(name: &str, rows: u32) -> SheetBuilder {
    let mut sheet = SheetBuilder::new(name);
    for r in 1..=rows {
        sheet = sheet
            .cell(&format!("A{r}"), r as i32, None)
            .formula(&format!("B{r}"), &format!("A{r}*2"), yellow())
            .formula(&format!("C{r}"), &format!("B{r}*2"), yellow());
    }
    sheet.formula("E1", &format!("SUM(C1:C{rows})"), yellow())
}
