//! Worksheet parsing: cells (value, formula, fill) and column widths.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::parse_cell_ref_bytes;
use crate::color::FillColor;
use crate::error::Result;
use crate::formula::shift_formula;
use crate::types::{Cell, CellAddr, ColWidth, Grid, Worksheet};
use crate::xml_helpers::{attr_f64, attr_string, attr_u32};

use super::relationships::SheetInfo;

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Default,
}

pub(super) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Default,
    }
}

pub(super) fn parse_u32_bytes(value: &[u8]) -> Option<u32> {
    let mut num: u32 = 0;
    let mut seen = false;
    for &b in value {
        if !b.is_ascii_digit() {
            return None;
        }
        seen = true;
        num = num.saturating_mul(10).saturating_add(u32::from(b - b'0'));
    }
    seen.then_some(num)
}

/// Master cell and text of a shared formula group.
struct SharedFormula {
    anchor: CellAddr,
    text: String,
}

/// Everything a worksheet part needs from the workbook-level parts.
pub(super) struct SheetContext<'a> {
    pub shared_strings: &'a [String],
    /// Fill colour per cellXfs index
    pub fills: &'a [FillColor],
}

impl SheetContext<'_> {
    fn fill_for(&self, style_idx: Option<u32>) -> FillColor {
        self.fills
            .get(style_idx.unwrap_or(0) as usize)
            .cloned()
            .unwrap_or_default()
    }

    fn value_for(&self, tag: CellTypeTag, raw: Option<String>, inline: Option<String>) -> String {
        match tag {
            CellTypeTag::Shared => raw
                .and_then(|v| v.trim().parse::<usize>().ok())
                .and_then(|idx| self.shared_strings.get(idx).cloned())
                .unwrap_or_default(),
            CellTypeTag::Bool => match raw.as_deref().map(str::trim) {
                Some("1" | "true") => "TRUE".to_string(),
                Some(_) => "FALSE".to_string(),
                None => String::new(),
            },
            CellTypeTag::Inline => inline.or(raw).unwrap_or_default(),
            CellTypeTag::Str | CellTypeTag::Error | CellTypeTag::Default => {
                raw.unwrap_or_default()
            }
        }
    }
}

/// Collect text content until the end tag `end`. With `only_t`, only text
/// inside `<t>` elements (outside phonetic runs) counts.
fn read_text<B: BufRead>(
    xml: &mut Reader<B>,
    buf: &mut Vec<u8>,
    end: &[u8],
    only_t: bool,
) -> Result<String> {
    let mut text = String::new();
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        buf.clear();
        match xml.read_event_into(buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"t" if !in_phonetic => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Text(ref t)) => {
                if !only_t || in_t {
                    text.push_str(&t.unescape()?);
                }
            }
            Ok(Event::CData(ref t)) => {
                if !only_t || in_t {
                    text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.local_name();
                if name.as_ref() == end {
                    break;
                }
                match name.as_ref() {
                    b"t" => in_t = false,
                    b"rPh" => in_phonetic = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }
    Ok(text)
}

/// Parse one worksheet part into a [`Worksheet`].
pub(super) fn parse_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    info: &SheetInfo,
    context: &SheetContext<'_>,
) -> Result<Worksheet> {
    let file = archive.by_name(&info.path)?;
    let (grid, col_widths) = parse_sheet_xml(BufReader::new(file), context)?;
    Ok(Worksheet {
        name: info.name.clone(),
        hidden: info.hidden,
        grid,
        col_widths,
    })
}

pub(super) fn parse_sheet_xml<B: BufRead>(
    reader: B,
    context: &SheetContext<'_>,
) -> Result<(Grid, Vec<ColWidth>)> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut grid = Grid::new();
    let mut col_widths = Vec::new();
    let mut shared: HashMap<u32, SharedFormula> = HashMap::new();

    let mut buf = Vec::new();
    let mut cell_buf = Vec::new();
    let mut text_buf = Vec::new();
    // 1-based, as in the file; 0 means "before the first row"
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start_event = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"row" => {
                        current_row = attr_u32(e, b"r").unwrap_or(current_row.saturating_add(1));
                        next_col = 0;
                    }

                    b"c" => {
                        let mut addr = CellAddr::new(current_row.saturating_sub(1), next_col);
                        let mut tag = CellTypeTag::Default;
                        let mut style_idx: Option<u32> = None;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => {
                                    if let Some((col, row)) = parse_cell_ref_bytes(&attr.value) {
                                        addr = CellAddr::new(row, col);
                                    }
                                }
                                b"t" => tag = parse_cell_type_tag(&attr.value),
                                b"s" => style_idx = parse_u32_bytes(&attr.value),
                                _ => {}
                            }
                        }
                        next_col = addr.col.saturating_add(1);

                        let mut raw: Option<String> = None;
                        let mut inline: Option<String> = None;
                        let mut formula = String::new();

                        // Self-closing cells have no children
                        if is_start_event {
                            loop {
                                cell_buf.clear();
                                match xml.read_event_into(&mut cell_buf) {
                                    Ok(Event::Start(ref inner)) => match inner.local_name().as_ref() {
                                        b"v" => {
                                            let text = read_text(&mut xml, &mut text_buf, b"v", false)?;
                                            raw = Some(text);
                                        }
                                        b"is" => {
                                            let text = read_text(&mut xml, &mut text_buf, b"is", true)?;
                                            inline = Some(text);
                                        }
                                        b"f" => {
                                            let kind = attr_string(inner, b"t");
                                            let si = attr_u32(inner, b"si");
                                            let text =
                                                read_text(&mut xml, &mut text_buf, b"f", false)?;
                                            formula = resolve_formula(
                                                &mut shared,
                                                addr,
                                                kind.as_deref(),
                                                si,
                                                text,
                                            )?;
                                        }
                                        _ => {}
                                    },
                                    Ok(Event::Empty(ref inner)) => {
                                        if inner.local_name().as_ref() == b"f" {
                                            let kind = attr_string(inner, b"t");
                                            let si = attr_u32(inner, b"si");
                                            formula = resolve_formula(
                                                &mut shared,
                                                addr,
                                                kind.as_deref(),
                                                si,
                                                String::new(),
                                            )?;
                                        }
                                    }
                                    Ok(Event::End(ref inner)) => {
                                        if inner.local_name().as_ref() == b"c" {
                                            break;
                                        }
                                    }
                                    Ok(Event::Eof) => break,
                                    Err(e) => return Err(e.into()),
                                    _ => {}
                                }
                            }
                        }

                        let mut cell = Cell::new(addr.row, addr.col)
                            .with_value(context.value_for(tag, raw, inline))
                            .with_fill(context.fill_for(style_idx));
                        if !formula.is_empty() {
                            cell.formula = format!("={formula}");
                        }
                        grid.insert(cell);
                    }

                    b"col" => {
                        let min = attr_u32(e, b"min").unwrap_or(0);
                        let max = attr_u32(e, b"max").unwrap_or(min);
                        let width = attr_f64(e, b"width").unwrap_or(8.43);
                        // Whole-sheet spans (1..=16384) add nothing per column
                        if max.saturating_sub(min) < 1024 {
                            for col in min..=max {
                                col_widths.push(ColWidth {
                                    col: col.saturating_sub(1),
                                    width,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok((grid, col_widths))
}

/// Formula text for one cell. A shared-formula master registers its text;
/// a dependent gets the master's text moved by its offset from the master.
fn resolve_formula(
    shared: &mut HashMap<u32, SharedFormula>,
    addr: CellAddr,
    kind: Option<&str>,
    si: Option<u32>,
    text: String,
) -> Result<String> {
    match (kind, si) {
        (Some("shared"), Some(si)) => {
            if !text.is_empty() {
                shared.insert(
                    si,
                    SharedFormula {
                        anchor: addr,
                        text: text.clone(),
                    },
                );
                return Ok(text);
            }
            match shared.get(&si) {
                Some(master) => shift_formula(
                    &master.text,
                    i64::from(addr.row) - i64::from(master.anchor.row),
                    i64::from(addr.col) - i64::from(master.anchor.col),
                ),
                None => Ok(String::new()),
            }
        }
        // Data tables carry no formula text of their own
        (Some("dataTable"), _) => Ok(String::new()),
        _ => Ok(text),
    }
}
