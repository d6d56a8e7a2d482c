//! styles.xml: fills, cell formats and the indexed palette, resolved down to
//! one fill colour per cell format index.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::color::{resolve_fill, FillColor};
use crate::error::Result;
use crate::types::{CellXf, ColorSpec, RawFill, StyleSheet, Theme};
use crate::xml_helpers::{attr_bool, attr_string, attr_u32, parse_color_attrs};

/// Parse the stylesheet part; a workbook without one has no fills.
pub(super) fn parse_stylesheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Result<StyleSheet> {
    let styles_path = path.unwrap_or("xl/styles.xml");
    let Ok(file) = archive.by_name(styles_path) else {
        return Ok(StyleSheet::default());
    };

    parse_styles(BufReader::new(file))
}

pub(crate) fn parse_styles<R: BufRead>(reader: R) -> Result<StyleSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut stylesheet = StyleSheet::default();
    let mut indexed_colors: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut in_cell_style_xfs = false;
    let mut in_indexed_colors = false;
    let mut in_gradient = false;
    let mut current_fill: Option<RawFill> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"fills" => in_fills = true,
                    b"cellXfs" => in_cell_xfs = true,
                    b"cellStyleXfs" => in_cell_style_xfs = true,
                    b"indexedColors" => in_indexed_colors = true,

                    b"rgbColor" if in_indexed_colors => {
                        if let Some(rgb) = attr_string(e, b"rgb") {
                            // ARGB; drop the alpha byte
                            let rgb = if rgb.len() == 8 {
                                rgb.get(2..).unwrap_or(&rgb).to_string()
                            } else {
                                rgb
                            };
                            indexed_colors.push(format!("#{rgb}"));
                        }
                    }

                    b"fill" if in_fills => {
                        if is_empty {
                            stylesheet.fills.push(RawFill::default());
                        } else {
                            current_fill = Some(RawFill::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern_type = attr_string(e, b"patternType");
                        }
                    }
                    // Gradients never count as a solid fill colour
                    b"gradientFill" => in_gradient = !is_empty,
                    b"fgColor" if !in_gradient => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.fg_color = Some(parse_color_attrs(e));
                        }
                    }
                    b"bgColor" if !in_gradient => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.bg_color = Some(parse_color_attrs(e));
                        }
                    }

                    b"xf" if in_cell_xfs || in_cell_style_xfs => {
                        let defaults = CellXf::default();
                        let xf = CellXf {
                            fill_id: attr_u32(e, b"fillId"),
                            apply_fill: attr_bool(e, b"applyFill").unwrap_or(defaults.apply_fill),
                            xf_id: attr_u32(e, b"xfId"),
                        };
                        if in_cell_xfs {
                            stylesheet.cell_xfs.push(xf);
                        } else {
                            stylesheet.cell_style_xfs.push(xf);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"fills" => in_fills = false,
                b"cellXfs" => in_cell_xfs = false,
                b"cellStyleXfs" => in_cell_style_xfs = false,
                b"indexedColors" => in_indexed_colors = false,
                b"gradientFill" => in_gradient = false,
                b"fill" => {
                    if let Some(fill) = current_fill.take() {
                        stylesheet.fills.push(fill);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    if !indexed_colors.is_empty() {
        stylesheet.indexed_colors = Some(indexed_colors);
    }

    Ok(stylesheet)
}

/// Visible colour of one fill record. Solid fills show their foreground
/// colour (background when the foreground is missing); `none` and unset
/// patterns show nothing; other patterns are taken by their foreground.
fn resolve_raw_fill(fill: &RawFill, stylesheet: &StyleSheet, theme: &Theme) -> FillColor {
    let indexed = stylesheet.indexed_colors.as_ref();
    let resolve = |spec: &ColorSpec| resolve_fill(spec, &theme.colors, indexed);
    match fill.pattern_type.as_deref() {
        None | Some("none") => FillColor::none(),
        Some("solid") => fill
            .fg_color
            .as_ref()
            .map(resolve)
            .filter(|c| !c.is_none())
            .or_else(|| fill.bg_color.as_ref().map(resolve))
            .unwrap_or_default(),
        Some(_) => fill.fg_color.as_ref().map(resolve).unwrap_or_default(),
    }
}

/// Fill colour for every cellXfs index. A format that does not apply its
/// own fill inherits the fill of its cellStyleXfs parent.
pub(crate) fn fill_table(stylesheet: &StyleSheet, theme: &Theme) -> Vec<FillColor> {
    stylesheet
        .cell_xfs
        .iter()
        .map(|xf| {
            let parent = xf
                .xf_id
                .and_then(|id| stylesheet.cell_style_xfs.get(id as usize));
            let fill_id = if xf.apply_fill {
                xf.fill_id
            } else {
                parent.and_then(|p| p.fill_id).or(xf.fill_id)
            };
            fill_id
                .and_then(|id| stylesheet.fills.get(id as usize))
                .map(|fill| resolve_raw_fill(fill, stylesheet, theme))
                .unwrap_or_default()
        })
        .collect()
}
