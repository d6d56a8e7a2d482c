//! Package plumbing: relationships, sheet list, theme and shared strings.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::color::DEFAULT_THEME_COLORS;
use crate::error::Result;
use crate::types::Theme;
use crate::xml_helpers::{attr_string, attr_string_local};

/// Relationship type suffixes used by the reader and the call-out writer.
pub(crate) const REL_WORKSHEET: &str = "/worksheet";
pub(crate) const REL_SHARED_STRINGS: &str = "/sharedStrings";
pub(crate) const REL_STYLES: &str = "/styles";
pub(crate) const REL_THEME: &str = "/theme";
pub(crate) const REL_COMMENTS: &str = "/comments";
pub(crate) const REL_VML_DRAWING: &str = "/vmlDrawing";

/// Paths of the workbook-level parts, resolved to full package paths.
#[derive(Default, Debug)]
pub(crate) struct WorkbookRelationships {
    /// rId -> worksheet path, e.g. "rId1" -> "xl/worksheets/sheet1.xml"
    pub worksheets: HashMap<String, String>,
    pub shared_strings: Option<String>,
    pub styles: Option<String>,
    pub theme: Option<String>,
}

/// One `<Relationship>` of a part's `.rels` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartRelationship {
    pub id: String,
    pub rel_type: String,
    /// Target as written in the file
    pub target: String,
    /// Target resolved against the owning part's directory
    pub path: String,
    pub external: bool,
}

impl PartRelationship {
    pub fn is(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

/// A worksheet entry of xl/workbook.xml.
#[derive(Debug, Clone)]
pub(crate) struct SheetInfo {
    pub name: String,
    pub path: String,
    /// `state="hidden"` or `state="veryHidden"`
    pub hidden: bool,
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
pub(crate) fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Directory of a part, with trailing slash (empty for root parts).
pub(crate) fn part_dir(part_path: &str) -> &str {
    part_path
        .rfind('/')
        .and_then(|pos| part_path.get(..=pos))
        .unwrap_or("")
}

/// Resolve a relationship target against a base directory.
pub(crate) fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        stripped.to_string()
    } else if let Some(stripped) = relative.strip_prefix("../") {
        let trimmed = base_dir.trim_end_matches('/');
        let parent = trimmed
            .rfind('/')
            .and_then(|pos| trimmed.get(..=pos))
            .unwrap_or("");
        resolve_relative_path(parent, stripped)
    } else if let Some(stripped) = relative.strip_prefix("./") {
        resolve_relative_path(base_dir, stripped)
    } else {
        format!("{base_dir}{relative}")
    }
}

/// Read the `.rels` file that belongs to `part_path`. A missing file means
/// the part has no relationships.
pub(crate) fn parse_part_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part_path: &str,
) -> Result<Vec<PartRelationship>> {
    let Ok(file) = archive.by_name(&rels_path_for(part_path)) else {
        return Ok(Vec::new());
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let base_dir = part_dir(part_path);
    let mut rels = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    let external = attr_string(e, b"TargetMode").as_deref() == Some("External");
                    if !id.is_empty() && !target.is_empty() {
                        let path = if external {
                            target.clone()
                        } else {
                            resolve_relative_path(base_dir, &target)
                        };
                        rels.push(PartRelationship {
                            id,
                            rel_type,
                            target,
                            path,
                            external,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Parse workbook relationships from xl/_rels/workbook.xml.rels
pub(crate) fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<WorkbookRelationships> {
    let mut rels = WorkbookRelationships::default();

    for rel in parse_part_relationships(archive, "xl/workbook.xml")? {
        if rel.is(REL_WORKSHEET) {
            rels.worksheets.insert(rel.id, rel.path);
        } else if rel.is(REL_SHARED_STRINGS) {
            rels.shared_strings = Some(rel.path);
        } else if rel.is(REL_STYLES) {
            rels.styles = Some(rel.path);
        } else if rel.is(REL_THEME) {
            rels.theme = Some(rel.path);
        }
    }

    Ok(rels)
}

/// Sheet names, paths and visibility from xl/workbook.xml, in tab order.
pub(crate) fn get_sheet_info<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<Vec<SheetInfo>> {
    let file = archive.by_name("xl/workbook.xml")?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_string(e, b"name").unwrap_or_default();
                let hidden = matches!(
                    attr_string(e, b"state").as_deref(),
                    Some("hidden" | "veryHidden")
                );
                // r:id is namespace prefixed
                let r_id = attr_string_local(e, b"id").unwrap_or_default();

                if !name.is_empty() {
                    // Fall back to the conventional part name
                    let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
                        let idx = sheets.len() + 1;
                        format!("xl/worksheets/sheet{idx}.xml")
                    });
                    sheets.push(SheetInfo { name, path, hidden });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Parse the theme palette. Missing or unreadable themes fall back to the
/// Office defaults.
pub(crate) fn parse_theme<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Theme {
    let mut theme = Theme {
        colors: DEFAULT_THEME_COLORS
            .iter()
            .map(ToString::to_string)
            .collect(),
    };

    let theme_path = path.unwrap_or("xl/theme/theme1.xml");
    let Ok(file) = archive.by_name(theme_path) else {
        return theme;
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    // Theme color indices: lt1, dk1, lt2, dk2 come first even though the
    // scheme lists dk1 before lt1.
    let color_elements = [
        "lt1", "dk1", "lt2", "dk2", "accent1", "accent2", "accent3", "accent4", "accent5",
        "accent6", "hlink", "folHlink",
    ];

    let mut buf = Vec::new();
    let mut color_index = None;
    let mut in_clr_scheme = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                let local_name = e.local_name();
                let name = std::str::from_utf8(local_name.as_ref()).unwrap_or("");

                if name == "clrScheme" {
                    in_clr_scheme = true;
                } else if in_clr_scheme {
                    if let Some(pos) = color_elements.iter().position(|&n| n == name) {
                        color_index = Some(pos);
                    } else if name == "srgbClr" || name == "sysClr" {
                        let val = attr_string(e, b"lastClr").or_else(|| attr_string(e, b"val"));
                        if let (Some(idx), Some(val)) = (color_index, val) {
                            if val.len() == 6 {
                                if let Some(color) = theme.colors.get_mut(idx) {
                                    *color = format!("#{val}");
                                }
                            }
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"clrScheme" {
                    in_clr_scheme = false;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    theme
}

/// Parse the shared string table. Rich-text runs are flattened; phonetic
/// runs are skipped.
pub(crate) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Result<Vec<String>> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Ok(Vec::new());
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(ref e)) if in_t => {
                current.push_str(&e.unescape()?);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}
