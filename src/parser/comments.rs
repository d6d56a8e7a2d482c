//! Cell notes from a sheet's comments part.
//!
//! ```xml
//! <comments>
//!   <authors><author>Reviewer</author></authors>
//!   <commentList>
//!     <comment ref="B2" authorId="0">
//!       <text><r><t>check this</t></r></text>
//!     </comment>
//!   </commentList>
//! </comments>
//! ```
//!
//! Rich-text runs are flattened into plain text. For notes signed by the
//! call-out writer only what follows the points line is kept, so a
//! re-annotated file reads back the cell notes it started from.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use tracing::warn;
use zip::ZipArchive;

use crate::annotate::collector::POINTS_PREFIX;
use crate::cell_ref::parse_cell_ref;
use crate::error::Result;
use crate::export::callout_xml::AUTHOR;
use crate::types::CellAddr;
use crate::xml_helpers::{attr_string, attr_u32};

use super::relationships::{parse_part_relationships, REL_COMMENTS};

/// Path of the comments part linked from `sheet_path`, if any.
pub(crate) fn get_comments_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> Result<Option<String>> {
    Ok(parse_part_relationships(archive, sheet_path)?
        .into_iter()
        .find(|rel| rel.is(REL_COMMENTS) && !rel.external)
        .map(|rel| rel.path))
}

/// Read every note of the sheet at `sheet_path` as `(address, text)` pairs
/// in document order.
pub(crate) fn read_sheet_comments<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> Result<Vec<(CellAddr, String)>> {
    let Some(path) = get_comments_path(archive, sheet_path)? else {
        return Ok(Vec::new());
    };
    let Ok(file) = archive.by_name(&path) else {
        warn!(sheet = %sheet_path, part = %path, "comments part missing from package");
        return Ok(Vec::new());
    };
    parse_comments(BufReader::new(file))
}

/// Cell note part of a generated box: everything after a leading points line.
fn strip_points_line(text: &str) -> &str {
    if !text.starts_with(POINTS_PREFIX) {
        return text;
    }
    text.split_once('\n').map_or("", |(_, rest)| rest)
}

pub(crate) fn parse_comments<R: BufRead>(reader: R) -> Result<Vec<(CellAddr, String)>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut comments = Vec::new();
    let mut buf = Vec::new();

    let mut authors: Vec<String> = Vec::new();
    let mut in_author = false;
    let mut current: Option<(CellAddr, String)> = None;
    let mut generated = false;
    let mut in_text = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = true;
                    authors.push(String::new());
                }
                b"comment" => {
                    generated = attr_u32(e, b"authorId")
                        .and_then(|id| authors.get(id as usize))
                        .is_some_and(|name| name == AUTHOR);
                    current = attr_string(e, b"ref")
                        .and_then(|r| parse_cell_ref(&r))
                        .map(|(col, row)| (CellAddr::new(row, col), String::new()));
                }
                b"text" => in_text = true,
                b"rPh" => in_phonetic = true,
                b"t" if in_text && !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_author => {
                if let Some(name) = authors.last_mut() {
                    name.push_str(&e.unescape()?);
                }
            }
            Ok(Event::Text(ref e)) if in_t => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"author" => in_author = false,
                b"comment" => {
                    if let Some((addr, text)) = current.take() {
                        let text = if generated {
                            strip_points_line(&text).to_string()
                        } else {
                            text
                        };
                        if !text.is_empty() {
                            comments.push((addr, text));
                        }
                    }
                }
                b"text" => in_text = false,
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

    Ok(comments)
}
