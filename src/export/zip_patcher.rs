//! Patch an XLSX ZIP archive with new note layers.
//!
//! For every touched sheet the old comments and VML parts are dropped, fresh
//! ones are added, and the sheet's relationships, its `<legacyDrawing>`
//! element and `[Content_Types].xml` are rewritten to match. Every other
//! entry is copied via `raw_copy_file` (zero recompression cost).

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Result, XlblocksError};
use crate::parser::relationships::{
    parse_part_relationships, part_dir, rels_path_for, PartRelationship, SheetInfo, REL_COMMENTS,
    REL_VML_DRAWING,
};
use crate::types::PlacedCallout;
use crate::xml_helpers::attr_string;

use super::callout_xml::{
    comments_xml, vml_xml, xml_escape, COMMENTS_CONTENT_TYPE, VML_CONTENT_TYPE,
};

const CONTENT_TYPES: &str = "[Content_Types].xml";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_TYPE_COMMENTS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
const REL_TYPE_VML: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing";

/// Worksheet children that must come after `<legacyDrawing>`.
const AFTER_LEGACY_DRAWING: [&[u8]; 7] = [
    b"legacyDrawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

fn is_note_layer(rel: &PartRelationship) -> bool {
    !rel.external && (rel.is(REL_COMMENTS) || rel.is(REL_VML_DRAWING))
}

/// Target of `to_path` written relative to the directory `from_dir`.
pub(crate) fn relative_target(from_dir: &str, to_path: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to_path.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to.len().saturating_sub(1));
    let mut parts: Vec<&str> = vec![".."; from.len().saturating_sub(common)];
    parts.extend(to.iter().skip(common));
    parts.join("/")
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

fn fresh_rel_id(used: &mut HashSet<String>) -> String {
    let mut n = used.len() + 1;
    loop {
        let id = format!("rId{n}");
        if used.insert(id.clone()) {
            return id;
        }
        n += 1;
    }
}

/// Serialize a relationships part.
pub(crate) fn rels_xml(rels: &[PartRelationship]) -> String {
    let mut out = String::with_capacity(128 + rels.len() * 160);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(&format!(r#"<Relationships xmlns="{RELATIONSHIPS_NS}">"#));
    for rel in rels {
        out.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            xml_escape(&rel.id),
            xml_escape(&rel.rel_type),
            xml_escape(&rel.target),
            if rel.external {
                r#" TargetMode="External""#
            } else {
                ""
            }
        ));
    }
    out.push_str("</Relationships>");
    out
}

/// Rewrite a worksheet part so that it carries exactly one
/// `<legacyDrawing>` pointing at `legacy_id`, or none when `None`.
pub(crate) fn patch_sheet_xml(xml: &[u8], legacy_id: Option<&str>) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));

    let mut depth = 0usize;
    let mut skip_until: Option<usize> = None;
    let mut inserted = legacy_id.is_none();
    let mut prefix = String::new();
    let mut has_r_ns = false;

    let legacy_element = |prefix: &str, has_r_ns: bool| -> Option<BytesStart<'static>> {
        let id = legacy_id?;
        let mut element = BytesStart::new(format!("{prefix}legacyDrawing"));
        if !has_r_ns {
            element.push_attribute(("xmlns:r", OFFICE_REL_NS));
        }
        element.push_attribute(("r:id", id));
        Some(element)
    };

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let is_start = matches!(event, Event::Start(_));
                if skip_until.is_some() {
                    if is_start {
                        depth += 1;
                    }
                    continue;
                }
                if depth == 0 {
                    if let Some(p) = e.name().prefix() {
                        prefix = format!("{}:", String::from_utf8_lossy(p.as_ref()));
                    }
                    has_r_ns = e
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"xmlns:r");
                } else if depth == 1 {
                    let name = e.local_name();
                    if name.as_ref() == b"legacyDrawing" {
                        if is_start {
                            depth += 1;
                            skip_until = Some(depth);
                        }
                        continue;
                    }
                    if !inserted && AFTER_LEGACY_DRAWING.contains(&name.as_ref()) {
                        if let Some(element) = legacy_element(&prefix, has_r_ns) {
                            writer.write_event(Event::Empty(element))?;
                        }
                        inserted = true;
                    }
                }
                if is_start {
                    depth += 1;
                }
            }
            Event::End(_) => {
                if let Some(level) = skip_until {
                    if depth == level {
                        skip_until = None;
                    }
                    depth = depth.saturating_sub(1);
                    continue;
                }
                if depth == 1 && !inserted {
                    if let Some(element) = legacy_element(&prefix, has_r_ns) {
                        writer.write_event(Event::Empty(element))?;
                    }
                    inserted = true;
                }
                depth = depth.saturating_sub(1);
            }
            _ if skip_until.is_some() => continue,
            _ => {}
        }
        writer.write_event(&event)?;
    }

    Ok(writer.into_inner())
}

/// Rewrite `[Content_Types].xml`: overrides for dropped parts go, an
/// override per new comments part and the `vml` default are added.
pub(crate) fn patch_content_types(
    xml: &[u8],
    dropped: &HashSet<String>,
    new_comment_parts: &[String],
    needs_vml: bool,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut depth = 0usize;
    let mut has_vml_default = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Empty(e) if depth == 1 => match e.local_name().as_ref() {
                b"Override" => {
                    let part = attr_string(e, b"PartName").unwrap_or_default();
                    let part = part.trim_start_matches('/');
                    if dropped.contains(part) || new_comment_parts.iter().any(|p| p == part) {
                        continue;
                    }
                }
                b"Default" => {
                    let ext = attr_string(e, b"Extension").unwrap_or_default();
                    has_vml_default |= ext.eq_ignore_ascii_case("vml");
                }
                _ => {}
            },
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 1 {
                    if needs_vml && !has_vml_default {
                        let mut element = BytesStart::new("Default");
                        element.push_attribute(("Extension", "vml"));
                        element.push_attribute(("ContentType", VML_CONTENT_TYPE));
                        writer.write_event(Event::Empty(element))?;
                    }
                    for part in new_comment_parts {
                        let mut element = BytesStart::new("Override");
                        element.push_attribute(("PartName", format!("/{part}").as_str()));
                        element.push_attribute(("ContentType", COMMENTS_CONTENT_TYPE));
                        writer.write_event(Event::Empty(element))?;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
        writer.write_event(&event)?;
    }

    Ok(writer.into_inner())
}

/// Rebuild the note layers of the sheets in `pending` (keyed by index into
/// `sheets`) and return the new XLSX file.
pub(crate) fn patch_callouts(
    original_data: &[u8],
    sheets: &[SheetInfo],
    pending: &BTreeMap<usize, Vec<PlacedCallout>>,
) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(original_data))?;
    let existing: HashSet<String> = archive.file_names().map(str::to_string).collect();

    // Old note layers of every touched sheet
    let mut sheet_rels = Vec::with_capacity(pending.len());
    let mut dropped: HashSet<String> = HashSet::new();
    for (&idx, callouts) in pending {
        let info = sheets
            .get(idx)
            .ok_or_else(|| XlblocksError::Parse(format!("no sheet at index {idx}")))?;
        let rels = parse_part_relationships(&mut archive, &info.path)?;
        dropped.extend(rels.iter().filter(|r| is_note_layer(r)).map(|r| r.path.clone()));
        sheet_rels.push((info, rels, callouts));
    }

    let mut taken: HashSet<String> = existing.difference(&dropped).cloned().collect();
    let mut next_number = 1u32;
    let mut replaced: HashMap<String, Vec<u8>> = HashMap::new();
    let mut added: Vec<(String, Vec<u8>)> = Vec::new();
    let mut new_comment_parts = Vec::new();

    for (info, rels, callouts) in sheet_rels {
        let mut kept: Vec<PartRelationship> =
            rels.iter().filter(|r| !is_note_layer(r)).cloned().collect();
        let mut used_ids: HashSet<String> = kept.iter().map(|r| r.id.clone()).collect();
        let mut legacy_id = None;

        if !callouts.is_empty() {
            let (comments_path, vml_path, number) = loop {
                let comments = format!("xl/comments{next_number}.xml");
                let vml = format!("xl/drawings/vmlDrawing{next_number}.vml");
                let number = next_number;
                next_number = next_number.saturating_add(1);
                if !taken.contains(&comments) && !taken.contains(&vml) {
                    break (comments, vml, number);
                }
            };
            taken.insert(comments_path.clone());
            taken.insert(vml_path.clone());

            let sheet_dir = part_dir(&info.path);
            let comments_id = fresh_rel_id(&mut used_ids);
            let vml_id = fresh_rel_id(&mut used_ids);
            kept.push(PartRelationship {
                id: comments_id,
                rel_type: REL_TYPE_COMMENTS.to_string(),
                target: relative_target(sheet_dir, &comments_path),
                path: comments_path.clone(),
                external: false,
            });
            kept.push(PartRelationship {
                id: vml_id.clone(),
                rel_type: REL_TYPE_VML.to_string(),
                target: relative_target(sheet_dir, &vml_path),
                path: vml_path.clone(),
                external: false,
            });
            legacy_id = Some(vml_id);

            added.push((comments_path.clone(), comments_xml(callouts).into_bytes()));
            added.push((vml_path, vml_xml(callouts, number).into_bytes()));
            new_comment_parts.push(comments_path);
        }

        let rels_path = rels_path_for(&info.path);
        if existing.contains(&rels_path) || !kept.is_empty() {
            replaced.insert(rels_path, rels_xml(&kept).into_bytes());
        }

        let sheet_xml = read_entry(&mut archive, &info.path)?;
        replaced.insert(
            info.path.clone(),
            patch_sheet_xml(&sheet_xml, legacy_id.as_deref())?,
        );
        debug!(sheet = %info.name, callouts = callouts.len(), "rebuilt note layer");
    }

    let content_types = read_entry(&mut archive, CONTENT_TYPES)?;
    replaced.insert(
        CONTENT_TYPES.to_string(),
        patch_content_types(
            &content_types,
            &dropped,
            &new_comment_parts,
            !new_comment_parts.is_empty(),
        )?,
    );

    let buf: Vec<u8> = Vec::with_capacity(original_data.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if dropped.contains(&name) {
            continue;
        }
        if let Some(data) = replaced.remove(&name) {
            writer.start_file(name, options)?;
            writer.write_all(&data)?;
            continue;
        }

        // Pass through unmodified entry (raw copy, no re-compression)
        writer.raw_copy_file(entry)?;
    }

    // Parts that did not exist before (new rels files, new note layers)
    let mut fresh: Vec<(String, Vec<u8>)> = replaced.into_iter().collect();
    fresh.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, data) in fresh.into_iter().chain(added) {
        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
