//! Serialization of call-out boxes: the comments part that holds the text
//! and the VML drawing that places each box.

use crate::types::PlacedCallout;

pub(crate) const COMMENTS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml";
pub(crate) const VML_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.vmlDrawing";

/// Author recorded on every generated note.
pub(crate) const AUTHOR: &str = "xlblocks";

/// Horizontal inset of a box inside its first column, in pixels.
const LEFT_OFFSET: u32 = 15;
/// Vertical inset of a box inside its first row, in pixels.
const TOP_OFFSET: u32 = 2;
/// Right edge of a box inside its second column, in pixels.
const RIGHT_OFFSET: u32 = 60;

/// Minimal XML escaping for attribute/text content.
pub(crate) fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Comments part holding the text of every box.
pub(crate) fn comments_xml(callouts: &[PlacedCallout]) -> String {
    let mut out = String::with_capacity(256 + callouts.len() * 128);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    out.push_str("<authors><author>");
    out.push_str(AUTHOR);
    out.push_str("</author></authors><commentList>");
    for callout in callouts {
        out.push_str(&format!(
            r#"<comment ref="{}" authorId="0"><text><t xml:space="preserve">{}</t></text></comment>"#,
            callout.address.to_a1(),
            xml_escape(&callout.text)
        ));
    }
    out.push_str("</commentList></comments>");
    out
}

/// `LeftCol, LeftOff, TopRow, TopOff, RightCol, RightOff, BottomRow, BottomOff`
///
/// A box covers its box column and the next one, and exactly `height_rows`
/// rows starting at `box_row`.
pub(crate) fn anchor(callout: &PlacedCallout) -> String {
    let bottom = callout
        .box_row
        .saturating_add(callout.height_rows.max(1));
    format!(
        "{}, {LEFT_OFFSET}, {}, {TOP_OFFSET}, {}, {RIGHT_OFFSET}, {bottom}, 0",
        callout.box_col,
        callout.box_row,
        callout.box_col.saturating_add(1),
    )
}

/// VML drawing with one visible note shape per box. `drawing_id` keeps shape
/// ids unique across the drawings of a workbook.
pub(crate) fn vml_xml(callouts: &[PlacedCallout], drawing_id: u32) -> String {
    let mut out = String::with_capacity(1024 + callouts.len() * 640);
    out.push_str(concat!(
        r#"<xml xmlns:v="urn:schemas-microsoft-com:vml" "#,
        r#"xmlns:o="urn:schemas-microsoft-com:office:office" "#,
        r#"xmlns:x="urn:schemas-microsoft-com:office:excel">"#,
    ));
    out.push_str(&format!(
        r#"<o:shapelayout v:ext="edit"><o:idmap v:ext="edit" data="{drawing_id}"/></o:shapelayout>"#
    ));
    out.push_str(concat!(
        r#"<v:shapetype id="_x0000_t202" coordsize="21600,21600" o:spt="202" "#,
        r#"path="m,l,21600r21600,l21600,xe">"#,
        r#"<v:stroke joinstyle="miter"/><v:path gradientshapeok="t" o:connecttype="rect"/>"#,
        "</v:shapetype>",
    ));

    let base_id = drawing_id.saturating_mul(1024);
    for (i, callout) in (1u32..).zip(callouts) {
        out.push_str(&format!(
            concat!(
                r##"<v:shape id="_x0000_s{}" type="#_x0000_t202" "##,
                r#"style="position:absolute;margin-left:0;margin-top:0;width:120pt;height:{}pt;z-index:{};visibility:visible" "#,
                r##"fillcolor="#ffffe1" o:insetmode="auto">"##,
                r##"<v:fill color2="#ffffe1"/><v:shadow on="t" color="black" obscured="t"/>"##,
                r#"<v:path o:connecttype="none"/>"#,
                r#"<v:textbox style="mso-direction-alt:auto"><div style="text-align:left"></div></v:textbox>"#,
                r#"<x:ClientData ObjectType="Note"><x:MoveWithCells/><x:SizeWithCells/>"#,
                "<x:Anchor>{}</x:Anchor><x:AutoFill>False</x:AutoFill>",
                "<x:Row>{}</x:Row><x:Column>{}</x:Column><x:Visible/></x:ClientData>",
                "</v:shape>",
            ),
            base_id.saturating_add(i),
            callout.height_rows.max(1).saturating_mul(15),
            i,
            anchor(callout),
            callout.address.row,
            callout.address.col,
        ));
    }

    out.push_str("</xml>");
    out
}
