//! Typed views over the XML vocabularies the fixup touches.
//!
//! Each document type wraps the entry's current bytes and exposes named
//! operations for the edits its vocabulary needs. Rewrites stream quick-xml
//! events straight back out, so untouched markup (declaration, comments,
//! whitespace) round-trips byte-for-byte and only edited attributes or text
//! nodes are re-encoded.

pub mod content;
pub mod navigation;
pub mod package;
pub mod titlepage;

use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::Cursor;

/// Rewrite attribute values across a whole document. `edit` sees each
/// attribute as (key, value) and may return a replacement value; everything
/// else passes through untouched.
pub(crate) fn map_attributes(
    bytes: &[u8],
    mut edit: impl FnMut(&[u8], &str) -> Option<String>,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(bytes);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let rewritten = rewrite_element(&e, &mut edit)?;
                writer.write_event(Event::Start(rewritten))?;
            }
            Event::Empty(e) => {
                let rewritten = rewrite_element(&e, &mut edit)?;
                writer.write_event(Event::Empty(rewritten))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner().into_inner())
}

/// Rebuild one start tag, passing every attribute through `edit`.
pub(crate) fn rewrite_element(
    element: &BytesStart<'_>,
    edit: &mut impl FnMut(&[u8], &str) -> Option<String>,
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        match edit(attr.key.as_ref(), value.as_ref()) {
            Some(replacement) => rebuilt.push_attribute((key.as_str(), replacement.as_str())),
            None => rebuilt.push_attribute((key.as_str(), value.as_ref())),
        }
    }
    Ok(rebuilt)
}

/// Resolve a general entity reference (`&name;`, `&#..;`) back to text.
pub(crate) fn resolve_entity(name: &str) -> Option<String> {
    let raw = format!("&{name};");
    quick_xml::escape::unescape(&raw)
        .ok()
        .map(|resolved| resolved.into_owned())
}
