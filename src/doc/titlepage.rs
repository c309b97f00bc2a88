//! Title-page document (`titlepage.xhtml`) operations.
//!
//! The title page embeds the cover through an SVG wrapper: the `svg` root
//! carries the viewport in `viewBox` and an `image` element links the raster
//! file. Both must agree with the generated cover's name and dimensions.

use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::Cursor;

pub struct TitlePageDoc {
    bytes: Vec<u8>,
}

impl TitlePageDoc {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Point the SVG wrapper at a cover image: `viewBox` on every `svg`
    /// element, and width/height/link target on every `image` element. The
    /// link attribute keeps whatever prefix the document already uses.
    pub fn point_at_cover(&mut self, href: &str, width: u32, height: u32) -> Result<()> {
        let view_box = format!("0 0 {width} {height}");
        let mut reader = Reader::from_reader(self.bytes.as_slice());
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let rebuilt = retarget(&e, href, width, height, &view_box)?;
                    writer.write_event(Event::Start(rebuilt))?;
                }
                Event::Empty(e) => {
                    let rebuilt = retarget(&e, href, width, height, &view_box)?;
                    writer.write_event(Event::Empty(rebuilt))?;
                }
                Event::Eof => break,
                event => writer.write_event(event)?,
            }
            buf.clear();
        }

        self.bytes = writer.into_inner().into_inner();
        Ok(())
    }
}

fn retarget(
    element: &BytesStart<'_>,
    href: &str,
    width: u32,
    height: u32,
    view_box: &str,
) -> Result<BytesStart<'static>> {
    match element.local_name().as_ref() {
        b"svg" => set_attribute(element, |key| key == b"viewBox", "viewBox", view_box),
        b"image" => {
            let with_width = set_attribute(element, |key| key == b"width", "width", &width.to_string())?;
            let with_height = set_attribute(
                &with_width,
                |key| key == b"height",
                "height",
                &height.to_string(),
            )?;
            // Any-prefix match so the document's own xlink binding survives.
            set_attribute(
                &with_height,
                |key| key == b"href" || key.ends_with(b":href"),
                "xlink:href",
                href,
            )
        }
        _ => super::rewrite_element(element, &mut |_, _| None),
    }
}

/// Rebuild an element with the matching attribute replaced, appending it
/// under `fallback_key` when absent.
fn set_attribute(
    element: &BytesStart<'_>,
    matches: impl Fn(&[u8]) -> bool,
    fallback_key: &str,
    value: &str,
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    let mut replaced = false;
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if matches(attr.key.as_ref()) {
            replaced = true;
            rebuilt.push_attribute((key.as_str(), value));
        } else {
            let current = attr.unescape_value()?;
            rebuilt.push_attribute((key.as_str(), current.as_ref()));
        }
    }
    if !replaced {
        rebuilt.push_attribute((fallback_key, value));
    }
    Ok(rebuilt)
}
