//! Package document (`content.opf`) operations.
//!
//! The package manifest lists every archive item by href and designates the
//! cover image through the item with `id="cover"`.

use super::{map_attributes, rewrite_element};
use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::Cursor;

pub struct PackageDoc {
    bytes: Vec<u8>,
}

impl PackageDoc {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Rewrite every `href` attribute in the document through `f`.
    pub fn rewrite_href(&mut self, f: impl Fn(&str) -> String) -> Result<()> {
        self.bytes = map_attributes(&self.bytes, |key, value| (key == b"href").then(|| f(value)))
            .context("Failed to rewrite package href attributes")?;
        Ok(())
    }

    /// Point the manifest item with `id="cover"` at `new_href`. Returns how
    /// many items were retargeted (one, in a well-formed package).
    pub fn retarget_cover(&mut self, new_href: &str) -> Result<usize> {
        let mut reader = Reader::from_reader(self.bytes.as_slice());
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut buf = Vec::new();
        let mut retargeted = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let rebuilt = retarget_if_cover(&e, new_href, &mut retargeted)?;
                    writer.write_event(Event::Start(rebuilt))?;
                }
                Event::Empty(e) => {
                    let rebuilt = retarget_if_cover(&e, new_href, &mut retargeted)?;
                    writer.write_event(Event::Empty(rebuilt))?;
                }
                Event::Eof => break,
                event => writer.write_event(event)?,
            }
            buf.clear();
        }

        self.bytes = writer.into_inner().into_inner();
        Ok(retargeted)
    }
}

fn retarget_if_cover(
    element: &BytesStart<'_>,
    new_href: &str,
    retargeted: &mut usize,
) -> Result<BytesStart<'static>> {
    let mut is_cover = false;
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"id" && attr.unescape_value()?.as_ref() == "cover" {
            is_cover = true;
        }
    }
    if !is_cover {
        return rewrite_element(element, &mut |_, _| None);
    }

    *retargeted += 1;
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    let mut saw_href = false;
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if attr.key.as_ref() == b"href" {
            saw_href = true;
            rebuilt.push_attribute((key.as_str(), new_href));
        } else {
            let value = attr.unescape_value()?;
            rebuilt.push_attribute((key.as_str(), value.as_ref()));
        }
    }
    if !saw_href {
        rebuilt.push_attribute(("href", new_href));
    }
    Ok(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <manifest>
    <item id="cover" href="cover.jpg" media-type="image/jpeg"/>
    <item id="chapter-1" href="Chapter%201.htm" media-type="application/xhtml+xml"/>
  </manifest>
</package>"#;

    #[test]
    fn rewrite_href_touches_every_href_attribute() {
        let mut doc = PackageDoc::new(OPF.as_bytes().to_vec());
        doc.rewrite_href(|href| href.replace("%20", ""))
            .expect("rewrite should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert!(text.contains(r#"href="Chapter1.htm""#));
        assert!(!text.contains("%20"));
    }

    #[test]
    fn retarget_cover_changes_only_the_cover_item() {
        let mut doc = PackageDoc::new(OPF.as_bytes().to_vec());
        let retargeted = doc
            .retarget_cover("cover-fixup.jpg")
            .expect("retarget should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert_eq!(retargeted, 1);
        assert!(text.contains(r#"id="cover" href="cover-fixup.jpg""#));
        assert!(text.contains(r#"href="Chapter%201.htm""#));
    }

    #[test]
    fn retarget_cover_adds_an_href_when_missing() {
        let opf = r#"<package><manifest><item id="cover" media-type="image/jpeg"/></manifest></package>"#;
        let mut doc = PackageDoc::new(opf.as_bytes().to_vec());
        doc.retarget_cover("cover-fixup.jpg")
            .expect("retarget should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert!(text.contains(r#"href="cover-fixup.jpg""#));
    }
}
