//! Content document (chapter XHTML) operations.
//!
//! Chapters carry their full title split across markup: the heading holds
//! the thread number and the first bold run holds the thread name. Prose
//! fixes only ever touch direct element text, never tails or attributes.

use super::resolve_entity;
use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;
use std::io::Cursor;

pub struct ContentDoc {
    bytes: Vec<u8>,
}

#[derive(Clone, Copy)]
enum Capture {
    Heading,
    Bold,
}

impl ContentDoc {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Full chapter title: the first heading's direct text joined with the
    /// first bold run's direct text. `None` when either is missing or empty,
    /// which callers treat as "leave the existing label alone".
    pub fn full_title(&self) -> Result<Option<String>> {
        let mut reader = Reader::from_reader(self.bytes.as_slice());
        let mut buf = Vec::new();

        let mut heading: Option<String> = None;
        let mut bold: Option<String> = None;
        let mut seen_heading = false;
        let mut seen_bold = false;
        let mut capture: Option<Capture> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    capture = None;
                    match e.local_name().as_ref() {
                        b"h1" if !seen_heading => {
                            seen_heading = true;
                            heading = Some(String::new());
                            capture = Some(Capture::Heading);
                        }
                        b"b" if !seen_bold => {
                            seen_bold = true;
                            bold = Some(String::new());
                            capture = Some(Capture::Bold);
                        }
                        _ => {}
                    }
                }
                Event::Text(t) => {
                    if let Some(slot) = capture {
                        let text = reader.decoder().decode(&t)?;
                        append(slot, &text, &mut heading, &mut bold);
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(slot) = capture {
                        let name = e.decode()?;
                        if let Some(resolved) = resolve_entity(name.as_ref()) {
                            append(slot, &resolved, &mut heading, &mut bold);
                        }
                    }
                }
                Event::Eof => break,
                _ => capture = None,
            }
            buf.clear();
        }

        match (heading, bold) {
            (Some(h), Some(b)) if !h.is_empty() && !b.is_empty() => Ok(Some(format!("{h} {b}"))),
            _ => Ok(None),
        }
    }

    /// Rewrite every non-blank direct text node through `f`. Tail text
    /// (after a child's end tag), attribute values, comments, and CDATA pass
    /// through untouched.
    pub fn rewrite_direct_text(&mut self, f: impl Fn(&str) -> String) -> Result<()> {
        let mut reader = Reader::from_reader(self.bytes.as_slice());
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut buf = Vec::new();
        // True between an element's start tag and its first child or end
        // tag; only text read in that window is the element's own.
        let mut direct = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    direct = true;
                    writer.write_event(Event::Start(e))?;
                }
                Event::Text(t) => {
                    let text = reader.decoder().decode(&t)?;
                    if direct && !text.trim().is_empty() {
                        let fixed = f(&text);
                        writer.write_event(Event::Text(BytesText::new(&fixed)))?;
                    } else {
                        writer.write_event(Event::Text(t))?;
                    }
                }
                // Entity references split a text node without ending it.
                Event::GeneralRef(e) => writer.write_event(Event::GeneralRef(e))?,
                Event::Eof => break,
                event => {
                    direct = false;
                    writer.write_event(event)?;
                }
            }
            buf.clear();
        }

        self.bytes = writer.into_inner().into_inner();
        Ok(())
    }
}

fn append(slot: Capture, text: &str, heading: &mut Option<String>, bold: &mut Option<String>) {
    let target = match slot {
        Capture::Heading => heading,
        Capture::Bold => bold,
    };
    if let Some(existing) = target {
        existing.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head><title>Thread 20:</title></head>
  <body>
    <h1>Thread 20:</h1>
    <p><b>Midori III</b></p>
    <p>Prose goes here.</p>
  </body>
</html>"#;

    #[test]
    fn full_title_joins_first_heading_and_first_bold() {
        let doc = ContentDoc::new(CHAPTER.as_bytes().to_vec());
        let title = doc.full_title().expect("parse should succeed");
        assert_eq!(title.as_deref(), Some("Thread 20: Midori III"));
    }

    #[test]
    fn full_title_is_none_without_a_bold_element() {
        let doc = ContentDoc::new(
            b"<html><body><h1>Thread 20:</h1><p>plain</p></body></html>".to_vec(),
        );
        let title = doc.full_title().expect("parse should succeed");
        assert!(title.is_none());
    }

    #[test]
    fn full_title_is_none_when_the_first_heading_is_empty() {
        let doc = ContentDoc::new(
            b"<html><body><h1></h1><h1>Later</h1><b>Name</b></body></html>".to_vec(),
        );
        let title = doc.full_title().expect("parse should succeed");
        assert!(title.is_none());
    }

    #[test]
    fn full_title_resolves_entities_in_captured_text() {
        let doc = ContentDoc::new(
            b"<html><body><h1>Q&amp;A:</h1><b>Special</b></body></html>".to_vec(),
        );
        let title = doc.full_title().expect("parse should succeed");
        assert_eq!(title.as_deref(), Some("Q&A: Special"));
    }

    #[test]
    fn rewrite_direct_text_skips_tails_and_attributes() {
        let mut doc = ContentDoc::new(
            br#"<html><p title="keep me">change me<b>and me</b>not me</p></html>"#.to_vec(),
        );
        doc.rewrite_direct_text(|text| text.to_uppercase())
            .expect("rewrite should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert!(text.contains("CHANGE ME"));
        assert!(text.contains("AND ME"));
        assert!(text.contains("not me"));
        assert!(text.contains(r#"title="keep me""#));
    }

    #[test]
    fn rewrite_direct_text_leaves_blank_nodes_alone() {
        let source = "<html>\n  <body>\n    <p>x</p>\n  </body>\n</html>";
        let mut doc = ContentDoc::new(source.as_bytes().to_vec());
        doc.rewrite_direct_text(|text| text.replace('\n', " "))
            .expect("rewrite should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        // Inter-element whitespace is blank, so the document keeps its shape.
        assert_eq!(text, source);
    }
}
