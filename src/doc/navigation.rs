//! Navigation document (`toc.ncx`) operations.
//!
//! The NCX maps reading-order entries to content-document names and display
//! labels. Fixups need three things from it: rewriting `src` references,
//! replacing nav-point labels, and digging the volume number out of its
//! text.

use super::map_attributes;
use anyhow::{Context, Result, anyhow};
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Cursor;

pub struct NavigationDoc {
    bytes: Vec<u8>,
}

impl NavigationDoc {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Rewrite every `src` attribute in the document through `f`.
    pub fn rewrite_src(&mut self, f: impl Fn(&str) -> String) -> Result<()> {
        self.bytes = map_attributes(&self.bytes, |key, value| (key == b"src").then(|| f(value)))
            .context("Failed to rewrite navigation src attributes")?;
        Ok(())
    }

    /// Volume number embedded in the document text, per `pattern` (one
    /// capture group of digits). Absence of the pattern is a hard error.
    pub fn volume_number(&self, pattern: &Regex) -> Result<u32> {
        let text = String::from_utf8_lossy(&self.bytes);
        let captures = pattern.captures(&text).ok_or_else(|| {
            anyhow!("Navigation document does not match volume pattern {pattern}")
        })?;
        let digits = captures
            .get(1)
            .ok_or_else(|| anyhow!("Volume pattern {pattern} has no capture group"))?
            .as_str();
        digits
            .parse::<u32>()
            .with_context(|| format!("Volume number {digits} is not an integer"))
    }

    /// Replace the label of every nav-point whose `content` child references
    /// a key of `titles`. Nav-points without a matching entry keep their
    /// original label. Returns how many labels were patched.
    pub fn relabel(&mut self, titles: &BTreeMap<String, String>) -> Result<usize> {
        // Pass 1 collects each nav-point's target so pass 2 can patch the
        // label, which precedes the content element in the NCX.
        let srcs = self.nav_point_srcs()?;

        let mut reader = Reader::from_reader(self.bytes.as_slice());
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut buf = Vec::new();

        // Nav-points nest; the stack tracks which one a label belongs to.
        let mut stack: Vec<usize> = Vec::new();
        let mut next_ordinal = 0usize;
        let mut relabeled = vec![false; srcs.len()];
        let mut in_label = false;
        let mut in_label_text = false;
        // Set after a label is replaced: drop the rest of the original text
        // node (it may span several events when entities are involved).
        let mut swallowing = false;
        let mut patched = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    match e.local_name().as_ref() {
                        b"navPoint" => {
                            stack.push(next_ordinal);
                            next_ordinal += 1;
                        }
                        b"navLabel" if !stack.is_empty() => in_label = true,
                        b"text" if in_label => in_label_text = true,
                        _ => {}
                    }
                    swallowing = false;
                    writer.write_event(Event::Start(e))?;
                }
                Event::End(e) => {
                    match e.local_name().as_ref() {
                        b"navPoint" => {
                            stack.pop();
                        }
                        b"navLabel" => in_label = false,
                        b"text" => {
                            in_label_text = false;
                            swallowing = false;
                        }
                        _ => {}
                    }
                    writer.write_event(Event::End(e))?;
                }
                Event::Text(t) if !swallowing => {
                    let mut replacement = None;
                    if in_label_text {
                        if let Some(&ordinal) = stack.last() {
                            if !relabeled[ordinal] {
                                if let Some(Some(src)) = srcs.get(ordinal) {
                                    if let Some(title) = titles.get(src) {
                                        relabeled[ordinal] = true;
                                        replacement = Some(title.clone());
                                    }
                                }
                            }
                        }
                    }
                    match replacement {
                        Some(title) => {
                            patched += 1;
                            swallowing = true;
                            writer.write_event(Event::Text(BytesText::new(&title)))?;
                        }
                        None => writer.write_event(Event::Text(t))?,
                    }
                }
                Event::Text(_) => {}
                Event::GeneralRef(e) => {
                    if !swallowing {
                        writer.write_event(Event::GeneralRef(e))?;
                    }
                }
                Event::Eof => break,
                event => writer.write_event(event)?,
            }
            buf.clear();
        }

        self.bytes = writer.into_inner().into_inner();
        Ok(patched)
    }

    /// First `content` src of each nav-point, in pre-order.
    fn nav_point_srcs(&self) -> Result<Vec<Option<String>>> {
        let mut reader = Reader::from_reader(self.bytes.as_slice());
        let mut buf = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut srcs: Vec<Option<String>> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"navPoint" => {
                        stack.push(srcs.len());
                        srcs.push(None);
                    }
                    b"content" => record_src(&e, &stack, &mut srcs)?,
                    _ => {}
                },
                Event::Empty(e) => {
                    if e.local_name().as_ref() == b"content" {
                        record_src(&e, &stack, &mut srcs)?;
                    }
                }
                Event::End(e) => {
                    if e.local_name().as_ref() == b"navPoint" {
                        stack.pop();
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(srcs)
    }
}

fn record_src(
    element: &quick_xml::events::BytesStart<'_>,
    stack: &[usize],
    srcs: &mut [Option<String>],
) -> Result<()> {
    let Some(&ordinal) = stack.last() else {
        return Ok(());
    };
    if srcs[ordinal].is_some() {
        return Ok(());
    }
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"src" {
            srcs[ordinal] = Some(attr.unescape_value()?.into_owned());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <docTitle><text>MGNQ Book 3</text></docTitle>
  <navMap>
    <navPoint id="np-1" playOrder="1">
      <navLabel><text>Thread 20:</text></navLabel>
      <content src="Chapter%201.htm"/>
      <navPoint id="np-2" playOrder="2">
        <navLabel><text>Thread 21:</text></navLabel>
        <content src="Chapter2.htm"/>
      </navPoint>
    </navPoint>
  </navMap>
</ncx>"#;

    #[test]
    fn rewrite_src_touches_every_src_attribute() {
        let mut doc = NavigationDoc::new(NCX.as_bytes().to_vec());
        doc.rewrite_src(|src| src.replace("%20", ""))
            .expect("rewrite should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert!(text.contains(r#"src="Chapter1.htm""#));
        assert!(!text.contains("%20"));
    }

    #[test]
    fn volume_number_matches_the_configured_pattern() {
        let doc = NavigationDoc::new(NCX.as_bytes().to_vec());
        let pattern = Regex::new("MGNQ Book ([0-9]+)").expect("pattern is valid");
        assert_eq!(doc.volume_number(&pattern).expect("volume should match"), 3);
    }

    #[test]
    fn volume_number_fails_when_pattern_is_absent() {
        let doc = NavigationDoc::new(b"<ncx><text>no volume here</text></ncx>".to_vec());
        let pattern = Regex::new("MGNQ Book ([0-9]+)").expect("pattern is valid");
        let err = doc
            .volume_number(&pattern)
            .expect_err("missing pattern should be an error");
        assert!(err.to_string().contains("volume pattern"));
    }

    #[test]
    fn relabel_matches_nested_nav_points_to_their_own_targets() {
        let mut doc = NavigationDoc::new(NCX.as_bytes().to_vec());
        let mut titles = BTreeMap::new();
        titles.insert(
            "Chapter2.htm".to_string(),
            "Thread 21: Murderface".to_string(),
        );

        let patched = doc.relabel(&titles).expect("relabel should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert_eq!(patched, 1);
        // The outer nav-point's target has no title entry, so its label stays.
        assert!(text.contains("<text>Thread 20:</text>"));
        assert!(text.contains("<text>Thread 21: Murderface</text>"));
    }

    #[test]
    fn relabel_replaces_the_whole_original_label() {
        let ncx = r#"<ncx><navMap><navPoint>
<navLabel><text>Thread &amp; more</text></navLabel>
<content src="a.htm"/>
</navPoint></navMap></ncx>"#;
        let mut doc = NavigationDoc::new(ncx.as_bytes().to_vec());
        let mut titles = BTreeMap::new();
        titles.insert("a.htm".to_string(), "Full Title".to_string());

        doc.relabel(&titles).expect("relabel should succeed");
        let text = String::from_utf8(doc.into_bytes()).expect("output should be UTF-8");

        assert!(text.contains("<text>Full Title</text>"));
        assert!(!text.contains("more"));
    }
}
