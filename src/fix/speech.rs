//! Text-to-speech pacing fixes.
//!
//! Reader voice synthesis treats a raw line break inside a paragraph as a
//! sentence boundary, and reads "foo...bar" as "foo dot dot dot bar".
//! Newlines in prose become spaces, and a period run glued between words
//! gets a trailing space so it is read as a pause.

use crate::bundle::Bundle;
use crate::config::FixupConfig;
use crate::doc::content::ContentDoc;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

static RE_PAUSE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9])(\.{3,})([A-Za-z0-9])").expect("pause-run pattern is valid")
});

pub fn fix_speech_pauses(bundle: &mut Bundle, cfg: &FixupConfig) -> Result<()> {
    let content_names: Vec<String> = bundle
        .names()
        .filter(|name| cfg.is_content_name(name))
        .map(str::to_string)
        .collect();

    for name in &content_names {
        let mut doc = ContentDoc::new(bundle.expect(name)?.to_vec());
        doc.rewrite_direct_text(pace_for_speech)
            .with_context(|| format!("Failed to rewrite prose in {name}"))?;
        bundle.insert(name.clone(), doc.into_bytes());
    }

    info!(
        documents = content_names.len(),
        "Adjusted prose for speech pacing"
    );
    Ok(())
}

fn pace_for_speech(text: &str) -> String {
    let text = text.replace('\n', " ");
    RE_PAUSE_RUN.replace_all(&text, "${1}${2} ${3}").into_owned()
}
