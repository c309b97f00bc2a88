//! Chapter-title repair.
//!
//! TOC labels are truncated: a chapter's markup reads
//! `<h1>Thread 20:</h1> <p><b>Midori III</b></p>` but the nav-point label
//! only carries "Thread 20:". The full title is derived from each content
//! document and written back over the label. Requires normalized names.

use crate::bundle::Bundle;
use crate::config::FixupConfig;
use crate::doc::content::ContentDoc;
use crate::doc::navigation::NavigationDoc;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub fn repair_chapter_titles(bundle: &mut Bundle, cfg: &FixupConfig) -> Result<()> {
    let content_names: Vec<String> = bundle
        .names()
        .filter(|name| cfg.is_content_name(name))
        .map(str::to_string)
        .collect();

    let mut titles = BTreeMap::new();
    for name in &content_names {
        let doc = ContentDoc::new(bundle.expect(name)?.to_vec());
        let full_title = doc
            .full_title()
            .with_context(|| format!("Failed to parse content document {name}"))?;
        match full_title {
            Some(title) => {
                debug!(name = %name, title = %title, "Derived full chapter title");
                titles.insert(name.clone(), title);
            }
            None => debug!(name = %name, "No heading/bold pair; keeping original label"),
        }
    }

    let mut nav = NavigationDoc::new(bundle.expect(&cfg.navigation_name)?.to_vec());
    let patched = nav
        .relabel(&titles)
        .context("Failed to patch navigation labels")?;
    bundle.insert(cfg.navigation_name.clone(), nav.into_bytes());

    info!(derived = titles.len(), patched, "Repaired chapter titles");
    Ok(())
}
