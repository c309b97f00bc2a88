//! The fixup pipeline.
//!
//! Stage order is fixed and encoded here: name normalization must commit
//! before any stage that resolves entry names, and title shortening must
//! precede cover composition because the volume pattern targets the
//! shortened form. The bundle is threaded through every stage and written
//! out only after the whole sequence succeeds.

use crate::bundle::Bundle;
use crate::config::FixupConfig;
use crate::fix;
use anyhow::{Context, Result};
use tracing::info;

pub struct Pipeline {
    cfg: FixupConfig,
}

impl Pipeline {
    pub fn new(cfg: &FixupConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn run(&self, bundle: &mut Bundle) -> Result<()> {
        info!(entries = bundle.len(), "Running fixup pipeline");
        fix::names::normalize_names(bundle, &self.cfg).context("Name normalization failed")?;
        fix::titles::shorten_titles(bundle, &self.cfg).context("Title shortening failed")?;
        fix::chapters::repair_chapter_titles(bundle, &self.cfg)
            .context("Chapter-title repair failed")?;
        fix::speech::fix_speech_pauses(bundle, &self.cfg).context("Speech-pause fix failed")?;
        fix::cover::compose_cover_badge(bundle, &self.cfg)
            .context("Cover badge composition failed")?;
        Ok(())
    }
}
