//! Configuration for a fixup run.
//!
//! All tunables are centralized here and loaded from `conf/fixup.toml` if
//! present. Any missing or invalid entries fall back to defaults that
//! reproduce the stock MGNQ fixup behavior, so the tool runs with no config
//! file at all.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "conf/fixup.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FixupConfig {
    pub log_level: String,
    pub content_suffix: String,
    pub navigation_name: String,
    pub package_name: String,
    pub title_page_name: String,
    pub long_title: String,
    pub short_title: String,
    pub volume_pattern: String,
    pub cover_asset: String,
    pub digit_strip_asset: String,
    pub cover_entry_name: String,
    pub badge: BadgeGeometry,
}

/// Badge placement on the cover, in pixels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct BadgeGeometry {
    pub center_x: u32,
    pub center_y: u32,
    pub outer_radius: u32,
    pub inner_radius: u32,
}

impl Default for FixupConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            content_suffix: ".htm".to_string(),
            navigation_name: "toc.ncx".to_string(),
            package_name: "content.opf".to_string(),
            title_page_name: "titlepage.xhtml".to_string(),
            long_title: "Magical Girl Noir Quest".to_string(),
            short_title: "MGNQ".to_string(),
            volume_pattern: "MGNQ Book ([0-9]+)".to_string(),
            cover_asset: "cover.jpg".to_string(),
            digit_strip_asset: "numbers.png".to_string(),
            cover_entry_name: "cover-fixup.jpg".to_string(),
            badge: BadgeGeometry::default(),
        }
    }
}

impl Default for BadgeGeometry {
    fn default() -> Self {
        Self {
            center_x: 350,
            center_y: 200,
            outer_radius: 50,
            inner_radius: 40,
        }
    }
}

impl FixupConfig {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<FixupConfig>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded fixup config");
                    config
                }
                Err(err) => {
                    warn!(path = %path.display(), "Invalid fixup config TOML: {err}");
                    Self::default()
                }
            },
            Err(err) => {
                warn!(path = %path.display(), "Falling back to default fixup config: {err}");
                Self::default()
            }
        }
    }

    pub fn is_content_name(&self, name: &str) -> bool {
        name.ends_with(&self.content_suffix)
    }
}
