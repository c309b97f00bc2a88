//! File-name encoding normalization.
//!
//! Readers treat "Foo Bar.htm" and "Foo%20Bar.htm" as different targets, so
//! splits and the TOC drift apart whenever the encodings disagree. Every
//! content-document name collapses to a space-free canonical form, applied
//! to the entries themselves and to every reference in the navigation and
//! package documents. Must run before any stage that resolves entry names.

use crate::bundle::Bundle;
use crate::config::FixupConfig;
use crate::doc::navigation::NavigationDoc;
use crate::doc::package::PackageDoc;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Canonical form of an entry name: raw spaces removed first, then their
/// percent-encoded form. The two patterns never overlap within one name.
pub fn canonical_name(name: &str) -> String {
    name.replace(' ', "").replace("%20", "")
}

pub fn normalize_names(bundle: &mut Bundle, cfg: &FixupConfig) -> Result<()> {
    let stale: Vec<String> = bundle
        .names()
        .filter(|name| cfg.is_content_name(name))
        .filter(|name| canonical_name(name) != *name)
        .map(str::to_string)
        .collect();

    for name in &stale {
        let canonical = canonical_name(name);
        bundle
            .rename(name, &canonical)
            .context("Name normalization collision")?;
        debug!(from = %name, to = %canonical, "Renamed entry");
    }

    let mut nav = NavigationDoc::new(bundle.expect(&cfg.navigation_name)?.to_vec());
    nav.rewrite_src(|src| canonical_name(src))?;
    bundle.insert(cfg.navigation_name.clone(), nav.into_bytes());

    let mut package = PackageDoc::new(bundle.expect(&cfg.package_name)?.to_vec());
    package.rewrite_href(|href| canonical_name(href))?;
    bundle.insert(cfg.package_name.clone(), package.into_bytes());

    info!(renamed = stale.len(), "Normalized entry names");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX: &str = r#"<ncx><navMap><navPoint>
<navLabel><text>Thread 1:</text></navLabel>
<content src="Chapter%201.htm"/>
</navPoint></navMap></ncx>"#;

    const OPF: &str = r#"<package><manifest>
<item id="chapter-1" href="Chapter 1.htm"/>
<item id="cover" href="cover.jpg"/>
</manifest></package>"#;

    fn sample_bundle() -> Bundle {
        let mut bundle = Bundle::default();
        bundle.insert("toc.ncx".to_string(), NCX.as_bytes().to_vec());
        bundle.insert("content.opf".to_string(), OPF.as_bytes().to_vec());
        bundle.insert("Chapter 1.htm".to_string(), b"<html/>".to_vec());
        bundle
    }

    #[test]
    fn canonical_name_strips_spaces_and_percent_encoding() {
        assert_eq!(canonical_name("Chapter 1.htm"), "Chapter1.htm");
        assert_eq!(canonical_name("Chapter%201.htm"), "Chapter1.htm");
        assert_eq!(canonical_name("Chapter% 201.htm"), "Chapter1.htm");
        assert_eq!(canonical_name("Chapter1.htm"), "Chapter1.htm");
    }

    #[test]
    fn normalize_renames_entries_and_rewrites_references() {
        let cfg = FixupConfig::default();
        let mut bundle = sample_bundle();
        normalize_names(&mut bundle, &cfg).expect("normalization should succeed");

        assert!(bundle.get("Chapter 1.htm").is_none());
        assert!(bundle.get("Chapter1.htm").is_some());

        let nav = String::from_utf8(bundle.expect("toc.ncx").unwrap().to_vec()).unwrap();
        let opf = String::from_utf8(bundle.expect("content.opf").unwrap().to_vec()).unwrap();
        assert!(nav.contains(r#"src="Chapter1.htm""#));
        assert!(opf.contains(r#"href="Chapter1.htm""#));
        assert!(!nav.contains("%20"));
        assert!(!opf.contains("Chapter 1.htm"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let cfg = FixupConfig::default();
        let mut bundle = sample_bundle();
        normalize_names(&mut bundle, &cfg).expect("first pass should succeed");
        let nav_after_first = bundle.expect("toc.ncx").unwrap().to_vec();
        let names_after_first: Vec<String> = bundle.names().map(str::to_string).collect();

        normalize_names(&mut bundle, &cfg).expect("second pass should succeed");
        let names_after_second: Vec<String> = bundle.names().map(str::to_string).collect();

        assert_eq!(names_after_first, names_after_second);
        assert_eq!(bundle.expect("toc.ncx").unwrap(), &nav_after_first[..]);
    }

    #[test]
    fn normalize_rejects_colliding_canonical_names() {
        let cfg = FixupConfig::default();
        let mut bundle = sample_bundle();
        bundle.insert("Chapter1.htm".to_string(), b"<html>other</html>".to_vec());

        let err = normalize_names(&mut bundle, &cfg)
            .expect_err("colliding canonical names should fail");
        assert!(format!("{err:#}").contains("collision"));
    }
}
