//! Series-title shortening.
//!
//! The full series title overflows reader bookshelf labels, which truncate
//! it with no way to tell the volumes apart. Both metadata documents get
//! the acronym instead. Treats the documents as opaque text.

use crate::bundle::Bundle;
use crate::config::FixupConfig;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub fn shorten_titles(bundle: &mut Bundle, cfg: &FixupConfig) -> Result<()> {
    // The "<title> -" form must go first or the bare-title replacement
    // fires early and leaves a dangling separator.
    let with_separator = format!("{} -", cfg.long_title);
    let mut replaced = 0usize;

    for name in [cfg.navigation_name.clone(), cfg.package_name.clone()] {
        let bytes = bundle.expect(&name)?;
        let text = std::str::from_utf8(bytes)
            .with_context(|| format!("{name} is not valid UTF-8"))?;
        let occurrences = text.matches(cfg.long_title.as_str()).count();
        if occurrences == 0 {
            debug!(name = %name, "No long-form title occurrences");
            continue;
        }
        let shortened = text
            .replace(&with_separator, &cfg.short_title)
            .replace(&cfg.long_title, &cfg.short_title);
        replaced += occurrences;
        debug!(name = %name, occurrences, "Shortened series title");
        bundle.insert(name, shortened.into_bytes());
    }

    info!(replaced, short = %cfg.short_title, "Shortened series titles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> Bundle {
        let mut bundle = Bundle::default();
        bundle.insert(
            "toc.ncx".to_string(),
            b"<docTitle><text>Magical Girl Noir Quest - Book 3</text></docTitle>".to_vec(),
        );
        bundle.insert(
            "content.opf".to_string(),
            b"<dc:title>Magical Girl Noir Quest</dc:title>".to_vec(),
        );
        bundle
    }

    #[test]
    fn separator_form_is_replaced_without_a_dangling_dash() {
        let cfg = FixupConfig::default();
        let mut bundle = sample_bundle();
        shorten_titles(&mut bundle, &cfg).expect("shortening should succeed");

        let nav = String::from_utf8(bundle.expect("toc.ncx").unwrap().to_vec()).unwrap();
        assert!(nav.contains("MGNQ Book 3"));
        assert!(!nav.contains("MGNQ -"));
        assert!(!nav.contains("Magical Girl Noir Quest"));
    }

    #[test]
    fn bare_form_is_replaced_in_the_package_document() {
        let cfg = FixupConfig::default();
        let mut bundle = sample_bundle();
        shorten_titles(&mut bundle, &cfg).expect("shortening should succeed");

        let opf = String::from_utf8(bundle.expect("content.opf").unwrap().to_vec()).unwrap();
        assert_eq!(opf, "<dc:title>MGNQ</dc:title>");
    }

    #[test]
    fn every_long_form_occurrence_becomes_a_short_form_one() {
        let cfg = FixupConfig::default();
        let mut bundle = Bundle::default();
        bundle.insert(
            "toc.ncx".to_string(),
            b"Magical Girl Noir Quest - Book 1 and Magical Girl Noir Quest again".to_vec(),
        );
        bundle.insert("content.opf".to_string(), b"no titles here".to_vec());
        shorten_titles(&mut bundle, &cfg).expect("shortening should succeed");

        let nav = String::from_utf8(bundle.expect("toc.ncx").unwrap().to_vec()).unwrap();
        assert_eq!(nav.matches("MGNQ").count(), 2);
        assert!(!nav.contains("Magical Girl Noir Quest"));
    }
}
