//! In-memory archive bundle.
//!
//! One e-book archive is held as a name-to-payload map for the duration of a
//! run. The loader reads every ZIP entry up front, the fixup stages mutate
//! the map, and the writer serializes it back in deterministic entry order.
//! Nothing is written to disk until the whole pipeline has succeeded.

use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

#[derive(Debug, Default, Clone)]
pub struct Bundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Bundle {
    pub fn from_zip_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open archive at {}", path.display()))?;
        Self::from_zip(file).with_context(|| format!("Failed to read archive at {}", path.display()))
    }

    pub fn from_zip<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).context("Not a readable ZIP archive")?;
        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();
            let mut payload = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut payload)
                .with_context(|| format!("Failed to read archive entry {name}"))?;
            debug!(name = %name, bytes = payload.len(), "Loaded entry");
            entries.insert(name, payload);
        }
        Ok(Self { entries })
    }

    /// Serialize the bundle and write it out in one step, so a failed encode
    /// never leaves a partial file behind.
    pub fn write_zip_path(&self, path: &Path) -> Result<()> {
        let bytes = self.to_zip_bytes()?;
        fs::write(path, bytes)
            .with_context(|| format!("Failed to write archive at {}", path.display()))
    }

    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, payload) in &self.entries {
            archive
                .start_file(name.as_str(), options)
                .with_context(|| format!("Failed to start archive entry {name}"))?;
            archive
                .write_all(payload)
                .with_context(|| format!("Failed to write archive entry {name}"))?;
        }
        let cursor = archive.finish().context("Failed to finalize archive")?;
        Ok(cursor.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Like [`Bundle::get`], but a missing entry is a hard error.
    pub fn expect(&self, name: &str) -> Result<&[u8]> {
        self.get(name)
            .ok_or_else(|| anyhow!("Archive has no entry named {name}"))
    }

    pub fn insert(&mut self, name: String, payload: Vec<u8>) {
        self.entries.insert(name, payload);
    }

    /// Move a payload under a new name. Refuses to clobber an existing entry
    /// so two names can never silently collapse into one.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.entries.contains_key(to) {
            bail!("Renaming {from} would clobber existing entry {to}");
        }
        let payload = self
            .entries
            .remove(from)
            .ok_or_else(|| anyhow!("Archive has no entry named {from}"))?;
        self.entries.insert(to.to_string(), payload);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
