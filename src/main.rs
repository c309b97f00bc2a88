//! Entry point for the EPUB fixup tool.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments (input archive, output archive).
//! - Load the fixup configuration from `conf/fixup.toml`.
//! - Load the archive, run the pipeline, write the patched archive.

mod bundle;
mod config;
mod doc;
mod fix;
mod pipeline;

use crate::bundle::Bundle;
use crate::config::FixupConfig;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let (input, output) = parse_args()?;
    let cfg = FixupConfig::load(Path::new(config::DEFAULT_CONFIG_PATH));
    set_log_level(reload_handle, &cfg.log_level);
    info!(
        input = %input.display(),
        output = %output.display(),
        "Starting EPUB fixup"
    );

    let mut bundle = Bundle::from_zip_path(&input)?;
    info!(entries = bundle.len(), "Loaded archive");

    Pipeline::new(&cfg).run(&mut bundle)?;

    bundle
        .write_zip_path(&output)
        .context("Failed to write the patched archive")?;
    info!(
        entries = bundle.len(),
        path = %output.display(),
        "Wrote patched archive"
    );
    Ok(())
}

fn parse_args() -> Result<(PathBuf, PathBuf)> {
    let mut args = env::args().skip(1);
    let usage = "Usage: mgnq-fixup <input.epub> <output.epub>";
    let input = args.next().ok_or_else(|| anyhow!(usage))?;
    let output = args.next().ok_or_else(|| anyhow!(usage))?;

    let input = PathBuf::from(input);
    if !input.exists() {
        return Err(anyhow!("File not found: {}", input.as_path().display()));
    }
    Ok((input, PathBuf::from(output)))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
