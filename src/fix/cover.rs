//! Per-volume cover badge composition.
//!
//! Every volume ships the same cover art, so the bookshelf thumbnails are
//! indistinguishable. A ring badge is drawn onto the base cover and the
//! volume digit, cropped from a ten-frame sprite strip, is pasted in its
//! center. The composed image joins the bundle under a new name and the
//! package manifest and title page are rewired to reference it. Requires
//! shortened titles, since the volume pattern targets the short form.

use crate::bundle::Bundle;
use crate::config::{BadgeGeometry, FixupConfig};
use crate::doc::navigation::NavigationDoc;
use crate::doc::package::PackageDoc;
use crate::doc::titlepage::TitlePageDoc;
use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

const RING_FILL: Rgb<u8> = Rgb([0, 0, 0]);
const FACE_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Frames in the digit sprite strip, one per decimal digit.
const DIGIT_FRAMES: u32 = 10;

pub fn compose_cover_badge(bundle: &mut Bundle, cfg: &FixupConfig) -> Result<()> {
    let pattern = Regex::new(&cfg.volume_pattern)
        .with_context(|| format!("Invalid volume pattern {:?}", cfg.volume_pattern))?;
    let nav = NavigationDoc::new(bundle.expect(&cfg.navigation_name)?.to_vec());
    let volume = nav.volume_number(&pattern)?;
    if volume >= DIGIT_FRAMES {
        bail!("Volume number {volume} does not fit the single-digit badge strip");
    }

    let base = image::open(Path::new(&cfg.cover_asset))
        .with_context(|| format!("Failed to load base cover {}", cfg.cover_asset))?;
    let digits = image::open(Path::new(&cfg.digit_strip_asset))
        .with_context(|| format!("Failed to load digit strip {}", cfg.digit_strip_asset))?;
    debug!(volume, cover = %cfg.cover_asset, digits = %cfg.digit_strip_asset, "Composing badge");

    let composed = draw_badge(&base, &digits, volume, &cfg.badge);
    let (width, height) = composed.dimensions();

    let mut encoded = Cursor::new(Vec::new());
    composed
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .context("Failed to encode composed cover")?;
    bundle.insert(cfg.cover_entry_name.clone(), encoded.into_inner());

    let mut package = PackageDoc::new(bundle.expect(&cfg.package_name)?.to_vec());
    let retargeted = package.retarget_cover(&cfg.cover_entry_name)?;
    bundle.insert(cfg.package_name.clone(), package.into_bytes());

    let mut title_page = TitlePageDoc::new(bundle.expect(&cfg.title_page_name)?.to_vec());
    title_page.point_at_cover(&cfg.cover_entry_name, width, height)?;
    bundle.insert(cfg.title_page_name.clone(), title_page.into_bytes());

    info!(
        volume,
        entry = %cfg.cover_entry_name,
        retargeted,
        width,
        height,
        "Composed volume badge cover"
    );
    Ok(())
}

fn draw_badge(
    base: &DynamicImage,
    digits: &DynamicImage,
    volume: u32,
    badge: &BadgeGeometry,
) -> DynamicImage {
    let mut canvas = base.to_rgb8();
    let cx = badge.center_x as i64;
    let cy = badge.center_y as i64;
    fill_circle(&mut canvas, cx, cy, badge.outer_radius as i64, RING_FILL);
    fill_circle(&mut canvas, cx, cy, badge.inner_radius as i64, FACE_FILL);

    let (strip_width, strip_height) = digits.dimensions();
    let frame_width = strip_width / DIGIT_FRAMES;
    let frame = digits
        .crop_imm(volume * frame_width, 0, frame_width, strip_height)
        .to_rgb8();
    let x = cx - (frame_width / 2) as i64;
    let y = cy - (strip_height / 2) as i64;
    image::imageops::overlay(&mut canvas, &frame, x, y);

    DynamicImage::ImageRgb8(canvas)
}

fn fill_circle(canvas: &mut RgbImage, cx: i64, cy: i64, radius: i64, fill: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    for y in (cy - radius).max(0)..=(cy + radius).min(height as i64 - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(width as i64 - 1) {
            let dx = x - cx;
            let dy = y - cy;
            if dx * dx + dy * dy <= radius * radius {
                canvas.put_pixel(x as u32, y as u32, fill);
            }
        }
    }
}
