// CLASSIFICATION: COMMUNITY
// Filename: scan.rs v0.5
// Author: Lukas Bower
// Date Modified: 2026-03-11

//! Byte-pattern scanner that rewrites the server configuration embedded in
//! a decrypted executable image.
//!
//! Two patterns are hunted in a single sweep over the buffer at a 4-byte
//! stride: URL runs (`"http..."` up to the next NUL) are rewritten to the
//! target server's URL, and the digest key parked near the literal
//! `"cookie"` is replaced with a fixed placeholder. Detection and mutation
//! happen at the same scan position; there is no separate apply stage.

use crate::digest::{valid_digest, DIGEST_LEN, DIGEST_REPLACEMENT};
use crate::image::{ImageBuf, ImageError};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use thiserror::Error;

/// The replacement server a title is being repointed at.
#[derive(Clone, Debug)]
pub struct ServerTarget {
    pub name: String,
    pub url: String,
    /// Also replace the embedded digest key, for servers that expect the
    /// fixed placeholder instead of the publisher's secret.
    pub patch_digest: bool,
}

/// Bytes examined on each side of a `"cookie"` hit when hunting the
/// digest key.
const DIGEST_WINDOW: usize = 1000;

// Anchored shape of a rewritable URL run: "http", optional "s", ONE
// arbitrary separator byte, "//", a host starting [0-9a-zA-Z.:], then an
// optional path. The separator byte is deliberately loose; shipped images
// vary here.
static URL_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s-u)^https?.//([0-9a-zA-Z.:].*)/?([0-9a-zA-Z_]*)$")
        .expect("URL run pattern compiles")
});

#[derive(Debug, Error)]
pub enum ScanError {
    /// The target URL does not fit any located URL slot. Fatal to the
    /// whole job; no partial substitution is attempted.
    #[error("URL too long to fit in EBOOT.")]
    UrlTooLong,
}

/// Totals reported by one scan sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub urls_patched: usize,
    pub digests_patched: usize,
}

/// Run both patch passes over `image` in one sweep.
///
/// On [`ScanError::UrlTooLong`] the buffer may already hold earlier
/// rewrites; callers must discard it rather than write it out.
pub fn patch_image(image: &mut ImageBuf, target: &ServerTarget) -> Result<ScanSummary, ScanError> {
    let mut summary = ScanSummary::default();
    let len = image.len();
    let mut offset = 0;
    while offset + 4 <= len {
        if image.bytes()[offset..offset + 4] == *b"http" {
            if patch_url_run(image, offset, &target.url)? {
                summary.urls_patched += 1;
            }
        } else if target.patch_digest
            && offset + 7 <= len
            && image.bytes()[offset..offset + 7] == *b"cookie\0"
        {
            debug!("Found cookie at offset {offset:#x}");
            if patch_digest_near(image, offset) {
                summary.digests_patched += 1;
            }
        }
        offset += 4;
    }
    Ok(summary)
}

fn patch_url_run(image: &mut ImageBuf, offset: usize, url: &str) -> Result<bool, ScanError> {
    {
        let run = image.run_at(offset);
        debug!(
            "Found URL candidate at offset {offset:#x}: {}",
            String::from_utf8_lossy(run)
        );
        if !URL_RUN.is_match(run) {
            return Ok(false);
        }
        // %-bearing runs are printf templates filled in at runtime, not
        // configuration. Leave them alone.
        if run.contains(&b'%') {
            debug!("Skipping format string at offset {offset:#x}");
            return Ok(false);
        }
    }
    match image.overwrite_run(offset, url.as_bytes()) {
        Ok(()) => {
            info!("Patched URL run at offset {offset:#x}");
            Ok(true)
        }
        Err(ImageError::Capacity { needed, available, .. }) => {
            debug!("URL needs {needed} bytes, slot at {offset:#x} holds {available}");
            Err(ScanError::UrlTooLong)
        }
        Err(ImageError::OutOfBounds { .. }) => Ok(false),
    }
}

/// Hunt the ±[`DIGEST_WINDOW`] bytes around a `"cookie"` hit (clamped to
/// the buffer) for an exactly [`DIGEST_LEN`]-character digest run and
/// overwrite the first qualifying one. Each examined run is skipped in
/// full, so overlapping false positives are not rescanned.
fn patch_digest_near(image: &mut ImageBuf, hit: usize) -> bool {
    let start = hit.saturating_sub(DIGEST_WINDOW);
    let end = (hit + DIGEST_WINDOW).min(image.len());
    let mut j = start;
    while j < end {
        let run_len = image.run_at(j).len();
        if run_len == DIGEST_LEN
            && valid_digest(image.run_at(j))
            && image.overwrite_run(j, DIGEST_REPLACEMENT).is_ok()
        {
            info!("Patched digest run at offset {j:#x}");
            return true;
        }
        j += run_len + 1;
    }
    false
}
