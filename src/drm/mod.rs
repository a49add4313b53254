// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-03-02

//! Seam to the DRM container tooling.
//!
//! The pipeline drives decrypt, encrypt and the key/identity lookups as
//! trusted black boxes; the cryptography itself lives outside this crate.
//! Backends are stateful: profile, device key, content id and license
//! location are installed once and reused by the transform calls.

pub mod scetool;

pub use scetool::ScetoolCli;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Length of a content identifier in bytes.
pub const CONTENT_ID_LEN: usize = 0x30;

/// Opaque identifier tying an executable to its license. Shorter ids are
/// NUL padded.
pub type ContentId = [u8; CONTENT_ID_LEN];

/// Copy up to [`CONTENT_ID_LEN`] bytes into a NUL-padded content id.
pub fn content_id_from_bytes(bytes: &[u8]) -> ContentId {
    let mut id = [0u8; CONTENT_ID_LEN];
    let len = bytes.len().min(CONTENT_ID_LEN);
    id[..len].copy_from_slice(&bytes[..len]);
    id
}

/// Render a content id for logs, stopping at the first NUL.
pub fn content_id_display(id: &ContentId) -> String {
    let len = id.iter().position(|&b| b == 0).unwrap_or(CONTENT_ID_LEN);
    String::from_utf8_lossy(&id[..len]).into_owned()
}

/// DRM container profile selected before decrypt/encrypt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformProfile {
    /// Store-delivered content, keyed per device and license.
    Npdrm,
    /// Disc content.
    Disc,
}

#[derive(Debug, Error)]
pub enum DrmError {
    #[error("unable to launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{op} failed with {status}")]
    Tool { op: &'static str, status: ExitStatus },
    #[error("content id unavailable")]
    ContentIdUnavailable,
    #[error("license not found")]
    LicenseNotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Stateful backend driving the DRM transform.
pub trait DrmBackend: Send {
    /// Select the container profile used by later transform calls.
    fn set_transform_profile(&mut self, profile: TransformProfile);

    /// Install the caller-supplied per-device key material.
    fn set_device_key(&mut self, key: [u8; 16]);

    /// Extract the content id from the executable at `image`.
    fn extract_content_id(&mut self, image: &Path) -> Result<ContentId, DrmError>;

    /// Locate the license material for `content_id` and retain it for the
    /// transform calls.
    fn resolve_license(&mut self, content_id: &ContentId) -> Result<PathBuf, DrmError>;

    fn decrypt(&mut self, input: &Path, output: &Path) -> Result<(), DrmError>;

    fn encrypt(&mut self, input: &Path, output: &Path) -> Result<(), DrmError>;
}
