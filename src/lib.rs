// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.5
// Date Modified: 2026-04-11
// Author: Lukas Bower

//! Repoint patches the network endpoints baked into a title's encrypted
//! executable so the game talks to a replacement server, while keeping
//! the DRM container intact.
//!
//! The pipeline backs up the pristine image once, decrypts it through an
//! external transform, rewrites the embedded URL and digest-key runs in
//! memory, then re-encrypts the result over the original path. A
//! background worker drives the stages while the caller polls a shared
//! status record; see [`job::PatchJob`].

/// Pristine-backup precondition.
pub mod backup;

/// Digest-key validation.
pub mod digest;

/// Seam to the DRM container tooling.
pub mod drm;

/// Owned decrypted-image buffer with bounds-checked run helpers.
pub mod image;

/// Patch job controller and status channel.
pub mod job;

/// License lookup across per-user stores.
pub mod license;

/// Path layout for a title's executable and the pipeline artifacts.
pub mod paths;

/// Byte-pattern scanner and patcher.
pub mod scan;

pub use drm::{DrmBackend, DrmError, ScetoolCli, TransformProfile};
pub use job::{JobError, JobStatus, PatchJob, PatchState};
pub use scan::{ScanSummary, ServerTarget};
