// CLASSIFICATION: COMMUNITY
// Filename: job.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-04-05

//! Patch job controller.
//!
//! One background worker drives the pipeline stages to completion while
//! the initiating thread polls a shared status record. The record is the
//! only state crossing the thread boundary; every access holds its mutex
//! for just the read or write, never across a blocking call.

use crate::backup;
use crate::backup::BackupError;
use crate::drm::{content_id_display, DrmBackend, DrmError};
use crate::image::ImageBuf;
use crate::paths::EbootPaths;
use crate::scan::{self, ScanError, ServerTarget};
use log::{debug, info, warn};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Stage of a patch job, in execution order.
///
/// `Patching` is declared for completeness but never entered: the rewrite
/// phase reports `Searching` throughout, as status observers have always
/// seen it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchState {
    #[default]
    NotStarted,
    BackingUp,
    Decrypting,
    Searching,
    Patching,
    Encrypting,
    Done,
    Error,
}

impl PatchState {
    pub fn name(self) -> &'static str {
        match self {
            PatchState::NotStarted => "Not Started",
            PatchState::BackingUp => "Backing Up",
            PatchState::Decrypting => "Decrypting",
            PatchState::Searching => "Searching",
            PatchState::Patching => "Patching",
            PatchState::Encrypting => "Encrypting",
            PatchState::Done => "Done",
            PatchState::Error => "Error",
        }
    }
}

impl fmt::Display for PatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of a job as seen by the polling caller.
#[derive(Clone, Debug, Default)]
pub struct JobStatus {
    pub state: PatchState,
    pub running: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("a patch job is already running")]
    AlreadyRunning,
    #[error("unable to spawn patch worker: {0}")]
    Spawn(#[source] io::Error),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error("Unable to get content id of executable.")]
    ContentId,
    #[error("Unable to find license.")]
    License,
    #[error("decrypt failed: {0}")]
    Decrypt(#[source] DrmError),
    #[error("encrypt failed: {0}")]
    Encrypt(#[source] DrmError),
    #[error("unable to read {}: {source}", .path.display())]
    ReadImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write {}: {source}", .path.display())]
    WriteImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Status record shared between the worker and the polling caller.
#[derive(Clone, Default)]
struct StatusChannel {
    inner: Arc<Mutex<JobStatus>>,
}

impl StatusChannel {
    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        // A poisoned guard still holds the last record written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        *self.lock() = JobStatus {
            state: PatchState::NotStarted,
            running: true,
            last_error: None,
        };
    }

    fn enter(&self, state: PatchState) {
        let mut status = self.lock();
        debug_assert!(
            state >= status.state,
            "stage regression: {} -> {}",
            status.state,
            state
        );
        status.state = state;
    }

    /// Terminal fields land before `running` clears, in one critical
    /// section, so a caller seeing `running == false` sees the outcome.
    fn fail(&self, message: String) {
        let mut status = self.lock();
        status.state = PatchState::Error;
        status.last_error = Some(message);
        status.running = false;
    }

    fn finish(&self) {
        let mut status = self.lock();
        status.state = PatchState::Done;
        status.last_error = None;
        status.running = false;
    }

    fn snapshot(&self) -> JobStatus {
        self.lock().clone()
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }
}

/// Owned patch job: start a worker, poll it, join it. One job runs at a
/// time; `start` rejects while a worker is live. Dropping the controller
/// detaches a still-running worker.
#[derive(Default)]
pub struct PatchJob {
    channel: StatusChannel,
    worker: Option<JoinHandle<()>>,
}

impl PatchJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a job against the image at `image`, repointing it at
    /// `target`. The backend supplies every DRM operation.
    pub fn start<B>(
        &mut self,
        backend: B,
        image: impl AsRef<Path>,
        device_key: [u8; 16],
        target: ServerTarget,
    ) -> Result<(), JobError>
    where
        B: DrmBackend + 'static,
    {
        if self.channel.is_running() {
            return Err(JobError::AlreadyRunning);
        }
        // Reap the previous, already-terminal worker.
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        let paths = EbootPaths::resolve(image.as_ref());
        info!(
            "Starting patch job for {} against {}",
            paths.image.display(),
            target.name
        );
        self.channel.begin();
        let channel = self.channel.clone();
        match thread::Builder::new()
            .name("repoint-patch".into())
            .spawn(move || run_worker(backend, paths, device_key, target, channel))
        {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(source) => {
                self.channel.fail("unable to spawn patch worker".into());
                Err(JobError::Spawn(source))
            }
        }
    }

    /// Lock-protected snapshot of the job status.
    pub fn poll_status(&self) -> JobStatus {
        self.channel.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_running()
    }

    /// Block until the worker reaches a terminal state and return the
    /// final status.
    pub fn join(&mut self) -> JobStatus {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                self.channel.fail("patch worker panicked".into());
            }
        }
        self.channel.snapshot()
    }
}

fn run_worker<B: DrmBackend>(
    mut backend: B,
    paths: EbootPaths,
    device_key: [u8; 16],
    target: ServerTarget,
    channel: StatusChannel,
) {
    match execute(&mut backend, &paths, device_key, &target, &channel) {
        Ok(()) => {
            info!("Patch job finished for {}", paths.image.display());
            channel.finish();
        }
        Err(err) => {
            warn!("Patch job failed: {err}");
            channel.fail(err.to_string());
        }
    }
}

fn execute<B: DrmBackend>(
    backend: &mut B,
    paths: &EbootPaths,
    device_key: [u8; 16],
    target: &ServerTarget,
    channel: &StatusChannel,
) -> Result<(), JobError> {
    info!("Backing up EBOOT.BIN if it doesn't exist");
    if !backup::backup_exists(&paths.backup) {
        channel.enter(PatchState::BackingUp);
    }
    backup::ensure_backup(&paths.image, &paths.backup)?;

    let profile = paths.transform_profile();
    debug!("Transform profile: {profile:?}");
    backend.set_transform_profile(profile);

    channel.enter(PatchState::Decrypting);
    info!("Setting device key");
    backend.set_device_key(device_key);

    info!("Getting content id");
    let content_id = backend.extract_content_id(&paths.backup).map_err(|err| {
        warn!("Content id extraction failed: {err}");
        JobError::ContentId
    })?;
    info!("Content id: {}", content_id_display(&content_id));

    info!("Finding license");
    let license_dir = backend.resolve_license(&content_id).map_err(|err| {
        warn!("License lookup failed: {err}");
        JobError::License
    })?;
    info!("License directory: {}", license_dir.display());

    info!("Decrypting");
    // Always decrypt the backup: the live EBOOT.BIN may already carry a
    // digest patch.
    backend
        .decrypt(&paths.backup, &paths.decrypted)
        .map_err(JobError::Decrypt)?;

    channel.enter(PatchState::Searching);
    info!("Searching");
    let mut image = ImageBuf::load(&paths.decrypted).map_err(|source| JobError::ReadImage {
        path: paths.decrypted.clone(),
        source,
    })?;

    match xmas_elf::ElfFile::new(image.bytes()) {
        Ok(elf) => debug!(
            "Decrypted image parses as ELF, entry {:#x}",
            elf.header.pt2.entry_point()
        ),
        Err(err) => warn!("Decrypted image does not parse as ELF ({err}); scanning raw bytes"),
    }

    let summary = scan::patch_image(&mut image, target)?;
    info!(
        "Patched {} URL run(s) and {} digest run(s)",
        summary.urls_patched, summary.digests_patched
    );

    info!("Writing {}", paths.patched.display());
    image
        .write_to(&paths.patched)
        .map_err(|source| JobError::WriteImage {
            path: paths.patched.clone(),
            source,
        })?;

    channel.enter(PatchState::Encrypting);
    info!("Encrypting");
    backend
        .encrypt(&paths.patched, &paths.image)
        .map_err(JobError::Encrypt)?;

    Ok(())
}
