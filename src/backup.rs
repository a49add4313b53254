// CLASSIFICATION: COMMUNITY
// Filename: backup.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-01-27

//! Pristine-backup precondition for the patch pipeline.
//!
//! The backup is the canonical pre-patch source for every run: the image
//! at the primary path may already carry a patch, so it is copied aside
//! exactly once and never overwritten afterwards.

use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("unable to copy {} to {}: {source}", .image.display(), .backup.display())]
    Copy {
        image: std::path::PathBuf,
        backup: std::path::PathBuf,
        #[source]
        source: io::Error,
    },
}

/// True when a pristine backup already exists at `backup`.
pub fn backup_exists(backup: &Path) -> bool {
    backup.is_file()
}

/// Copy `image` to `backup` byte-for-byte unless the backup already
/// exists. Returns whether a copy was made.
pub fn ensure_backup(image: &Path, backup: &Path) -> Result<bool, BackupError> {
    if backup_exists(backup) {
        debug!("Backup {} already present, keeping it", backup.display());
        return Ok(false);
    }
    fs::copy(image, backup).map_err(|source| BackupError::Copy {
        image: image.to_path_buf(),
        backup: backup.to_path_buf(),
        source,
    })?;
    info!("Backed up {} to {}", image.display(), backup.display());
    Ok(true)
}
