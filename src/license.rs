// CLASSIFICATION: COMMUNITY
// Filename: license.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-02-24

//! License lookup across per-user license stores.
//!
//! Each user home keeps its licenses in an `exdata` directory; a license
//! file is named after the content id it covers.

use crate::drm::{ContentId, CONTENT_ID_LEN};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const LICENSE_DIR: &str = "exdata";

fn id_bytes(content_id: &ContentId) -> &[u8] {
    let len = content_id
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(CONTENT_ID_LEN);
    &content_id[..len]
}

/// Return `dir` when it holds a regular file named after `content_id`.
pub fn find_license(dir: &Path, content_id: &ContentId) -> Option<PathBuf> {
    let id = id_bytes(content_id);
    for entry in fs::read_dir(dir).ok()?.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name();
        if name.to_string_lossy().as_bytes().starts_with(id) {
            debug!(
                "Found license {} in {}",
                name.to_string_lossy(),
                dir.display()
            );
            return Some(dir.to_path_buf());
        }
    }
    None
}

/// Walk every user home under `root` and return the first license
/// directory holding a license for `content_id`.
pub fn find_license_from_users(root: &Path, content_id: &ContentId) -> Option<PathBuf> {
    for entry in fs::read_dir(root).ok()?.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        if let Some(found) = find_license(&entry.path().join(LICENSE_DIR), content_id) {
            return Some(found);
        }
    }
    debug!("No license found under {}", root.display());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drm::content_id_from_bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SEQ: AtomicUsize = AtomicUsize::new(0);

    fn scratch() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "repoint-license-{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn license_is_found_by_content_id_prefix() {
        let root = scratch();
        let exdata = root.join("00000001").join(LICENSE_DIR);
        fs::create_dir_all(&exdata).unwrap();
        let id = content_id_from_bytes(b"UP9000-REPT00001_00-0000111122223333");
        fs::write(
            exdata.join("UP9000-REPT00001_00-0000111122223333.rif"),
            b"rif",
        )
        .unwrap();
        assert_eq!(find_license_from_users(&root, &id), Some(exdata));
    }

    #[test]
    fn unrelated_files_do_not_match() {
        let root = scratch();
        let exdata = root.join("00000001").join(LICENSE_DIR);
        fs::create_dir_all(&exdata).unwrap();
        fs::write(exdata.join("EP0001-OTHER00000_00-X.rif"), b"rif").unwrap();
        let id = content_id_from_bytes(b"UP9000-REPT00001_00-0000111122223333");
        assert_eq!(find_license_from_users(&root, &id), None);
    }

    #[test]
    fn missing_store_is_not_an_error() {
        let root = scratch();
        let id = content_id_from_bytes(b"UP9000-REPT00001_00-0000111122223333");
        assert_eq!(find_license_from_users(&root, &id), None);
    }
}
