// CLASSIFICATION: COMMUNITY
// Filename: paths.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-02-20

//! Path layout for a title's executable and the pipeline's artifacts.
//!
//! Installed titles keep their executable at
//! `<root>/<TITLE_ID>/USRDIR/EBOOT.BIN`; the backup, patched and
//! decrypted artifacts live beside it with fixed suffixes, and the title
//! id is recovered from the grandparent directory name.

use crate::drm::TransformProfile;
use std::path::{Path, PathBuf};

const BACKUP_SUFFIX: &str = ".BAK";
const PATCHED_SUFFIX: &str = ".PATCHED";
const DECRYPTED_SUFFIX: &str = ".DEC";

/// Resolved file locations for one patch job.
#[derive(Clone, Debug)]
pub struct EbootPaths {
    /// The encrypted executable being patched; also the final output.
    pub image: PathBuf,
    /// Pristine copy, created once and used as the source of every run.
    pub backup: PathBuf,
    /// Patched-but-not-reencrypted intermediate, overwritten each run.
    pub patched: PathBuf,
    /// Decrypt output consumed during the scan stage.
    pub decrypted: PathBuf,
    /// Title id taken from the directory layout, when the path exposes one.
    pub title_id: Option<String>,
}

impl EbootPaths {
    pub fn resolve(image: &Path) -> Self {
        let title_id = image
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            image: image.to_path_buf(),
            backup: sibling(image, BACKUP_SUFFIX),
            patched: sibling(image, PATCHED_SUFFIX),
            decrypted: sibling(image, DECRYPTED_SUFFIX),
            title_id,
        }
    }

    /// NPDRM titles carry an `N`-leading id; everything else is treated
    /// as disc content.
    pub fn transform_profile(&self) -> TransformProfile {
        match self.title_id.as_deref().and_then(|id| id.chars().next()) {
            Some('N') => TransformProfile::Npdrm,
            _ => TransformProfile::Disc,
        }
    }
}

fn sibling(image: &Path, suffix: &str) -> PathBuf {
    let mut os = image.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_sit_beside_the_image() {
        let paths = EbootPaths::resolve(Path::new("/game/NPUB30042/USRDIR/EBOOT.BIN"));
        assert_eq!(
            paths.backup,
            PathBuf::from("/game/NPUB30042/USRDIR/EBOOT.BIN.BAK")
        );
        assert_eq!(
            paths.patched,
            PathBuf::from("/game/NPUB30042/USRDIR/EBOOT.BIN.PATCHED")
        );
        assert_eq!(
            paths.decrypted,
            PathBuf::from("/game/NPUB30042/USRDIR/EBOOT.BIN.DEC")
        );
    }

    #[test]
    fn title_id_comes_from_the_layout() {
        let paths = EbootPaths::resolve(Path::new("/game/NPUB30042/USRDIR/EBOOT.BIN"));
        assert_eq!(paths.title_id.as_deref(), Some("NPUB30042"));
        assert_eq!(paths.transform_profile(), TransformProfile::Npdrm);
    }

    #[test]
    fn disc_titles_select_the_disc_profile() {
        let paths = EbootPaths::resolve(Path::new("/game/BLUS31156/USRDIR/EBOOT.BIN"));
        assert_eq!(paths.transform_profile(), TransformProfile::Disc);
    }

    #[test]
    fn bare_image_path_defaults_to_disc() {
        let paths = EbootPaths::resolve(Path::new("EBOOT.BIN"));
        assert_eq!(paths.title_id, None);
        assert_eq!(paths.transform_profile(), TransformProfile::Disc);
    }
}
