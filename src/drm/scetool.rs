// CLASSIFICATION: COMMUNITY
// Filename: scetool.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-03-18

//! [`DrmBackend`] over an external scetool-compatible executable.
//!
//! The binary is looked up from `REPOINT_SCETOOL` (default `scetool`);
//! licenses are resolved by walking the per-user stores under
//! `REPOINT_LICENSE_ROOT`. Installed state is forwarded to every
//! transform invocation as command-line flags.

use super::{
    content_id_display, content_id_from_bytes, ContentId, DrmBackend, DrmError, TransformProfile,
};
use crate::license;
use log::{debug, info};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment override for the transform binary.
pub const PROGRAM_ENV: &str = "REPOINT_SCETOOL";
/// Environment override for the root of the per-user license stores.
pub const LICENSE_ROOT_ENV: &str = "REPOINT_LICENSE_ROOT";

const DEFAULT_PROGRAM: &str = "scetool";
const DEFAULT_LICENSE_ROOT: &str = "/dev_hdd0/home";

pub struct ScetoolCli {
    program: PathBuf,
    license_root: PathBuf,
    profile: TransformProfile,
    device_key: Option<[u8; 16]>,
    content_id: Option<ContentId>,
    license_dir: Option<PathBuf>,
}

impl ScetoolCli {
    /// Build a backend from the environment, falling back to the
    /// defaults above.
    pub fn from_env() -> Self {
        Self {
            program: env::var_os(PROGRAM_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
            license_root: env::var_os(LICENSE_ROOT_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LICENSE_ROOT)),
            profile: TransformProfile::Disc,
            device_key: None,
            content_id: None,
            license_dir: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_license_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.license_root = root.into();
        self
    }

    /// Flags carrying the installed state into every invocation.
    fn common_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--profile".into()];
        args.push(
            match self.profile {
                TransformProfile::Npdrm => "npdrm",
                TransformProfile::Disc => "disc",
            }
            .into(),
        );
        if let Some(key) = &self.device_key {
            args.push("--device-key".into());
            args.push(hex::encode(key).into());
        }
        if let Some(id) = &self.content_id {
            args.push("--content-id".into());
            args.push(content_id_display(id).into());
        }
        if let Some(dir) = &self.license_dir {
            args.push("--license-dir".into());
            args.push(dir.clone().into_os_string());
        }
        args
    }

    fn run(&self, op: &'static str, extra: Vec<OsString>) -> Result<Vec<u8>, DrmError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.common_args()).args(extra);
        debug!("scetool {op}: {cmd:?}");
        let output = cmd.output().map_err(|source| DrmError::Launch {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(DrmError::Tool {
                op,
                status: output.status,
            });
        }
        Ok(output.stdout)
    }
}

impl DrmBackend for ScetoolCli {
    fn set_transform_profile(&mut self, profile: TransformProfile) {
        self.profile = profile;
    }

    fn set_device_key(&mut self, key: [u8; 16]) {
        self.device_key = Some(key);
    }

    fn extract_content_id(&mut self, image: &Path) -> Result<ContentId, DrmError> {
        let stdout = self.run(
            "print-content-id",
            vec!["--print-content-id".into(), image.as_os_str().to_os_string()],
        )?;
        let line: Vec<u8> = stdout
            .iter()
            .copied()
            .take_while(|b| !b.is_ascii_whitespace())
            .collect();
        if line.is_empty() {
            return Err(DrmError::ContentIdUnavailable);
        }
        let id = content_id_from_bytes(&line);
        self.content_id = Some(id);
        Ok(id)
    }

    fn resolve_license(&mut self, content_id: &ContentId) -> Result<PathBuf, DrmError> {
        let dir = license::find_license_from_users(&self.license_root, content_id)
            .ok_or(DrmError::LicenseNotFound)?;
        info!("Using license directory {}", dir.display());
        self.license_dir = Some(dir.clone());
        Ok(dir)
    }

    fn decrypt(&mut self, input: &Path, output: &Path) -> Result<(), DrmError> {
        self.run(
            "decrypt",
            vec![
                "--decrypt".into(),
                input.as_os_str().to_os_string(),
                output.as_os_str().to_os_string(),
            ],
        )
        .map(|_| ())
    }

    fn encrypt(&mut self, input: &Path, output: &Path) -> Result<(), DrmError> {
        self.run(
            "encrypt",
            vec![
                "--encrypt".into(),
                input.as_os_str().to_os_string(),
                output.as_os_str().to_os_string(),
            ],
        )
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn backend() -> ScetoolCli {
        ScetoolCli::from_env()
            .with_program("/tmp/sce")
            .with_license_root("/tmp/home")
    }

    #[test]
    fn common_args_carry_installed_state() {
        let mut cli = backend();
        cli.set_transform_profile(TransformProfile::Npdrm);
        cli.set_device_key([0xAB; 16]);
        let args = cli.common_args();
        assert_eq!(args[0], OsString::from("--profile"));
        assert_eq!(args[1], OsString::from("npdrm"));
        assert_eq!(args[2], OsString::from("--device-key"));
        assert_eq!(args[3], OsString::from("ab".repeat(16)));
    }

    #[test]
    fn bare_backend_only_names_the_profile() {
        let cli = backend();
        assert_eq!(
            cli.common_args(),
            vec![OsString::from("--profile"), OsString::from("disc")]
        );
    }

    #[test]
    #[serial]
    fn environment_overrides_the_program() {
        env::set_var(PROGRAM_ENV, "/opt/bin/scetool");
        let cli = ScetoolCli::from_env();
        assert_eq!(cli.program, PathBuf::from("/opt/bin/scetool"));
        env::remove_var(PROGRAM_ENV);
    }
}
