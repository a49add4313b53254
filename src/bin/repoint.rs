// CLASSIFICATION: COMMUNITY
// Filename: repoint.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-04-12

use clap::{Arg, ArgAction, ArgMatches, Command};
use repoint::{PatchJob, PatchState, ScetoolCli, ServerTarget};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

/// Builds the CLI argument parser for the repoint tool.
fn build_cli() -> Command {
    Command::new("repoint")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Repoints a title's EBOOT network endpoints at a replacement server")
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .value_name("PATH")
                .help("Path to the encrypted EBOOT.BIN")
                .required(true),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Replacement server URL")
                .required(true),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .value_name("NAME")
                .help("Replacement server display name")
                .default_value("custom"),
        )
        .arg(
            Arg::new("device-key")
                .short('k')
                .long("device-key")
                .value_name("HEX")
                .help("16-byte per-device key, hex encoded")
                .required(true),
        )
        .arg(
            Arg::new("patch-digest")
                .long("patch-digest")
                .action(ArgAction::SetTrue)
                .help("Also replace the embedded digest key"),
        )
        .arg(
            Arg::new("scetool")
                .long("scetool")
                .value_name("BIN")
                .help("scetool-compatible binary (default: $REPOINT_SCETOOL or scetool)"),
        )
        .arg(
            Arg::new("license-root")
                .long("license-root")
                .value_name("DIR")
                .help("Root of the per-user license stores"),
        )
}

fn required<'a>(matches: &'a ArgMatches, key: &str) -> &'a str {
    matches
        .get_one::<String>(key)
        .map(String::as_str)
        .unwrap_or_default()
}

fn parse_device_key(hex_key: &str) -> Result<[u8; 16], String> {
    let bytes =
        hex::decode(hex_key).map_err(|err| format!("device key is not valid hex: {err}"))?;
    <[u8; 16]>::try_from(bytes.as_slice())
        .map_err(|_| format!("device key must be 16 bytes, got {}", bytes.len()))
}

fn main() {
    env_logger::init();
    let matches = build_cli().get_matches();

    let image = PathBuf::from(required(&matches, "image"));
    let device_key = match parse_device_key(required(&matches, "device-key")) {
        Ok(key) => key,
        Err(err) => {
            eprintln!("[repoint] {err}");
            process::exit(2);
        }
    };
    let target = ServerTarget {
        name: required(&matches, "name").to_string(),
        url: required(&matches, "url").to_string(),
        patch_digest: matches.get_flag("patch-digest"),
    };

    let mut backend = ScetoolCli::from_env();
    if let Some(program) = matches.get_one::<String>("scetool") {
        backend = backend.with_program(program);
    }
    if let Some(root) = matches.get_one::<String>("license-root") {
        backend = backend.with_license_root(root);
    }

    println!("[repoint] Patching {}", image.display());
    let mut job = PatchJob::new();
    if let Err(err) = job.start(backend, &image, device_key, target) {
        eprintln!("[repoint] {err}");
        process::exit(1);
    }

    let mut last = PatchState::NotStarted;
    while job.is_running() {
        let status = job.poll_status();
        if status.state != last {
            println!("[repoint] {}", status.state);
            last = status.state;
        }
        thread::sleep(Duration::from_millis(200));
    }

    let done = job.join();
    match done.state {
        PatchState::Done => println!("[repoint] Done"),
        _ => {
            eprintln!(
                "[repoint] {}",
                done.last_error.as_deref().unwrap_or("patch job failed")
            );
            process::exit(1);
        }
    }
}
