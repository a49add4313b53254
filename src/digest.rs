// CLASSIFICATION: COMMUNITY
// Filename: digest.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-01-08

//! Digest-key validation.
//!
//! Titles that authenticate against the publisher's servers embed an
//! 18-character secret near the literal `"cookie"`. A run qualifies for
//! replacement only if every byte is drawn from the character set below.

/// Length of an embedded digest-key slot, excluding the terminator.
pub const DIGEST_LEN: usize = 18;

/// Fixed literal written over a located digest key.
pub const DIGEST_REPLACEMENT: &[u8] = b"CustomServerDigest";

const DIGEST_PUNCT: &[u8] = b"!@#$%^&*()?/<>~[]\\";

/// True iff every byte of `run` is ASCII alphanumeric or one of the
/// accepted punctuation characters. The empty run is valid.
pub fn valid_digest(run: &[u8]) -> bool {
    run.iter()
        .all(|&b| b.is_ascii_alphanumeric() || DIGEST_PUNCT.contains(&b))
}
