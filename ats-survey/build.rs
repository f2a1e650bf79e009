//! Build script for ats-survey
//!
//! Exposes build identification to the crate as compile-time env vars:
//! `GIT_HASH`, `BUILD_TIMESTAMP`, `BUILD_PROFILE`.

use std::process::Command;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}

fn main() {
    let git_hash = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let build_timestamp =
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);

    // No rerun-if-changed: rerun on every build so the hash stays current
}
