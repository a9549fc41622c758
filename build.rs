// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=FOOTSCAN_VERSION");

    // Packagers set the version explicitly
    let version = std::env::var("FOOTSCAN_VERSION").unwrap_or_else(|_| describe_version());
    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "0.2.0-abcdef1" on a tag, "0.2.0-dirty-abcdef1" after it, the bare hash
/// without tags
fn describe_version() -> String {
    let Some(describe) = git(&["describe", "--tags", "--always", "--match", "v*"]) else {
        return env!("CARGO_PKG_VERSION").to_string();
    };
    let describe = describe.strip_prefix('v').unwrap_or(&describe).to_string();

    let parts: Vec<&str> = describe.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [hash, _commits, base] => {
            format!("{}-dirty-{}", base, hash.strip_prefix('g').unwrap_or(hash))
        }
        _ => match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) if hash != describe => format!("{}-{}", describe, hash),
            _ => describe,
        },
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
