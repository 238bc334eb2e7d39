use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let version = describe_release().unwrap_or_else(|| {
        let package = env::var("CARGO_PKG_VERSION").unwrap_or_default();
        format!("{}+unreleased", package)
    });

    println!("cargo:rustc-env=UKCOMPANIES_VERSION={}", version);
}

/// Version from the nearest `v*` release tag, e.g. `v1.2.0-3-gabc1234` gives
/// `1.2.0-3-gabc1234`. Untagged checkouts and missing git give `None`.
fn describe_release() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--match", "v*", "--dirty=+dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let version = described.trim().trim_start_matches('v');
    (!version.is_empty()).then(|| version.to_string())
}
