use std::env;
use std::process::Command;

/// Run a command and return its trimmed stdout, if it succeeded
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    Some(stdout.trim().to_string())
}

fn emit(name: &str, value: &str) {
    println!("cargo:rustc-env={}={}", name, value);
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    emit(
        "BUILD_PROFILE",
        &env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
    );

    // CI_BUILD_REF > git describe > crate version
    let version = env::var("CI_BUILD_REF")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| command_output("git", &["describe", "--always", "--dirty", "--long", "--tags"]))
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".to_string());
    emit("REPO_VERSION", &version);

    emit("BUILD_TIMESTAMP", &chrono::Utc::now().to_rfc3339());
    emit(
        "RUST_VERSION",
        &command_output("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string()),
    );
    emit(
        "BUILD_TARGET",
        &env::var("TARGET").unwrap_or_else(|_| "unknown".to_string()),
    );
}
