use std::process::Command;

/// Run a git command and return its trimmed stdout, if git is available.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    // Stamp the binary so the startup banner identifies exactly what is running
    if let Some(hash) = git(&["rev-parse", "--short", "HEAD"]) {
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }

    println!("cargo:rustc-env=BUILD_TIME={}", chrono::Utc::now().to_rfc3339());
    println!("cargo:rerun-if-changed=build.rs");
}
