use std::env;
use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";
const SHORT_COMMIT_LEN: usize = 7;

/// Provenance baked into `aqualink --version`.
struct BuildInfo {
    commit: Option<String>,
    date: Option<String>,
}

impl BuildInfo {
    /// CI exports the commit; local builds ask git.
    fn detect() -> Self {
        let commit = non_empty(env::var("GITHUB_SHA").ok()).or_else(|| git(&["rev-parse", "HEAD"]));
        let date = git(&["log", "-1", "--format=%cI"]);
        Self { commit, date }
    }

    fn short_commit(&self) -> &str {
        match self.commit.as_deref() {
            Some(full) => full.get(..SHORT_COMMIT_LEN).unwrap_or(full),
            None => UNKNOWN,
        }
    }

    fn emit(&self) {
        let full = self.commit.as_deref().unwrap_or(UNKNOWN);
        let date = self.date.as_deref().unwrap_or(UNKNOWN);
        for (key, value) in [
            ("AQUALINK_BUILD_COMMIT", self.short_commit()),
            ("AQUALINK_BUILD_COMMIT_FULL", full),
            ("AQUALINK_BUILD_DATE", date),
        ] {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
    let head = Path::new("../../.git/HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    BuildInfo::detect().emit();
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    non_empty(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
