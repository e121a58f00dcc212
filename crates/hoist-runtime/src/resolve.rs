use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use hoist_core::RuntimeMode;
use semver::Version;

pub(crate) const SYSTEM_RUNTIME: &str = "node";

/// Which runtime binary a launch will use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSource {
    Bundled,
    System,
}

impl RuntimeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeSource::Bundled => "bundled",
            RuntimeSource::System => "system",
        }
    }
}

/// Outcome of runtime selection. Both versions are carried so the handoff
/// payload can report what the bundled and system runtimes answered, not
/// just which one won; `bundled_path`/`bundled_version` are populated only
/// when a usable bundled runtime was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeChoice {
    pub source: RuntimeSource,
    pub bundled_path: Option<PathBuf>,
    pub bundled_version: Option<Version>,
    pub system_version: Option<Version>,
}

impl RuntimeChoice {
    fn system(system_version: Option<Version>) -> Self {
        Self {
            source: RuntimeSource::System,
            bundled_path: None,
            bundled_version: None,
            system_version,
        }
    }
}

pub fn bundled_runtime_bin(runtime_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        runtime_dir.join("node.exe")
    } else {
        runtime_dir.join("bin").join("node")
    }
}

/// Picks the runtime for this launch. A bundled runtime wins when it exists
/// and answers a version probe; anything else, including an explicit system
/// override, falls back to whatever `node` resolves to on PATH.
pub fn resolve_runtime(runtime_dir: &Path, mode: RuntimeMode) -> RuntimeChoice {
    let system_version = probe_version(Path::new(SYSTEM_RUNTIME)).ok();
    if mode == RuntimeMode::System {
        return RuntimeChoice::system(system_version);
    }

    let bin = bundled_runtime_bin(runtime_dir);
    if !bin.exists() {
        return RuntimeChoice::system(system_version);
    }
    match probe_version(&bin) {
        Ok(version) => RuntimeChoice {
            source: RuntimeSource::Bundled,
            bundled_path: Some(bin),
            bundled_version: Some(version),
            system_version,
        },
        Err(_) => RuntimeChoice::system(system_version),
    }
}

/// Asks a runtime binary for its version (`node -v` prints e.g. `v20.11.1`).
pub(crate) fn probe_version(bin: &Path) -> Result<Version> {
    let output = Command::new(bin)
        .arg("-v")
        .output()
        .with_context(|| format!("failed to run {}", bin.display()))?;
    if !output.status.success() {
        return Err(anyhow!(
            "runtime version probe failed: status={}",
            output.status
        ));
    }
    let reported = String::from_utf8_lossy(&output.stdout);
    parse_reported_version(&reported)
}

pub(crate) fn parse_reported_version(reported: &str) -> Result<Version> {
    let trimmed = reported.trim().trim_start_matches('v');
    Version::parse(trimmed)
        .with_context(|| format!("runtime reported an unparseable version: '{}'", reported.trim()))
}
