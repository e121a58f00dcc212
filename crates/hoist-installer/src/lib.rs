mod lock;
mod orchestrator;
mod registry;
mod tarball;

pub use lock::{InstallLock, LockHeld};
pub use orchestrator::{InstallOutcome, Orchestrator};
pub use registry::latest_version;
pub use tarball::TarballInstaller;

use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;

/// One package to install; immutable for the duration of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub name: String,
    pub requested_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub registry: String,
    pub root: PathBuf,
    pub pkgs: Vec<InstallTarget>,
}

/// The package installer proper is a collaborator: it receives a registry,
/// a target root, and a package list, and must accept `latest` as a version
/// token. The orchestrator only cares that it either materializes the
/// packages under the root or fails.
pub trait PackageInstaller {
    fn install(&self, request: &InstallRequest) -> Result<()>;
}

/// Wrapper for failures of the external installer; the attempt has already
/// been rolled back (lock released, partial manifest removed) by the time a
/// caller sees this.
#[derive(Debug, Error)]
#[error("core package install failed")]
pub struct InstallError {
    #[source]
    pub source: anyhow::Error,
}
