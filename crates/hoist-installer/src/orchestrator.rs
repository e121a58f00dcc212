use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use hoist_core::{read_core_manifest, CoreManifest, HomeLayout};

use crate::lock::InstallLock;
use crate::{InstallError, InstallRequest, InstallTarget, PackageInstaller};

#[derive(Debug)]
pub struct InstallOutcome {
    pub manifest: CoreManifest,
    pub warnings: Vec<String>,
}

/// Owns the lock lifecycle around a single core install attempt: acquire,
/// relocate the previous tree, run the package installer, re-read the
/// manifest, best-effort runtime provisioning, release.
pub struct Orchestrator<'a> {
    layout: &'a HomeLayout,
    registry: &'a str,
    installer: &'a dyn PackageInstaller,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        layout: &'a HomeLayout,
        registry: &'a str,
        installer: &'a dyn PackageInstaller,
    ) -> Self {
        Self {
            layout,
            registry,
            installer,
        }
    }

    /// Runs one install attempt. `provision_runtime` receives the manifest's
    /// runtime pin after a successful package install; its failures become
    /// warnings, never errors. `register_release` lets the caller wire the
    /// lock's cleanup into an interrupt hook before any destructive step.
    pub fn install<P, H>(
        &self,
        target: &InstallTarget,
        force: bool,
        mut provision_runtime: P,
        register_release: H,
    ) -> Result<InstallOutcome>
    where
        P: FnMut(&str) -> Result<()>,
        H: FnOnce(Box<dyn Fn() + Send + 'static>),
    {
        let lock_path = self.layout.lock_path();
        let manifest_path = self.layout.core_manifest_path(&target.name);
        let lock = InstallLock::acquire(&lock_path, &manifest_path, force)?;
        register_release(Box::new(lock.release_hook()));

        if let Err(source) = self.replace_package_tree(target) {
            lock.release();
            return Err(InstallError { source }.into());
        }

        // Fresh read: the installer owns the manifest's final shape, and a
        // missing file after a reported success reads as the empty record.
        let manifest = read_core_manifest(&manifest_path);

        let mut warnings = Vec::new();
        if let Some(pin) = manifest.runtime_pin.clone() {
            if let Err(err) = provision_runtime(&pin) {
                warnings.push(format!(
                    "runtime v{pin} provisioning failed, falling back to the system runtime: {err:#}"
                ));
            }
        }

        lock.mark_succeeded();
        lock.release();
        Ok(InstallOutcome { manifest, warnings })
    }

    fn replace_package_tree(&self, target: &InstallTarget) -> Result<()> {
        self.relocate_existing()?;
        self.installer.install(&InstallRequest {
            registry: self.registry.to_string(),
            root: self.layout.core_root(),
            pkgs: vec![target.clone()],
        })
    }

    /// Moves the previous package tree out of the way. The swap must not
    /// wait on recursive deletion, so the tree goes into a timestamped trash
    /// entry purged in the background; Windows deletes in place instead,
    /// where cross-volume renames are not dependable.
    fn relocate_existing(&self) -> Result<()> {
        let pkgs_dir = self.layout.pkgs_dir();
        if !pkgs_dir.exists() {
            return Ok(());
        }

        if cfg!(windows) {
            return fs::remove_dir_all(&pkgs_dir).with_context(|| {
                format!("failed to remove previous install: {}", pkgs_dir.display())
            });
        }

        let trash_dir = self.layout.trash_dir();
        fs::create_dir_all(&trash_dir)
            .with_context(|| format!("failed to create {}", trash_dir.display()))?;
        let trash_path = trash_dir.join(format!("core-{}", current_unix_timestamp_millis()));
        fs::rename(&pkgs_dir, &trash_path).with_context(|| {
            format!(
                "failed to move previous install to trash: {} -> {}",
                pkgs_dir.display(),
                trash_path.display()
            )
        })?;
        purge_in_background(trash_path);
        Ok(())
    }
}

fn current_unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}

/// Best-effort purge; a leftover trash entry is harmless and gets its own
/// timestamped sibling on the next swap.
fn purge_in_background(path: PathBuf) {
    thread::spawn(move || {
        let _ = fs::remove_dir_all(&path);
    });
}
