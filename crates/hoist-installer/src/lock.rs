use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("install lock is held: {path}")]
pub struct LockHeld {
    pub path: PathBuf,
}

#[derive(Debug)]
struct LockState {
    lock_path: PathBuf,
    manifest_path: PathBuf,
    cleared: AtomicBool,
    succeeded: AtomicBool,
}

impl LockState {
    fn clear(&self) {
        if self.cleared.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(err) = fs::remove_file(&self.lock_path) {
            if err.kind() != io::ErrorKind::NotFound {
                eprintln!(
                    "failed to remove install lock {}: {err}",
                    self.lock_path.display()
                );
            }
        }

        if !self.succeeded.load(Ordering::SeqCst) {
            // A half-written manifest must not pass for a valid install on
            // the next run.
            if let Err(err) = fs::remove_file(&self.manifest_path) {
                if err.kind() != io::ErrorKind::NotFound {
                    eprintln!(
                        "failed to remove partial manifest {}: {err}",
                        self.manifest_path.display()
                    );
                }
            }
        }
    }
}

/// Advisory exclusive-install guard over a core root. The sentinel file is
/// created with `create_new`, so contention is detected atomically; release
/// runs at most once no matter how many paths reach it (normal return, drop,
/// or an interrupt hook), and never fails.
#[derive(Debug)]
pub struct InstallLock {
    state: Arc<LockState>,
}

impl InstallLock {
    pub fn acquire(lock_path: &Path, manifest_path: &Path, force: bool) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        if force {
            let _ = fs::remove_file(lock_path);
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LockHeld {
                    path: lock_path.to_path_buf(),
                }
                .into());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to create install lock: {}", lock_path.display())
                });
            }
        }

        Ok(Self {
            state: Arc::new(LockState {
                lock_path: lock_path.to_path_buf(),
                manifest_path: manifest_path.to_path_buf(),
                cleared: AtomicBool::new(false),
                succeeded: AtomicBool::new(false),
            }),
        })
    }

    /// Keeps the manifest in place when the lock is cleared.
    pub fn mark_succeeded(&self) {
        self.state.succeeded.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.state.clear();
    }

    /// Cleanup closure for a process-exit or interrupt hook; shares the
    /// single-shot guard with the normal release path.
    pub fn release_hook(&self) -> impl Fn() + Send + 'static {
        let state = Arc::clone(&self.state);
        move || state.clear()
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        self.state.clear();
    }
}
