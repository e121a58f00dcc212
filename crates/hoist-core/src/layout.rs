use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Fixed on-disk layout under the install home. Every path the launcher
/// touches is derived here so the installer, runtime, and CLI crates agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeLayout {
    home: PathBuf,
}

impl HomeLayout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn core_root(&self) -> PathBuf {
        self.home.join(".core")
    }

    pub fn pkgs_dir(&self) -> PathBuf {
        package_root(&self.core_root())
    }

    pub fn core_dir(&self, name: &str) -> PathBuf {
        package_dir(&self.core_root(), name)
    }

    pub fn core_manifest_path(&self, name: &str) -> PathBuf {
        self.core_dir(name).join("package.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.core_root().join(".lock")
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.home.join(".trash")
    }

    pub fn store_path(&self) -> PathBuf {
        self.home.join("store.json")
    }

    pub fn runtime_store_dir(&self) -> PathBuf {
        self.home.join(".runtime")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_store_dir().join("current")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.home.clone(),
            self.core_root(),
            self.trash_dir(),
            self.runtime_store_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn package_root(core_root: &Path) -> PathBuf {
    core_root.join("pkgs")
}

pub fn package_dir(core_root: &Path, name: &str) -> PathBuf {
    package_root(core_root).join(name)
}
