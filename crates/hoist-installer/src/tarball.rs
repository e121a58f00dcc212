use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use hoist_core::{package_dir, LATEST_VERSION};

use crate::registry::latest_version;
use crate::{InstallRequest, PackageInstaller};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default package installer: fetches the registry tarball for each package
/// and unpacks it under `<root>/pkgs/<name>`, stripping the archive's
/// top-level directory. `latest` is resolved through the registry before the
/// download.
#[derive(Debug, Default)]
pub struct TarballInstaller;

impl PackageInstaller for TarballInstaller {
    fn install(&self, request: &InstallRequest) -> Result<()> {
        for target in &request.pkgs {
            let version = if target.requested_version == LATEST_VERSION {
                latest_version(&request.registry, &target.name)?
            } else {
                target.requested_version.clone()
            };
            install_one(request, &target.name, &version)?;
        }
        Ok(())
    }
}

fn install_one(request: &InstallRequest, name: &str, version: &str) -> Result<()> {
    let url = tarball_url(&request.registry, name, version);
    let dst = package_dir(&request.root, name);
    fs::create_dir_all(&dst).with_context(|| format!("failed to create {}", dst.display()))?;

    let archive_path = request.root.join(format!("{name}-{version}.tgz"));
    download_to(&url, &archive_path)?;
    let extracted = extract_tarball(&archive_path, &dst);
    let _ = fs::remove_file(&archive_path);
    extracted
}

pub(crate) fn tarball_url(registry: &str, name: &str, version: &str) -> String {
    format!(
        "{}/{name}/-/{name}-{version}.tgz",
        registry.trim_end_matches('/')
    )
}

fn download_to(url: &str, out_path: &Path) -> Result<()> {
    let part_path = part_path_for(out_path);
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("failed to build download http client")?;

    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("download failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("download rejected: {url}"))?;

    let mut file = fs::File::create(&part_path)
        .with_context(|| format!("failed to create {}", part_path.display()))?;
    io::copy(&mut response, &mut file)
        .with_context(|| format!("failed writing download to {}", part_path.display()))?;
    fs::rename(&part_path, out_path).with_context(|| {
        format!(
            "failed to move downloaded artifact into place: {}",
            out_path.display()
        )
    })?;
    Ok(())
}

pub(crate) fn part_path_for(out_path: &Path) -> PathBuf {
    let mut os = OsString::from(out_path.as_os_str());
    os.push(".part");
    PathBuf::from(os)
}

fn extract_tarball(archive_path: &Path, dst: &Path) -> Result<()> {
    run_command(
        Command::new("tar")
            .arg("-xzf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst)
            .arg("--strip-components=1"),
        "failed to extract package tarball",
    )
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}
