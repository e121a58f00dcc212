use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use semver::Version;

use crate::resolve::{bundled_runtime_bin, parse_reported_version, probe_version};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Materializes the pinned runtime version under `runtime_dir`, downloading
/// the dist archive from `dist_base` into `store_dir` first. Skips the
/// download when the currently bundled runtime already reports the pinned
/// version.
pub fn provision_runtime(
    version: &str,
    dist_base: &str,
    store_dir: &Path,
    runtime_dir: &Path,
) -> Result<PathBuf> {
    let pinned = parse_reported_version(version)
        .with_context(|| format!("invalid runtime pin '{version}'"))?;

    let bin = bundled_runtime_bin(runtime_dir);
    if let Ok(current) = probe_version(&bin) {
        if current == pinned {
            return Ok(bin);
        }
    }

    fs::create_dir_all(store_dir)
        .with_context(|| format!("failed to create {}", store_dir.display()))?;
    if cfg!(windows) {
        provision_windows(&pinned, dist_base, runtime_dir)?;
    } else {
        provision_unix(&pinned, dist_base, store_dir, runtime_dir)?;
    }
    Ok(bundled_runtime_bin(runtime_dir))
}

fn provision_unix(
    version: &Version,
    dist_base: &str,
    store_dir: &Path,
    runtime_dir: &Path,
) -> Result<()> {
    let archive_name = format!(
        "node-v{version}-{}-{}.tar.gz",
        dist_platform()?,
        dist_arch()?
    );
    let url = format!("{dist_base}/v{version}/{archive_name}");
    let archive_path = store_dir.join(archive_name);
    download_to(&url, &archive_path)?;

    if runtime_dir.exists() {
        fs::remove_dir_all(runtime_dir)
            .with_context(|| format!("failed to clear {}", runtime_dir.display()))?;
    }
    fs::create_dir_all(runtime_dir)
        .with_context(|| format!("failed to create {}", runtime_dir.display()))?;

    let extracted = run_command(
        Command::new("tar")
            .arg("-xzf")
            .arg(&archive_path)
            .arg("-C")
            .arg(runtime_dir)
            .arg("--strip-components=1"),
        "failed to extract runtime archive",
    );
    let _ = fs::remove_file(&archive_path);
    extracted
}

fn provision_windows(version: &Version, dist_base: &str, runtime_dir: &Path) -> Result<()> {
    let url = format!("{dist_base}/v{version}/win-{}/node.exe", dist_arch()?);
    fs::create_dir_all(runtime_dir)
        .with_context(|| format!("failed to create {}", runtime_dir.display()))?;
    download_to(&url, &runtime_dir.join("node.exe"))
}

fn dist_platform() -> Result<&'static str> {
    match std::env::consts::OS {
        "linux" => Ok("linux"),
        "macos" => Ok("darwin"),
        other => Err(anyhow!("no runtime dist builds for platform '{other}'")),
    }
}

fn dist_arch() -> Result<&'static str> {
    match std::env::consts::ARCH {
        "x86_64" => Ok("x64"),
        "aarch64" => Ok("arm64"),
        other => Err(anyhow!("no runtime dist builds for architecture '{other}'")),
    }
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

fn part_path_for(out_path: &Path) -> PathBuf {
    let mut os = OsString::from(out_path.as_os_str());
    os.push(".part");
    PathBuf::from(os)
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
