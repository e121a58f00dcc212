use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use hoist_core::Session;
use semver::Version;
use serde::Serialize;
use thiserror::Error;

use crate::resolve::{RuntimeChoice, RuntimeSource, SYSTEM_RUNTIME};

/// The handoff child could not be started at all. Distinct from the child
/// running and exiting nonzero, which is forwarded as an exit code instead.
#[derive(Debug, Error)]
#[error("failed to start runtime '{runtime}': {message}")]
pub struct SpawnError {
    pub runtime: String,
    pub message: String,
}

#[derive(Serialize)]
pub(crate) struct CoreConfig<'a> {
    pub(crate) home: &'a Path,
    pub(crate) registry: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) env: Option<&'a str>,
}

#[derive(Serialize)]
pub(crate) struct LauncherInfo<'a> {
    pub(crate) name: &'a str,
    pub(crate) version: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RuntimeInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system: Option<&'a Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) bundled: Option<&'a Version>,
    #[serde(rename = "use")]
    pub(crate) used: &'a str,
}

#[derive(Serialize)]
pub(crate) struct CoreOptions<'a> {
    pub(crate) launcher: LauncherInfo<'a>,
    pub(crate) argv: &'a [String],
    pub(crate) runtime: RuntimeInfo<'a>,
}

/// Hands the process over to the core package: builds the bootstrap
/// expression, runs it under the chosen runtime, and returns the child's
/// exit code for the launcher to forward verbatim.
pub fn launch(
    core_path: &Path,
    choice: &RuntimeChoice,
    session: &Session,
    launcher_name: &str,
    launcher_version: &str,
    raw_args: &[String],
) -> Result<i32> {
    let runtime: PathBuf = match (choice.source, choice.bundled_path.as_ref()) {
        (RuntimeSource::Bundled, Some(path)) => path.clone(),
        _ => PathBuf::from(SYSTEM_RUNTIME),
    };

    let mut argv = Vec::with_capacity(raw_args.len() + 1);
    argv.push(runtime.display().to_string());
    argv.extend(raw_args.iter().cloned());

    let config = CoreConfig {
        home: &session.home,
        registry: &session.registry,
        env: session.env_tag.as_deref(),
    };
    let options = CoreOptions {
        launcher: LauncherInfo {
            name: launcher_name,
            version: launcher_version,
        },
        argv: &argv,
        runtime: RuntimeInfo {
            system: choice.system_version.as_ref(),
            bundled: choice.bundled_version.as_ref(),
            used: choice.source.as_str(),
        },
    };
    let expression = bootstrap_expression(core_path, &config, &options)?;

    let mut command = Command::new(&runtime);
    command.arg("-e").arg(expression);
    if choice.source == RuntimeSource::Bundled {
        if let Some(bin_dir) = runtime.parent() {
            command.env("PATH", prepend_to_path(bin_dir)?);
        }
    }

    let status = command.status().map_err(|err| SpawnError {
        runtime: runtime.display().to_string(),
        message: err.to_string(),
    })?;
    Ok(exit_code(status))
}

pub(crate) fn bootstrap_expression(
    core_path: &Path,
    config: &CoreConfig<'_>,
    options: &CoreOptions<'_>,
) -> Result<String> {
    let core = serde_json::to_string(core_path.display().to_string().as_str())
        .context("failed to encode core path")?;
    let config = serde_json::to_string(config).context("failed to encode core config")?;
    let options = serde_json::to_string(options).context("failed to encode core options")?;
    Ok(format!("new (require({core}))({config}).start({options})"))
}

fn prepend_to_path(bin_dir: &Path) -> Result<OsString> {
    let mut entries = vec![bin_dir.to_path_buf()];
    if let Some(existing) = env::var_os("PATH") {
        entries.extend(env::split_paths(&existing));
    }
    env::join_paths(entries).context("failed to rebuild PATH for the bundled runtime")
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(1),
    }
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
