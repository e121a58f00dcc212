use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use hoist_core::{
    classify_delta, read_core_manifest, read_store, resolve_target_version, HomeLayout,
    ResolvedVersion, Session, VersionDelta, CORE_PACKAGE_NAME, LATEST_VERSION,
};
use hoist_installer::{latest_version, InstallTarget, Orchestrator, TarballInstaller};
use hoist_runtime::{launch, provision_runtime, resolve_runtime};
use semver::Version;

use crate::interrupt::InterruptHooks;
use crate::render::{self, current_output_style, OutputStyle};
use crate::Cli;

const LAUNCHER_NAME: &str = "hoist";
const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run(cli: &Cli) -> Result<i32> {
    ensure_not_root()?;

    let session = Session::from_env()?;
    let layout = HomeLayout::new(session.home.clone());
    layout.ensure_base_dirs()?;

    let style = current_output_style();
    let hooks = InterruptHooks::new();
    if let Err(err) = hooks.install_handler() {
        render::print_warning(style, &format!("{err:#}"));
    }

    let core_path = prepare(&session, &layout, style, &hooks, cli.force, confirm_on_stdin)?;
    let choice = resolve_runtime(&layout.runtime_dir(), session.runtime_mode);
    launch(
        &core_path,
        &choice,
        &session,
        LAUNCHER_NAME,
        LAUNCHER_VERSION,
        &cli.args,
    )
}

/// Makes sure a usable core package is on disk and returns its path. The
/// update check is best-effort; an installed core always launches even when
/// the registry is unreachable. The confirmation prompt is injected so the
/// decline path is testable without a terminal.
pub(crate) fn prepare<C>(
    session: &Session,
    layout: &HomeLayout,
    style: OutputStyle,
    hooks: &InterruptHooks,
    force: bool,
    mut confirm: C,
) -> Result<PathBuf>
where
    C: FnMut(&str) -> Result<bool>,
{
    if let Some(override_path) = &session.core_path_override {
        return Ok(override_path.clone());
    }

    let core_path = layout.core_dir(CORE_PACKAGE_NAME);
    let manifest = read_core_manifest(&layout.core_manifest_path(CORE_PACKAGE_NAME));
    let store = read_store(&layout.store_path());
    let resolved = resolve_target_version(&manifest, CORE_PACKAGE_NAME, store.as_ref(), || {
        latest_version(&session.registry, CORE_PACKAGE_NAME)
    });

    let installed = match installed_version(&manifest) {
        None => {
            render::print_status(
                style,
                "..",
                &format!("installing core {}", describe_version(&resolved)),
            );
            run_install(session, layout, style, hooks, &resolved, force)?;
            return Ok(core_path);
        }
        Some(version) => version.clone(),
    };

    let target = match Version::parse(&resolved.version) {
        Ok(target) => target,
        // "latest" or another non-semver token; nothing to compare against.
        Err(_) => return Ok(core_path),
    };

    match classify_delta(&installed, &target) {
        VersionDelta::None => {}
        VersionDelta::Compatible => {
            render::print_status(
                style,
                "..",
                &format!("updating core {installed} -> {}", describe_version(&resolved)),
            );
            run_install(session, layout, style, hooks, &resolved, force)?;
        }
        VersionDelta::Incompatible => {
            let prompt = format!(
                "core {target} is available (installed: {installed}); this is a breaking upgrade. Continue? [Y/n] "
            );
            if confirm(&prompt)? {
                run_install(session, layout, style, hooks, &resolved, force)?;
            }
        }
    }
    Ok(core_path)
}

fn run_install(
    session: &Session,
    layout: &HomeLayout,
    style: OutputStyle,
    hooks: &InterruptHooks,
    resolved: &ResolvedVersion,
    force: bool,
) -> Result<()> {
    let installer = TarballInstaller;
    let orchestrator = Orchestrator::new(layout, &session.registry, &installer);
    let target = InstallTarget {
        name: CORE_PACKAGE_NAME.to_string(),
        requested_version: resolved.version.clone(),
    };

    hooks.set_exit_on_interrupt(true);
    let outcome = orchestrator.install(
        &target,
        force,
        |pin| {
            provision_runtime(
                pin,
                &session.runtime_dist,
                &layout.runtime_store_dir(),
                &layout.runtime_dir(),
            )
            .map(|_| ())
        },
        |release| hooks.register(release),
    );
    hooks.set_exit_on_interrupt(false);
    let outcome = outcome?;

    for warning in &outcome.warnings {
        render::print_warning(style, warning);
    }
    let version = outcome
        .manifest
        .version
        .as_ref()
        .map(Version::to_string)
        .unwrap_or_else(|| resolved.version.clone());
    render::print_status(style, "ok", &format!("core {version} ready"));
    Ok(())
}

/// A record missing either name or version is not an install; it takes the
/// first-install path and never prompts.
pub(crate) fn installed_version(manifest: &hoist_core::CoreManifest) -> Option<&Version> {
    if manifest.is_installed() {
        manifest.version.as_ref()
    } else {
        None
    }
}

pub(crate) fn describe_version(resolved: &ResolvedVersion) -> String {
    if resolved.version == LATEST_VERSION {
        return "(latest)".to_string();
    }
    if resolved.is_prerelease {
        return format!("{} (pre-release)", resolved.version);
    }
    resolved.version.clone()
}

fn confirm_on_stdin(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush().context("failed to flush prompt")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(parse_confirmation(&answer))
}

pub(crate) fn parse_confirmation(answer: &str) -> bool {
    let normalized = answer.trim().to_ascii_lowercase();
    normalized.is_empty() || normalized == "y" || normalized == "yes"
}

/// Running the launcher as root corrupts per-user install homes; refuse
/// unless explicitly allowed.
fn ensure_not_root() -> Result<()> {
    if env::var_os("HOIST_ALLOW_ROOT").is_some() {
        return Ok(());
    }
    if running_as_root() {
        return Err(anyhow!(
            "refusing to run as root; set HOIST_ALLOW_ROOT=1 to override"
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn running_as_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .map(|output| String::from_utf8_lossy(&output.stdout).trim() == "0")
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}
