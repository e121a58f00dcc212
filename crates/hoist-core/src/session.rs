use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub const CORE_PACKAGE_NAME: &str = "hoist-core";
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
pub const DEFAULT_RUNTIME_DIST: &str = "https://nodejs.org/dist";

/// Which runtime the launcher should prefer at handoff time. `System` is an
/// explicit operator override; `Bundled` still falls back to the system
/// runtime when no usable bundled binary exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Bundled,
    System,
}

impl RuntimeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bundled => "bundled",
            Self::System => "system",
        }
    }

    fn from_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("system") {
            Self::System
        } else {
            Self::Bundled
        }
    }
}

/// Per-invocation configuration, resolved once from the environment and then
/// passed by value; nothing in the launcher reads env vars after this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub home: PathBuf,
    pub registry: String,
    pub env_tag: Option<String>,
    pub runtime_mode: RuntimeMode,
    pub runtime_dist: String,
    pub core_path_override: Option<PathBuf>,
}

impl Session {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = match present(lookup("HOIST_HOME")) {
            Some(value) => PathBuf::from(value),
            None => default_home(&lookup)?,
        };
        let registry = present(lookup("HOIST_REGISTRY"))
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        let env_tag = present(lookup("HOIST_ENV"));
        let runtime_mode = present(lookup("HOIST_RUNTIME_USED"))
            .map(|value| RuntimeMode::from_value(&value))
            .unwrap_or(RuntimeMode::Bundled);
        let runtime_dist = present(lookup("HOIST_RUNTIME_DIST"))
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_RUNTIME_DIST.to_string());
        let core_path_override = present(lookup("HOIST_CORE_PATH")).map(PathBuf::from);

        Ok(Self {
            home,
            registry,
            env_tag,
            runtime_mode,
            runtime_dist,
            core_path_override,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn default_home<F>(lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if cfg!(windows) {
        let app_data = present(lookup("LOCALAPPDATA"))
            .context("LOCALAPPDATA is not set; cannot resolve install home")?;
        return Ok(PathBuf::from(app_data).join("Hoist"));
    }

    let home =
        present(lookup("HOME")).context("HOME is not set; cannot resolve install home")?;
    Ok(PathBuf::from(home).join(".hoist"))
}
