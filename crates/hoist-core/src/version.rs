use anyhow::Result;
use semver::Version;

use crate::manifest::CoreManifest;
use crate::store::StoreRecord;

/// Version token the external package installer resolves itself.
pub const LATEST_VERSION: &str = "latest";

/// Coarse classification of an upgrade. `Incompatible` upgrades need the
/// user's confirmation before they are applied; `Compatible` upgrades are
/// applied silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDelta {
    None,
    Compatible,
    Incompatible,
}

/// Classifies the jump from `installed` to `target`. Anything that is not
/// strictly newer is `None`. A changed major component (which covers premajor
/// versions as well, since those already carry the new major) is
/// incompatible; minor and patch bumps are compatible.
pub fn classify_delta(installed: &Version, target: &Version) -> VersionDelta {
    if target <= installed {
        return VersionDelta::None;
    }
    if target.major != installed.major {
        return VersionDelta::Incompatible;
    }
    VersionDelta::Compatible
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub is_prerelease: bool,
}

/// Decides which core version should be on disk.
///
/// Precedence: a local store entry wins outright (it is an already-synced
/// source of truth), then a single best-effort registry lookup when an
/// installed record exists, then the installed version itself, then the
/// `latest` sentinel for a first install. Resolution never fails; a fully
/// offline launch of an installed core must still work.
pub fn resolve_target_version<F>(
    installed: &CoreManifest,
    package_name: &str,
    store: Option<&StoreRecord>,
    lookup_latest: F,
) -> ResolvedVersion
where
    F: FnOnce() -> Result<String>,
{
    let mut version = installed.version.as_ref().map(Version::to_string);
    let mut is_prerelease = false;

    match store.and_then(|record| record.mods.get(package_name)) {
        Some(entry) => {
            if let Some(pinned) = valid_version(entry.version.as_deref()) {
                version = Some(pinned);
            }
            if entry.is_next {
                if let Some(next) = valid_version(entry.next_version.as_deref()) {
                    version = Some(next);
                    is_prerelease = true;
                }
            }
        }
        None => {
            // Update checks only; a first run goes straight to "latest" and
            // a lookup failure keeps whatever is installed.
            if installed.is_installed() {
                if let Ok(reported) = lookup_latest() {
                    if let Some(latest) = valid_version(Some(&reported)) {
                        version = Some(latest);
                    }
                }
            }
        }
    }

    ResolvedVersion {
        version: version.unwrap_or_else(|| LATEST_VERSION.to_string()),
        is_prerelease,
    }
}

fn valid_version(candidate: Option<&str>) -> Option<String> {
    let candidate = candidate?;
    Version::parse(candidate).ok().map(|_| candidate.to_string())
}
