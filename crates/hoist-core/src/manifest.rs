use std::fs;
use std::path::Path;

use semver::Version;
use serde::Deserialize;

/// Metadata of the installed core package. An empty record means "not yet
/// installed"; a record is only considered installed when both name and
/// version are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreManifest {
    pub name: Option<String>,
    pub version: Option<Version>,
    pub runtime_pin: Option<String>,
}

impl CoreManifest {
    pub fn is_installed(&self) -> bool {
        self.name.is_some() && self.version.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    hoist: RawHoistSection,
}

#[derive(Debug, Default, Deserialize)]
struct RawHoistSection {
    runtime: Option<String>,
}

/// Reads the core manifest fresh from disk. Missing files, unreadable files,
/// and malformed bodies all read as the empty record; the manifest's shape is
/// owned by the package installer, not by the launcher.
pub fn read_core_manifest(path: &Path) -> CoreManifest {
    let Ok(raw) = fs::read_to_string(path) else {
        return CoreManifest::default();
    };
    let Ok(parsed) = serde_json::from_str::<RawManifest>(&raw) else {
        return CoreManifest::default();
    };

    CoreManifest {
        name: parsed.name,
        version: parsed
            .version
            .as_deref()
            .and_then(|value| Version::parse(value).ok()),
        runtime_pin: parsed.hoist.runtime,
    }
}
