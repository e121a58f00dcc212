use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Locally synced version pins, written by an external updater. Read-only
/// input to version resolution; authoritative over a live registry lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreRecord {
    #[serde(default)]
    pub mods: BTreeMap<String, StoreModule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreModule {
    pub version: Option<String>,
    #[serde(default)]
    pub is_next: bool,
    pub next_version: Option<String>,
}

pub fn read_store(path: &Path) -> Option<StoreRecord> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
