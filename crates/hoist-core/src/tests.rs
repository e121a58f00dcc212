use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use semver::Version;

use super::*;

static TEST_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn test_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "hoist-core-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create test dir");
    path
}

fn version(value: &str) -> Version {
    Version::parse(value).expect("must parse version")
}

fn installed_manifest(name: &str, value: &str) -> CoreManifest {
    CoreManifest {
        name: Some(name.to_string()),
        version: Some(version(value)),
        runtime_pin: None,
    }
}

fn store_with(name: &str, module: StoreModule) -> StoreRecord {
    let mut mods = BTreeMap::new();
    mods.insert(name.to_string(), module);
    StoreRecord { mods }
}

#[test]
fn minor_bump_is_compatible() {
    assert_eq!(
        classify_delta(&version("1.1.0"), &version("1.2.0")),
        VersionDelta::Compatible
    );
}

#[test]
fn patch_bump_is_compatible() {
    assert_eq!(
        classify_delta(&version("1.2.3"), &version("1.2.4")),
        VersionDelta::Compatible
    );
}

#[test]
fn major_bump_is_incompatible() {
    assert_eq!(
        classify_delta(&version("1.9.9"), &version("2.0.0")),
        VersionDelta::Incompatible
    );
}

#[test]
fn premajor_bump_is_incompatible() {
    assert_eq!(
        classify_delta(&version("1.9.9"), &version("2.0.0-beta.1")),
        VersionDelta::Incompatible
    );
}

#[test]
fn equal_versions_are_no_delta() {
    assert_eq!(
        classify_delta(&version("1.2.3"), &version("1.2.3")),
        VersionDelta::None
    );
}

#[test]
fn downgrade_is_no_delta() {
    assert_eq!(
        classify_delta(&version("1.2.3"), &version("1.1.9")),
        VersionDelta::None
    );
}

#[test]
fn store_entry_overrides_registry_lookup() {
    let installed = installed_manifest("pkg-x", "1.0.0");
    let store = store_with(
        "pkg-x",
        StoreModule {
            version: Some("3.0.0".to_string()),
            is_next: false,
            next_version: None,
        },
    );

    let resolved = resolve_target_version(&installed, "pkg-x", Some(&store), || {
        panic!("registry lookup must not run when the store has an entry")
    });
    assert_eq!(resolved.version, "3.0.0");
    assert!(!resolved.is_prerelease);
}

#[test]
fn store_next_channel_wins_and_flags_prerelease() {
    let installed = installed_manifest("pkg-x", "1.0.0");
    let store = store_with(
        "pkg-x",
        StoreModule {
            version: Some("2.0.0".to_string()),
            is_next: true,
            next_version: Some("3.0.0-beta.2".to_string()),
        },
    );

    let resolved =
        resolve_target_version(&installed, "pkg-x", Some(&store), || Ok("9.9.9".to_string()));
    assert_eq!(resolved.version, "3.0.0-beta.2");
    assert!(resolved.is_prerelease);
}

#[test]
fn invalid_store_version_is_ignored() {
    let installed = installed_manifest("pkg-x", "1.0.0");
    let store = store_with(
        "pkg-x",
        StoreModule {
            version: Some("not-a-version".to_string()),
            is_next: false,
            next_version: None,
        },
    );

    let resolved = resolve_target_version(&installed, "pkg-x", Some(&store), || {
        panic!("store entry present, lookup must not run")
    });
    assert_eq!(resolved.version, "1.0.0");
}

#[test]
fn registry_lookup_runs_only_for_installed_records() {
    let resolved = resolve_target_version(&CoreManifest::default(), "pkg-x", None, || {
        panic!("first install must not hit the registry during resolution")
    });
    assert_eq!(resolved.version, LATEST_VERSION);
    assert!(!resolved.is_prerelease);
}

#[test]
fn failed_registry_lookup_keeps_installed_version() {
    let installed = installed_manifest("pkg-x", "1.4.2");
    let resolved = resolve_target_version(&installed, "pkg-x", None, || {
        Err(anyhow!("connection timed out"))
    });
    assert_eq!(resolved.version, "1.4.2");
}

#[test]
fn registry_lookup_result_is_validated() {
    let installed = installed_manifest("pkg-x", "1.4.2");
    let resolved = resolve_target_version(&installed, "pkg-x", None, || {
        Ok("<html>proxy error</html>".to_string())
    });
    assert_eq!(resolved.version, "1.4.2");
}

#[test]
fn registry_lookup_updates_target() {
    let installed = installed_manifest("pkg-x", "1.4.2");
    let resolved =
        resolve_target_version(&installed, "pkg-x", None, || Ok("1.5.0".to_string()));
    assert_eq!(resolved.version, "1.5.0");
}

#[test]
fn read_manifest_missing_file_is_empty_record() {
    let dir = test_dir();
    let manifest = read_core_manifest(&dir.join("package.json"));
    assert_eq!(manifest, CoreManifest::default());
    assert!(!manifest.is_installed());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn read_manifest_malformed_body_is_empty_record() {
    let dir = test_dir();
    let path = dir.join("package.json");
    fs::write(&path, b"{ not json").expect("must write manifest");

    assert_eq!(read_core_manifest(&path), CoreManifest::default());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn read_manifest_extracts_runtime_pin() {
    let dir = test_dir();
    let path = dir.join("package.json");
    fs::write(
        &path,
        br#"{"name":"hoist-core","version":"1.2.3","hoist":{"runtime":"20.11.1"}}"#,
    )
    .expect("must write manifest");

    let manifest = read_core_manifest(&path);
    assert_eq!(manifest.name.as_deref(), Some("hoist-core"));
    assert_eq!(manifest.version, Some(version("1.2.3")));
    assert_eq!(manifest.runtime_pin.as_deref(), Some("20.11.1"));
    assert!(manifest.is_installed());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn read_manifest_invalid_version_reads_as_not_installed() {
    let dir = test_dir();
    let path = dir.join("package.json");
    fs::write(&path, br#"{"name":"hoist-core","version":"???"}"#).expect("must write manifest");

    let manifest = read_core_manifest(&path);
    assert_eq!(manifest.name.as_deref(), Some("hoist-core"));
    assert!(manifest.version.is_none());
    assert!(!manifest.is_installed());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn read_store_round_trip() {
    let dir = test_dir();
    let path = dir.join("store.json");
    fs::write(
        &path,
        br#"{"mods":{"hoist-core":{"version":"2.1.0","is_next":true,"next_version":"3.0.0-rc.1"}}}"#,
    )
    .expect("must write store");

    let store = read_store(&path).expect("store should parse");
    let entry = store.mods.get("hoist-core").expect("entry should exist");
    assert_eq!(entry.version.as_deref(), Some("2.1.0"));
    assert!(entry.is_next);
    assert_eq!(entry.next_version.as_deref(), Some("3.0.0-rc.1"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn read_store_tolerates_missing_and_malformed_files() {
    let dir = test_dir();
    assert!(read_store(&dir.join("store.json")).is_none());

    let path = dir.join("broken.json");
    fs::write(&path, b"[[[").expect("must write store");
    assert!(read_store(&path).is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn layout_paths_share_the_core_root() {
    let layout = HomeLayout::new("/tmp/hoist-home");
    assert_eq!(layout.core_root(), PathBuf::from("/tmp/hoist-home/.core"));
    assert_eq!(
        layout.pkgs_dir(),
        PathBuf::from("/tmp/hoist-home/.core/pkgs")
    );
    assert_eq!(
        layout.core_manifest_path("hoist-core"),
        PathBuf::from("/tmp/hoist-home/.core/pkgs/hoist-core/package.json")
    );
    assert_eq!(
        layout.lock_path(),
        PathBuf::from("/tmp/hoist-home/.core/.lock")
    );
    assert_eq!(
        layout.runtime_dir(),
        PathBuf::from("/tmp/hoist-home/.runtime/current")
    );
    assert_eq!(
        package_dir(&layout.core_root(), "hoist-core"),
        layout.core_dir("hoist-core")
    );
}

#[test]
fn session_env_overrides_take_precedence() {
    let session = Session::from_lookup(|key| match key {
        "HOIST_HOME" => Some("/custom/home".to_string()),
        "HOIST_REGISTRY" => Some("https://registry.example.test/".to_string()),
        "HOIST_ENV" => Some("prepub".to_string()),
        "HOIST_RUNTIME_USED" => Some("system".to_string()),
        "HOIST_RUNTIME_DIST" => Some("https://mirror.example.test/dist/".to_string()),
        "HOIST_CORE_PATH" => Some("/custom/core".to_string()),
        _ => None,
    })
    .expect("session should build");

    assert_eq!(session.home, PathBuf::from("/custom/home"));
    assert_eq!(session.registry, "https://registry.example.test/");
    assert_eq!(session.env_tag.as_deref(), Some("prepub"));
    assert_eq!(session.runtime_mode, RuntimeMode::System);
    assert_eq!(session.runtime_dist, "https://mirror.example.test/dist");
    assert_eq!(
        session.core_path_override,
        Some(PathBuf::from("/custom/core"))
    );
}

#[test]
fn session_defaults_without_overrides() {
    let session = Session::from_lookup(|key| match key {
        "HOME" => Some("/home/dev".to_string()),
        "LOCALAPPDATA" => Some("C:\\Users\\dev\\AppData\\Local".to_string()),
        _ => None,
    })
    .expect("session should build");

    if cfg!(windows) {
        assert!(session.home.ends_with("Hoist"));
    } else {
        assert_eq!(session.home, PathBuf::from("/home/dev/.hoist"));
    }
    assert_eq!(session.registry, DEFAULT_REGISTRY);
    assert!(session.env_tag.is_none());
    assert_eq!(session.runtime_mode, RuntimeMode::Bundled);
    assert_eq!(session.runtime_dist, DEFAULT_RUNTIME_DIST);
    assert!(session.core_path_override.is_none());
}

#[test]
fn session_fails_without_any_home() {
    let result = Session::from_lookup(|_| None);
    assert!(result.is_err());
}

#[test]
fn blank_env_values_are_ignored() {
    let session = Session::from_lookup(|key| match key {
        "HOIST_HOME" => Some("  ".to_string()),
        "HOME" => Some("/home/dev".to_string()),
        "LOCALAPPDATA" => Some("C:\\Users\\dev\\AppData\\Local".to_string()),
        "HOIST_REGISTRY" => Some(String::new()),
        _ => None,
    })
    .expect("session should build");

    if !cfg!(windows) {
        assert_eq!(session.home, PathBuf::from("/home/dev/.hoist"));
    }
    assert_eq!(session.registry, DEFAULT_REGISTRY);
}
