mod layout;
mod manifest;
mod session;
mod store;
mod version;

pub use layout::{package_dir, package_root, HomeLayout};
pub use manifest::{read_core_manifest, CoreManifest};
pub use session::{
    RuntimeMode, Session, CORE_PACKAGE_NAME, DEFAULT_REGISTRY, DEFAULT_RUNTIME_DIST,
};
pub use store::{read_store, StoreModule, StoreRecord};
pub use version::{
    classify_delta, resolve_target_version, ResolvedVersion, VersionDelta, LATEST_VERSION,
};

#[cfg(test)]
mod tests;
