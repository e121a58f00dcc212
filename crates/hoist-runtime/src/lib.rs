mod launch;
mod provision;
mod resolve;

pub use launch::{launch, SpawnError};
pub use provision::provision_runtime;
pub use resolve::{bundled_runtime_bin, resolve_runtime, RuntimeChoice, RuntimeSource};
