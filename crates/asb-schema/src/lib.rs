//! Shared types and wire format for asb asset bundles.
//!
//! These records are produced by the bundle builder and read back by
//! installers, so they live in their own crate with no I/O dependencies.

pub mod arch;
pub mod manifest;
pub mod types;

// Re-exports
pub use arch::*;
pub use manifest::{AssetManifest, MANIFEST_VERSION};
pub use types::*;

/// Name of the artifacts subdirectory inside an asset root.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Name of the scripts subdirectory inside an asset root.
pub const SCRIPTS_DIR: &str = "scripts";
