//! The bundle manifest consumed by installers.
//!
//! Every `path` stored here is relative to the asset root (`./artifacts/...`,
//! `./scripts/...`) so the whole bundle can be moved without rewriting it.

use serde::{Deserialize, Serialize};

use crate::{Artifact, Script};

/// Current manifest format revision.
pub const MANIFEST_VERSION: u32 = 1;

/// Ordered collection of artifact and script records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetManifest {
    /// Format revision, see [`MANIFEST_VERSION`].
    pub version: u32,
    /// Artifacts in onboarding order.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Post-install scripts in onboarding order.
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            artifacts: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

impl AssetManifest {
    /// Total number of records.
    pub fn len(&self) -> usize {
        self.artifacts.len() + self.scripts.len()
    }

    /// True when no record has been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a manifest from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid manifest document.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
