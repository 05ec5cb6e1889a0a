//! Bundle plan files.
//!
//! A plan lists what goes into a bundle:
//!
//! ```toml
//! [[artifact]]
//! package = "core"
//! arch = "x64"
//! url = "https://example.com/core.bin"
//! adds = [{ url = "https://example.com/core.pdb.zip" }]
//!
//! [[script]]
//! package = "core"
//! path = "scripts/post-install.sh"
//! ```
//!
//! Relative script paths resolve against the plan file's directory.

use std::path::Path;

use anyhow::{Context, Result};
use asb_schema::{Artifact, Script};
use serde::Deserialize;

/// Artifacts and scripts to onboard, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct BundlePlan {
    /// `[[artifact]]` tables
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<Artifact>,

    /// `[[script]]` tables
    #[serde(default, rename = "script")]
    pub scripts: Vec<Script>,
}

impl BundlePlan {
    /// Parse a plan, leaving script paths as written.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid bundle plan")
    }

    /// Read a plan file and anchor relative script paths at its directory.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        let mut plan = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse plan {}", path.display()))?;

        if let Some(dir) = path.parent() {
            plan.anchor_scripts(dir);
        }
        Ok(plan)
    }

    /// Rewrite relative script paths as `dir/<path>`.
    pub fn anchor_scripts(&mut self, dir: &Path) {
        for script in &mut self.scripts {
            let source = Path::new(&script.path);
            if source.is_relative() {
                script.path = dir.join(source).to_string_lossy().into_owned();
            }
        }
    }
}
