//! Artifact and script records.

use serde::{Deserialize, Serialize};

use crate::Arch;

/// A downloadable installable unit tracked in the bundle manifest.
///
/// Built by the caller with at least `package`, `arch` and (for offline
/// bundles) `url`. The registry fills in `path` once the bytes live inside
/// the asset directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Name of the package this artifact belongs to (e.g. "core")
    pub package: String,

    /// Architecture the artifact targets
    pub arch: Arch,

    /// Source URL. `None` when the bytes are already local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Stored location, relative to the asset root (`./artifacts/...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Auxiliary payloads shipped next to the artifact, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adds: Vec<Add>,
}

/// Secondary file bundled alongside an [`Artifact`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Add {
    /// Source URL of the payload
    pub url: String,

    /// Stored location, relative to the asset root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A post-install script owned by a package.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Script {
    /// Package the script runs for
    pub package: String,

    /// Source file on input, relocated path once registered
    pub path: String,
}

/// Errors that can occur when validating an [`Artifact`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ArtifactError {
    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(String),

    /// A URL uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The package name cannot be used as a file name.
    #[error("Invalid package name: {0}")]
    InvalidPackage(String),
}

const URL_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

fn check_url(field: &str, url: &str) -> Result<(), ArtifactError> {
    if url.is_empty() {
        return Err(ArtifactError::EmptyField(field.to_string()));
    }
    if !URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ArtifactError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

impl Artifact {
    /// Create an artifact pointing at a remote URL.
    pub fn new(package: impl Into<String>, arch: Arch, url: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            arch,
            url: Some(url.into()),
            path: None,
            adds: Vec::new(),
        }
    }

    /// Append an auxiliary payload.
    pub fn with_add(mut self, url: impl Into<String>) -> Self {
        self.adds.push(Add {
            url: url.into(),
            path: None,
        });
        self
    }

    /// Download key of the primary artifact: `{package}-{arch}`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.package, self.arch)
    }

    /// Download key of the auxiliary payload at `index`: `{package}-{arch}-add{index}`.
    pub fn add_key(&self, index: usize) -> String {
        format!("{}-{}-add{index}", self.package, self.arch)
    }

    /// Structural checks only; artifact content is never inspected.
    ///
    /// The package name becomes part of stored file names, so it must be a
    /// single path segment (no separators, not `.` or `..`).
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::EmptyField`] if `package` is empty, or
    /// [`ArtifactError::InvalidPackage`] if it is not a plain name.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let package = self.package.trim();
        if package.is_empty() {
            return Err(ArtifactError::EmptyField("package".to_string()));
        }
        if package == "." || package == ".." || self.package.contains(['/', '\\']) {
            return Err(ArtifactError::InvalidPackage(self.package.clone()));
        }
        Ok(())
    }

    /// Check that every URL can be fetched: `http(s)://` or `file://`.
    ///
    /// Only needed before downloading; records kept for the installer may
    /// use any scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::EmptyField`] for an empty URL or
    /// [`ArtifactError::InvalidUrl`] for an unsupported scheme.
    pub fn validate_sources(&self) -> Result<(), ArtifactError> {
        if let Some(url) = &self.url {
            check_url("url", url)?;
        }
        for (i, add) in self.adds.iter().enumerate() {
            check_url(&format!("adds[{i}].url"), &add.url)?;
        }
        Ok(())
    }
}

impl Script {
    /// Create a script record pointing at a local source file.
    pub fn new(package: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }
}
