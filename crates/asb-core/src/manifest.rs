//! Manifest store: the in-memory record collection and its persistence.
//!
//! The registry only appends through [`ManifestStore`]; the on-disk format
//! (pretty JSON of [`AssetManifest`]) is decided here.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use asb_schema::{Artifact, AssetManifest, Script};
use thiserror::Error;
use tracing::debug;

/// Errors raised while persisting or reading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Filesystem failure at `path`.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be (de)serialized.
    #[error("Invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
}

impl ManifestError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Append-only record collection that can be written to disk.
///
/// Appends take `&self` and must be safe to call concurrently.
pub trait ManifestStore: Send + Sync {
    /// Append an artifact record. Duplicates are kept.
    fn add_artifact(&self, artifact: Artifact);

    /// Append a script record. Duplicates are kept.
    fn add_script(&self, script: Script);

    /// Serialize the current state to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails. The in-memory
    /// state is unchanged either way.
    fn save(&self, path: &Path) -> Result<(), ManifestError>;
}

impl<T: ManifestStore + ?Sized> ManifestStore for Arc<T> {
    fn add_artifact(&self, artifact: Artifact) {
        (**self).add_artifact(artifact);
    }
    fn add_script(&self, script: Script) {
        (**self).add_script(script);
    }
    fn save(&self, path: &Path) -> Result<(), ManifestError> {
        (**self).save(path)
    }
}

/// [`ManifestStore`] keeping an [`AssetManifest`] behind a mutex.
#[derive(Debug, Default)]
pub struct JsonManifestStore {
    inner: Mutex<AssetManifest>,
}

impl JsonManifestStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AssetManifest {
        self.lock().clone()
    }

    // A panic while holding the lock cannot leave a half-pushed Vec behind.
    fn lock(&self) -> MutexGuard<'_, AssetManifest> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ManifestStore for JsonManifestStore {
    fn add_artifact(&self, artifact: Artifact) {
        self.lock().artifacts.push(artifact);
    }

    fn add_script(&self, script: Script) {
        self.lock().scripts.push(script);
    }

    fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let manifest = self.snapshot();
        let content = manifest.to_json_pretty()?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(ManifestError::io(parent))?;

        // Atomic write: temp file in the same directory, then rename
        let mut temp =
            tempfile::NamedTempFile::new_in(parent).map_err(ManifestError::io(parent))?;
        let temp_path = temp.path().to_path_buf();
        writeln!(temp, "{content}").map_err(ManifestError::io(&temp_path))?;
        temp.persist(path)
            .map_err(|e| ManifestError::io(path)(e.error))?;

        debug!(
            "Saved manifest with {} artifacts and {} scripts to {}",
            manifest.artifacts.len(),
            manifest.scripts.len(),
            path.display()
        );
        Ok(())
    }
}

/// Read a saved manifest back (inspection tooling, installers).
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid manifest.
pub fn load(path: &Path) -> Result<AssetManifest, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(ManifestError::io(path))?;
    Ok(AssetManifest::from_json(&content)?)
}
