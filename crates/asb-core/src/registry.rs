//! Asset registry: owns the bundle directory and everything added to it.
//!
//! The registry creates the canonical `artifacts/` + `scripts/` layout,
//! downloads artifacts through the injected [`Downloader`], copies scripts
//! in, and appends the resulting records to the [`ManifestStore`]. Every
//! path it records is relative to the asset root (`./artifacts/...`), so the
//! finished bundle can be moved anywhere.
//!
//! Filesystem work is synchronous; the only suspension points are the
//! downloads inside [`AssetRegistry::add_artifact`], which run one at a time.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use asb_schema::{Artifact, ArtifactError, Script};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::Reporter;
use crate::io::download::{DownloadError, Downloader};
use crate::manifest::{ManifestError, ManifestStore};
use crate::paths::{PathProvider, single_component};

/// Errors raised by [`AssetRegistry`] operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Filesystem failure at `path`.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A download failed; nothing was recorded.
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// Persisting the manifest failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The artifact record is structurally invalid.
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(#[from] ArtifactError),

    /// A script record cannot be placed inside the bundle.
    #[error("Invalid script for package '{package}': {reason}")]
    InvalidScript {
        /// Owning package
        package: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// A stored file does not live under the asset root.
    #[error("{} is outside the asset root {}", .path.display(), .root.display())]
    OutsideRoot {
        /// Offending path
        path: PathBuf,
        /// Asset root
        root: PathBuf,
    },
}

impl RegistryError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of [`AssetRegistry::add_script`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Copied into the bundle and recorded with its relocated path.
    Added(Script),
    /// The source file does not exist; nothing was copied or recorded.
    Skipped {
        /// Path that was looked up
        source: PathBuf,
    },
}

/// Mediates every addition to the asset directory.
///
/// Collaborators are injected at construction: a [`PathProvider`] for
/// locations, a [`Downloader`] for artifact bytes and a [`ManifestStore`]
/// for the records.
#[derive(Debug)]
pub struct AssetRegistry<P, D, M> {
    paths: P,
    downloader: D,
    manifest: M,
}

impl<P, D, M> AssetRegistry<P, D, M>
where
    P: PathProvider,
    D: Downloader,
    M: ManifestStore,
{
    /// Create a registry over the given collaborators.
    pub fn new(paths: P, downloader: D, manifest: M) -> Self {
        Self {
            paths,
            downloader,
            manifest,
        }
    }

    /// Bundle locations.
    pub fn paths(&self) -> &P {
        &self.paths
    }

    /// The manifest store records are appended to.
    pub fn manifest(&self) -> &M {
        &self.manifest
    }

    /// Reset the asset root to an empty `artifacts/` + `scripts/` layout.
    ///
    /// Any previous bundle content at that location is deleted. Must not run
    /// concurrently with additions.
    ///
    /// # Errors
    ///
    /// Returns an error on any filesystem failure; the directory is then in
    /// an unknown state and the build should start over.
    pub fn initialize(&self) -> Result<(), RegistryError> {
        let root = self.paths.assets_directory();
        let exists = root.try_exists().map_err(RegistryError::io(root))?;
        if exists {
            info!("Clearing asset directory {}", root.display());
            self.clear()?;
        }
        self.create()
    }

    fn create(&self) -> Result<(), RegistryError> {
        let root = self.paths.assets_directory();
        std::fs::create_dir_all(root).map_err(RegistryError::io(root))?;
        for dir in [
            self.paths.assets_artifacts_directory(),
            self.paths.assets_scripts_directory(),
        ] {
            std::fs::create_dir(dir).map_err(RegistryError::io(dir))?;
        }
        debug!("Created asset directory {}", root.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), RegistryError> {
        clear_directory(self.paths.assets_artifacts_directory())?;
        clear_directory(self.paths.assets_scripts_directory())?;
        clear_directory(self.paths.assets_directory())
    }

    /// Register an artifact, downloading it and its auxiliary payloads first
    /// when `download` is set.
    ///
    /// Downloads use the keys `{package}-{arch}` and
    /// `{package}-{arch}-add{index}` and run sequentially in index order.
    /// With `download == false` the record is stored exactly as given (the
    /// installer fetches it later). Returns the record as appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is invalid (URL schemes are only
    /// checked when downloading), any download fails, or a downloaded file
    /// lies outside the asset root. Nothing is appended in
    /// those cases.
    pub async fn add_artifact(
        &self,
        artifact: Artifact,
        download: bool,
        progress: Option<&dyn Reporter>,
    ) -> Result<Artifact, RegistryError> {
        artifact.validate()?;
        let mut artifact = artifact;

        if download {
            artifact.validate_sources()?;
            if let Some(url) = artifact.url.clone() {
                let key = artifact.key();
                let stored = self
                    .downloader
                    .download(&key, &url, download, progress)
                    .await?;
                artifact.path = Some(self.relocate(&stored)?);
            }

            let keys: Vec<String> = (0..artifact.adds.len())
                .map(|index| artifact.add_key(index))
                .collect();
            for (key, add) in keys.iter().zip(artifact.adds.iter_mut()) {
                let stored = self
                    .downloader
                    .download(key, &add.url, download, progress)
                    .await?;
                add.path = Some(self.relocate(&stored)?);
            }
        }

        debug!(
            "Recording artifact {} ({} auxiliary payloads)",
            artifact.key(),
            artifact.adds.len()
        );
        self.manifest.add_artifact(artifact.clone());
        Ok(artifact)
    }

    /// Copy a post-install script into `scripts/{package}/` and register it.
    ///
    /// A missing source file is not an error: the script is skipped and
    /// [`ScriptOutcome::Skipped`] is returned. An existing copy with the same
    /// name is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the package name or file name cannot form a path
    /// inside the scripts directory, or if copying fails.
    pub fn add_script(&self, script: Script) -> Result<ScriptOutcome, RegistryError> {
        let source = PathBuf::from(&script.path);
        if !source.try_exists().map_err(RegistryError::io(&source))? {
            warn!(
                "Skipping script for '{}': {} does not exist",
                script.package,
                source.display()
            );
            return Ok(ScriptOutcome::Skipped { source });
        }

        let package = single_component(&script.package).ok_or(RegistryError::InvalidScript {
            package: script.package.clone(),
            reason: "package name must be a single path component",
        })?;
        let file_name = source.file_name().ok_or(RegistryError::InvalidScript {
            package: script.package.clone(),
            reason: "source path has no file name",
        })?;

        let package_dir = self.paths.assets_scripts_directory().join(package);
        std::fs::create_dir_all(&package_dir).map_err(RegistryError::io(&package_dir))?;

        let dest = package_dir.join(file_name);
        std::fs::copy(&source, &dest).map_err(RegistryError::io(&source))?;

        let stored = Script {
            package: script.package,
            path: self.relocate(&dest)?,
        };
        debug!("Recording script {} for '{}'", stored.path, stored.package);
        self.manifest.add_script(stored.clone());
        Ok(ScriptOutcome::Added(stored))
    }

    /// Write the manifest to the configured manifest path.
    ///
    /// May be called more than once; each call writes everything recorded
    /// so far.
    ///
    /// # Errors
    ///
    /// Propagates the manifest store's error. Recorded state is kept, so the
    /// call can simply be retried.
    pub fn save_manifest(&self) -> Result<(), RegistryError> {
        let path = self.paths.assets_manifest_path();
        self.manifest.save(path)?;
        info!("Wrote manifest {}", path.display());
        Ok(())
    }

    fn relocate(&self, path: &Path) -> Result<String, RegistryError> {
        relocatable_path(self.paths.assets_directory(), path)
    }
}

/// Express `path` relative to `root` in the stored form: `.` followed by
/// `/`-separated components (`./artifacts/core-x64.bin`).
///
/// # Errors
///
/// Returns [`RegistryError::OutsideRoot`] if `path` is not below `root` or
/// climbs out of it with `..`.
pub fn relocatable_path(root: &Path, path: &Path) -> Result<String, RegistryError> {
    let outside = || RegistryError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let rest = path.strip_prefix(root).map_err(|_| outside())?;
    let mut stored = String::from(".");
    for component in rest.components() {
        match component {
            Component::Normal(part) => {
                stored.push('/');
                stored.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    Ok(stored)
}

/// Unlink every non-directory entry with an extension directly inside `dir`,
/// then remove `dir` recursively. A missing `dir` is fine.
fn clear_directory(dir: &Path) -> Result<(), RegistryError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(RegistryError::io(dir)(err)),
    };

    for entry in entries {
        let entry = entry.map_err(RegistryError::io(dir))?;
        let path = entry.path();
        let has_extension = path.extension().is_some_and(|ext| !ext.is_empty());
        let is_dir = entry
            .file_type()
            .map_err(RegistryError::io(&path))?
            .is_dir();
        if has_extension && !is_dir {
            std::fs::remove_file(&path).map_err(RegistryError::io(&path))?;
        }
    }

    std::fs::remove_dir_all(dir).map_err(RegistryError::io(dir))
}
