//! Canonical filesystem locations of an asset bundle.
//!
//! ```text
//! <assets>/
//! ├── artifacts/      # downloaded artifacts and auxiliary payloads
//! ├── scripts/<pkg>/  # post-install scripts, one directory per package
//! └── manifest.json   # written by the manifest store
//! ```

use std::ffi::OsStr;
use std::io::{Error, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use asb_schema::{ARTIFACTS_DIR, SCRIPTS_DIR};

/// Environment variable overriding the asset root.
pub const ASSETS_DIR_ENV: &str = "ASB_ASSETS_DIR";

/// Default manifest file name inside the asset root.
pub const DEFAULT_MANIFEST_FILE: &str = "manifest.json";

/// Lookup of the bundle's locations. Implementations must not touch the
/// filesystem; every returned path is absolute and nested under
/// [`assets_directory`](Self::assets_directory).
pub trait PathProvider: Send + Sync {
    /// Root of the bundle.
    fn assets_directory(&self) -> &Path;

    /// `<root>/artifacts`
    fn assets_artifacts_directory(&self) -> &Path;

    /// `<root>/scripts`
    fn assets_scripts_directory(&self) -> &Path;

    /// Location the manifest is saved to.
    fn assets_manifest_path(&self) -> &Path;
}

impl<T: PathProvider + ?Sized> PathProvider for Arc<T> {
    fn assets_directory(&self) -> &Path {
        (**self).assets_directory()
    }
    fn assets_artifacts_directory(&self) -> &Path {
        (**self).assets_artifacts_directory()
    }
    fn assets_scripts_directory(&self) -> &Path {
        (**self).assets_scripts_directory()
    }
    fn assets_manifest_path(&self) -> &Path {
        (**self).assets_manifest_path()
    }
}

/// Standard bundle layout rooted at a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    root: PathBuf,
    artifacts: PathBuf,
    scripts: PathBuf,
    manifest: PathBuf,
}

impl AssetLayout {
    /// Build the layout for `root`. Relative roots are anchored at the
    /// current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is empty or the current directory cannot
    /// be resolved.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self {
            artifacts: root.join(ARTIFACTS_DIR),
            scripts: root.join(SCRIPTS_DIR),
            manifest: root.join(DEFAULT_MANIFEST_FILE),
            root,
        })
    }

    /// Use a different manifest file name, kept directly inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] if `file_name` is not a single
    /// plain path segment (`../m.json`, `/etc/m.json`, `sub/m.json`).
    pub fn with_manifest_file(mut self, file_name: &str) -> std::io::Result<Self> {
        let name = single_component(file_name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("manifest file name must be a plain file name: {file_name}"),
            )
        })?;
        self.manifest = self.root.join(name);
        Ok(self)
    }
}

impl PathProvider for AssetLayout {
    fn assets_directory(&self) -> &Path {
        &self.root
    }
    fn assets_artifacts_directory(&self) -> &Path {
        &self.artifacts
    }
    fn assets_scripts_directory(&self) -> &Path {
        &self.scripts
    }
    fn assets_manifest_path(&self) -> &Path {
        &self.manifest
    }
}

/// `name` as a single normal path component, `None` for anything that
/// would resolve elsewhere.
pub(crate) fn single_component(name: &str) -> Option<&OsStr> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Some(part),
        _ => None,
    }
}

/// Extract the filename from a URL, ignoring any query string or fragment.
/// Empty when the URL has no path after the authority.
pub fn filename_from_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let url = &url[..end];
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => url,
    };
    path.split('/').next_back().unwrap_or("")
}

const COMPOUND_EXTENSIONS: [&str; 5] = [".tar.gz", ".tar.xz", ".tar.bz2", ".tar.zst", ".tar.lz"];

/// File extension of the URL's filename including the leading dot
/// (`.tar.gz` kept whole). Empty when there is none.
pub fn extension_from_url(url: &str) -> &str {
    let name = filename_from_url(url);
    let lower = name.to_ascii_lowercase();
    if let Some(ext) = COMPOUND_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext)) {
        return &name[name.len() - ext.len()..];
    }
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_nests_under_root() {
        let layout = AssetLayout::new("/srv/bundle").unwrap();
        assert_eq!(layout.assets_directory(), Path::new("/srv/bundle"));
        assert_eq!(
            layout.assets_artifacts_directory(),
            Path::new("/srv/bundle/artifacts")
        );
        assert_eq!(
            layout.assets_scripts_directory(),
            Path::new("/srv/bundle/scripts")
        );
        assert_eq!(
            layout.assets_manifest_path(),
            Path::new("/srv/bundle/manifest.json")
        );

        let custom = layout.with_manifest_file("bundle.json").unwrap();
        assert_eq!(
            custom.assets_manifest_path(),
            Path::new("/srv/bundle/bundle.json")
        );
    }

    #[test]
    fn test_manifest_file_stays_in_root() {
        for name in ["../m.json", "/etc/m.json", "sub/m.json", "..", ".", ""] {
            let err = AssetLayout::new("/srv/bundle")
                .unwrap()
                .with_manifest_file(name)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{name}");
        }
    }

    #[test]
    fn test_relative_root_is_absolute() {
        let layout = AssetLayout::new("out/assets").unwrap();
        assert!(layout.assets_directory().is_absolute());
        assert!(layout.assets_directory().ends_with("out/assets"));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://example.com/path/to/file.tar.gz"),
            "file.tar.gz"
        );
        assert_eq!(
            filename_from_url("https://example.com/dl/core.bin?token=abc#frag"),
            "core.bin"
        );
        assert_eq!(filename_from_url(""), "");
        assert_eq!(filename_from_url("http://example.com"), "");
        assert_eq!(filename_from_url("http://example.com/"), "");
        assert_eq!(filename_from_url("file:///tmp/core.bin"), "core.bin");
        assert_eq!(filename_from_url("core.bin"), "core.bin");
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("http://example/core.bin"), ".bin");
        assert_eq!(extension_from_url("http://e/pkg-1.0.TAR.GZ"), ".TAR.GZ");
        assert_eq!(extension_from_url("http://e/tool.tar.zst?x=1"), ".tar.zst");
        assert_eq!(extension_from_url("http://e/download"), "");
        assert_eq!(extension_from_url("http://e/.hidden"), "");
        assert_eq!(extension_from_url("http://example.com"), "");
        assert_eq!(extension_from_url("https://example.com?file=a.zip"), "");
    }
}
