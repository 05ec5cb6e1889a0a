//! Builds complete bundles against a mock HTTP server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use asb_core::{
    AssetLayout, AssetRegistry, BundleConfig, HttpDownloader, JsonManifestStore, PathProvider,
    RegistryError, ScriptOutcome,
};
use asb_schema::{Arch, Artifact, ArtifactError, Script};
use mockito::Server;

fn registry(
    root: &Path,
) -> AssetRegistry<Arc<AssetLayout>, HttpDownloader, JsonManifestStore> {
    let layout = Arc::new(AssetLayout::new(root).expect("layout"));
    let config = BundleConfig {
        retries: 1,
        ..BundleConfig::default()
    };
    let downloader = HttpDownloader::new(layout.assets_artifacts_directory(), &config)
        .expect("client")
        .with_backoff(Duration::ZERO);
    AssetRegistry::new(layout, downloader, JsonManifestStore::new())
}

#[tokio::test]
async fn test_offline_bundle_round_trip() {
    let mut server = Server::new_async().await;
    let core = server
        .mock("GET", "/core.bin")
        .with_status(200)
        .with_body("core bytes")
        .create_async()
        .await;
    let symbols = server
        .mock("GET", "/core.pdb.zip")
        .with_status(200)
        .with_body("symbols")
        .create_async()
        .await;

    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("assets");
    let registry = registry(&root);
    registry.initialize().expect("initialize");

    let artifact = Artifact::new("core", Arch::X64, format!("{}/core.bin", server.url()))
        .with_add(format!("{}/core.pdb.zip", server.url()));
    let stored = registry
        .add_artifact(artifact, true, None)
        .await
        .expect("add artifact");

    let script_src = temp.path().join("install.sh");
    std::fs::write(&script_src, "#!/bin/sh\n").expect("write script");
    let outcome = registry
        .add_script(Script::new("core", script_src.to_string_lossy()))
        .expect("add script");
    assert!(matches!(outcome, ScriptOutcome::Added(_)));

    registry.save_manifest().expect("save");

    core.assert_async().await;
    symbols.assert_async().await;
    assert_eq!(stored.path.as_deref(), Some("./artifacts/core-x64.bin"));
    assert_eq!(
        stored.adds[0].path.as_deref(),
        Some("./artifacts/core-x64-add0.zip")
    );

    // Move the bundle; every recorded path must still resolve
    let moved = temp.path().join("relocated");
    std::fs::rename(&root, &moved).expect("move bundle");
    let manifest = asb_core::manifest::load(&moved.join("manifest.json")).expect("load");
    assert_eq!(manifest.artifacts.len(), 1);
    assert_eq!(manifest.scripts.len(), 1);
    assert_eq!(
        std::fs::read_to_string(moved.join(manifest.artifacts[0].path.as_deref().unwrap()))
            .expect("artifact"),
        "core bytes"
    );
    assert!(moved.join(&manifest.scripts[0].path).is_file());
}

#[tokio::test]
async fn test_online_bundle_fetches_nothing() {
    let mut server = Server::new_async().await;
    let never = server
        .mock("GET", "/core.bin")
        .expect(0)
        .create_async()
        .await;

    let temp = tempfile::tempdir().expect("tempdir");
    let registry = registry(&temp.path().join("assets"));
    registry.initialize().expect("initialize");

    let artifact = Artifact::new("core", Arch::X64, format!("{}/core.bin", server.url()));
    let stored = registry
        .add_artifact(artifact.clone(), false, None)
        .await
        .expect("add artifact");
    registry.save_manifest().expect("save");

    never.assert_async().await;
    assert_eq!(stored, artifact);
    let manifest = asb_core::manifest::load(registry.paths().assets_manifest_path()).expect("load");
    assert_eq!(manifest.artifacts, vec![artifact]);
}

#[tokio::test]
async fn test_http_failure_leaves_manifest_empty() {
    let mut server = Server::new_async().await;
    let _gone = server
        .mock("GET", "/gone.bin")
        .with_status(410)
        .create_async()
        .await;

    let temp = tempfile::tempdir().expect("tempdir");
    let registry = registry(&temp.path().join("assets"));
    registry.initialize().expect("initialize");

    let artifact = Artifact::new("gone", Arch::X64, format!("{}/gone.bin", server.url()));
    assert!(registry.add_artifact(artifact, true, None).await.is_err());

    assert!(registry.manifest().is_empty());
    let leftovers: Vec<_> = std::fs::read_dir(registry.paths().assets_artifacts_directory())
        .expect("read artifacts")
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_traversing_package_writes_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("payload.bin");
    std::fs::write(&source, "payload").expect("write source");

    let root = temp.path().join("bundle").join("assets");
    let registry = registry(&root);
    registry.initialize().expect("initialize");

    let artifact = Artifact::new(
        "../../escaped",
        Arch::X64,
        format!("file://{}", source.display()),
    );
    let err = registry
        .add_artifact(artifact, true, None)
        .await
        .expect_err("traversing package name");

    assert!(matches!(
        err,
        RegistryError::InvalidArtifact(ArtifactError::InvalidPackage(_))
    ));
    assert!(!temp.path().join("bundle").join("escaped-x64.bin").exists());
    assert!(!temp.path().join("escaped-x64.bin").exists());
    assert!(registry.manifest().is_empty());
}
