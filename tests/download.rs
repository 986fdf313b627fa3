mod common;

use async_trait::async_trait;
use common::TempDir;
use launcher::{
    download::{download_artifact, ArtifactFetcher},
    models::{CoreType, MirrorId, ServerProfile},
    LauncherError,
};
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
struct MockFetcher {
    succeed: bool,
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> bool {
        self.requested.lock().expect("lock").push(url.to_string());
        if self.succeed {
            std::fs::write(dest, b"jar bytes").expect("write artifact");
        }
        self.succeed
    }
}

#[tokio::test]
async fn download_installs_artifact_and_redetects() {
    let dir = TempDir::new("download-ok");
    let fetcher = MockFetcher {
        succeed: true,
        ..Default::default()
    };
    let mut profile = ServerProfile::new(dir.path());
    profile.mirror_site = MirrorId::Mc;

    let file_name = download_artifact(&fetcher, &mut profile, CoreType::Purpur, "1.21.4", None)
        .await
        .expect("download");

    assert_eq!(file_name, "purpur-1.21.4.jar");
    assert!(dir.path().join(&file_name).is_file());
    assert_eq!(profile.server_jar, file_name);
    assert_eq!(profile.core_type, CoreType::Purpur);
    assert_eq!(profile.minecraft_version, "1.21.4");
    assert!(profile.last_modified.is_some());
    assert_eq!(
        fetcher.requested.lock().expect("lock").as_slice(),
        ["https://api.purpurmc.org/v2/purpur/1.21.4/latest/download"]
    );
}

#[tokio::test]
async fn official_server_is_unresolvable() {
    let dir = TempDir::new("download-vanilla");
    let fetcher = MockFetcher {
        succeed: true,
        ..Default::default()
    };
    let mut profile = ServerProfile::new(dir.path());

    let err = download_artifact(&fetcher, &mut profile, CoreType::Vanilla, "1.21.4", None)
        .await
        .expect_err("vanilla has no template");
    assert!(matches!(err, LauncherError::DownloadUnresolvable { core_type: CoreType::Vanilla, .. }));
    assert!(fetcher.requested.lock().expect("lock").is_empty());
    assert_eq!(profile.server_jar, "");
}

#[tokio::test]
async fn failed_fetch_leaves_profile_untouched() {
    let dir = TempDir::new("download-fail");
    let fetcher = MockFetcher::default();
    let mut profile = ServerProfile::new(dir.path());
    let before = profile.clone();

    let err = download_artifact(&fetcher, &mut profile, CoreType::Paper, "1.20.4", Some("499"))
        .await
        .expect_err("fetch fails");
    assert!(matches!(err, LauncherError::DownloadFailed { .. }));
    assert_eq!(profile, before);
}
