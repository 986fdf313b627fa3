mod common;

use common::TempDir;
use launcher::{
    models::{CoreType, MirrorId, ServerProfile, DEFAULT_JAVA_OPTS},
    storage::{delete_profile, load_profile, profile_path, save_profile},
};

#[tokio::test]
async fn first_load_persists_defaults() {
    let dir = TempDir::new("profile-defaults");
    let profile = load_profile(dir.path()).await.expect("load");

    assert!(profile_path(dir.path()).is_file());
    assert_eq!(profile.server_jar, "");
    assert_eq!(profile.java_opts, DEFAULT_JAVA_OPTS);
    assert_eq!(profile.core_type, CoreType::Unknown);
    assert_eq!(profile.minecraft_version, "");
    assert_eq!(profile.mirror_site, MirrorId::Mslmc);
}

#[tokio::test]
async fn load_creates_missing_directory() {
    let dir = TempDir::new("profile-nested");
    let nested = dir.path().join("servers").join("survival");
    let profile = load_profile(&nested).await.expect("load");
    assert!(nested.is_dir());
    assert!(profile_path(&profile.server_dir).is_file());
}

#[tokio::test]
async fn save_then_load_is_stable() {
    let dir = TempDir::new("profile-roundtrip");
    let mut profile = load_profile(dir.path()).await.expect("load");
    profile.server_jar = "paper-1.20.4.jar".to_string();
    profile.core_type = CoreType::Paper;
    profile.minecraft_version = "1.20.4".to_string();
    profile.mirror_site = MirrorId::Bmclapi;
    profile.touch();
    save_profile(&profile).await.expect("save");

    let first = std::fs::read(profile_path(&profile.server_dir)).expect("read");
    let loaded = load_profile(dir.path()).await.expect("reload");
    assert_eq!(loaded, profile);

    save_profile(&loaded).await.expect("save again");
    let second = std::fs::read(profile_path(&profile.server_dir)).expect("read");
    assert_eq!(first, second);
}

#[tokio::test]
async fn malformed_record_falls_back_to_defaults() {
    let dir = TempDir::new("profile-malformed");
    dir.write("server_launcher.json", "{ not json");

    let profile = load_profile(dir.path()).await.expect("load");
    assert_eq!(profile.java_opts, DEFAULT_JAVA_OPTS);
    assert_eq!(profile.server_jar, "");
    // The broken file is left for the operator to inspect.
    let raw = std::fs::read_to_string(dir.path().join("server_launcher.json")).expect("read");
    assert_eq!(raw, "{ not json");
}

#[tokio::test]
async fn partial_record_keeps_known_fields() {
    let dir = TempDir::new("profile-partial");
    dir.write(
        "server_launcher.json",
        r#"{"server_jar": "purpur-1.21.4.jar", "core_type": "purpur", "mirror_site": "mc"}"#,
    );

    let profile = load_profile(dir.path()).await.expect("load");
    assert_eq!(profile.server_jar, "purpur-1.21.4.jar");
    assert_eq!(profile.core_type, CoreType::Purpur);
    assert_eq!(profile.mirror_site, MirrorId::Mc);
    assert_eq!(profile.java_opts, DEFAULT_JAVA_OPTS);
}

#[tokio::test]
async fn directory_argument_wins_over_stored_location() {
    let dir = TempDir::new("profile-moved");
    let stored = ServerProfile::new("/somewhere/else");
    let json = serde_json::to_string(&stored).expect("serialize");
    dir.write("server_launcher.json", &json);

    let profile = load_profile(dir.path()).await.expect("load");
    assert_ne!(profile.server_dir, std::path::PathBuf::from("/somewhere/else"));
    assert!(profile.server_dir.ends_with(dir.path().file_name().expect("name")));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let dir = TempDir::new("profile-delete");
    load_profile(dir.path()).await.expect("load");
    delete_profile(dir.path()).await.expect("delete");
    assert!(!profile_path(dir.path()).exists());
    delete_profile(dir.path()).await.expect("delete again");
}
