mod common;

use common::TempDir;
use launcher::server_files::{
    accept_license, baseline_properties, check_license, cleanup_server_dir,
    ensure_default_properties, ensure_license, PROPERTIES_FILE,
};

#[tokio::test]
async fn missing_license_is_reported() {
    let dir = TempDir::new("license-missing");
    let (accepted, message) = check_license(dir.path()).await;
    assert!(!accepted);
    assert!(message.contains("eula.txt"));
}

#[tokio::test]
async fn accepted_license_is_detected() {
    let dir = TempDir::new("license-accept");
    accept_license(dir.path()).await.expect("accept");
    let (accepted, _) = check_license(dir.path()).await;
    assert!(accepted);
}

#[tokio::test]
async fn acceptance_token_is_case_insensitive() {
    let dir = TempDir::new("license-case");
    dir.write("eula.txt", "#header\nEULA=TRUE\n");
    assert!(check_license(dir.path()).await.0);

    dir.write("eula.txt", "eula=false\n");
    assert!(!check_license(dir.path()).await.0);
}

#[tokio::test]
async fn ensure_license_rewrites_negative_marker() {
    let dir = TempDir::new("license-ensure");
    dir.write("eula.txt", "eula=false\n");
    ensure_license(dir.path()).await.expect("ensure");
    assert!(check_license(dir.path()).await.0);
}

#[tokio::test]
async fn default_properties_written_once() {
    let dir = TempDir::new("properties");
    assert!(ensure_default_properties(dir.path()).await.expect("create"));
    let written = std::fs::read_to_string(dir.path().join(PROPERTIES_FILE)).expect("read");
    assert_eq!(written, baseline_properties());
    assert!(written.contains("server-port=25565"));

    dir.write(PROPERTIES_FILE, "motd=custom\n");
    assert!(!ensure_default_properties(dir.path()).await.expect("keep"));
    let kept = std::fs::read_to_string(dir.path().join(PROPERTIES_FILE)).expect("read");
    assert_eq!(kept, "motd=custom\n");
}

#[tokio::test]
async fn cleanup_removes_only_transient_output() {
    let dir = TempDir::new("cleanup");
    dir.write("server.log", "line\n");
    dir.write("crash-reports/crash-2024.txt", "boom");
    dir.write("debug/profile.txt", "");
    dir.write("world/level.dat", "level");
    dir.write("paper-1.20.4.jar", "");

    let removed = cleanup_server_dir(dir.path()).await.expect("cleanup");
    assert_eq!(removed, vec!["server.log", "crash-reports", "debug"]);
    assert!(!dir.path().join("server.log").exists());
    assert!(!dir.path().join("crash-reports").exists());
    assert!(dir.path().join("world/level.dat").is_file());
    assert!(dir.path().join("paper-1.20.4.jar").is_file());

    let again = cleanup_server_dir(dir.path()).await.expect("cleanup again");
    assert!(again.is_empty());
}
