use crate::error::{LauncherError, LauncherResult};
use crate::models::ServerProfile;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PROFILE_FILE: &str = "server_launcher.json";

pub fn profile_path(server_dir: &Path) -> PathBuf {
    server_dir.join(PROFILE_FILE)
}

/// Loads the profile for `server_dir`, creating the directory and a default
/// record on first access. A malformed record is logged and replaced by
/// defaults in memory; it is never fatal.
pub async fn load_profile(server_dir: &Path) -> LauncherResult<ServerProfile> {
    tokio::fs::create_dir_all(server_dir)
        .await
        .map_err(|err| LauncherError::io(server_dir, err))?;
    let server_dir = absolute(server_dir);
    let path = profile_path(&server_dir);

    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => match parse_profile(&path, &contents) {
            Ok(mut profile) => {
                if profile.server_dir != server_dir {
                    info!(
                        stored = %profile.server_dir.display(),
                        actual = %server_dir.display(),
                        "profile server_dir differs from its location; using location"
                    );
                    profile.server_dir = server_dir;
                }
                Ok(profile)
            }
            Err(err) => {
                warn!(error = %err, "falling back to default profile");
                Ok(ServerProfile::new(server_dir))
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let profile = ServerProfile::new(server_dir);
            save_profile(&profile).await?;
            info!(path = %path.display(), "created default profile");
            Ok(profile)
        }
        Err(err) => Err(LauncherError::io(path, err)),
    }
}

fn parse_profile(path: &Path, contents: &str) -> LauncherResult<ServerProfile> {
    serde_json::from_str(contents).map_err(|err| LauncherError::ConfigLoadFailure {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Writes the record to a temp file and renames it into place so a crash
/// never leaves a truncated profile behind.
pub async fn save_profile(profile: &ServerProfile) -> LauncherResult<()> {
    let path = profile_path(&profile.server_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| LauncherError::io(parent, err))?;
    }

    let data = serde_json::to_string_pretty(profile)?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|err| LauncherError::io(&tmp_path, err))?;

    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|err| LauncherError::io(&path, err))
}

pub async fn delete_profile(server_dir: &Path) -> LauncherResult<()> {
    let path = profile_path(server_dir);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(LauncherError::io(path, err)),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(path)))
        .unwrap_or_else(|_| path.to_path_buf())
}
