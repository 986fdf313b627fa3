use crate::error::{LauncherError, LauncherResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const BASELINE_PROPERTIES: &str = include_str!("../assets/server.properties");

pub const LICENSE_FILE: &str = "eula.txt";
pub const PROPERTIES_FILE: &str = "server.properties";
const LICENSE_ACCEPTED_TOKEN: &str = "eula=true";

/// Files and directories removed by `cleanup_server_dir`.
const CLEANUP_FILES: [&str; 1] = ["server.log"];
const CLEANUP_DIRS: [&str; 2] = ["crash-reports", "debug"];

pub fn baseline_properties() -> &'static str {
    BASELINE_PROPERTIES
}

pub fn license_path(server_dir: &Path) -> PathBuf {
    server_dir.join(LICENSE_FILE)
}

/// Reports whether the license marker is present and affirmative.
pub async fn check_license(server_dir: &Path) -> (bool, String) {
    let path = license_path(server_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) if content.to_lowercase().contains(LICENSE_ACCEPTED_TOKEN) => {
            (true, "license accepted".to_string())
        }
        Ok(_) => (false, "license not accepted".to_string()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            (false, format!("{LICENSE_FILE} does not exist"))
        }
        Err(err) => (false, format!("failed to read {LICENSE_FILE}: {err}")),
    }
}

pub fn license_template(generated_at: &str) -> String {
    format!(
        "#By changing the setting below to TRUE you are indicating your agreement to our EULA (https://aka.ms/MinecraftEULA).\n\
         #Generated by launcher\n\
         # {generated_at}\n\
         eula=true\n"
    )
}

pub async fn accept_license(server_dir: &Path) -> LauncherResult<()> {
    let path = license_path(server_dir);
    tokio::fs::write(&path, license_template(&current_timestamp()))
        .await
        .map_err(|err| LauncherError::LicenseNotAccepted(format!("failed to write {}: {err}", path.display())))?;
    info!(path = %path.display(), "license accepted");
    Ok(())
}

/// Launch counts as consent: a missing or negative marker is rewritten.
pub async fn ensure_license(server_dir: &Path) -> LauncherResult<()> {
    let (accepted, message) = check_license(server_dir).await;
    if accepted {
        return Ok(());
    }
    warn!(%message, "accepting license automatically before launch");
    accept_license(server_dir).await
}

/// Writes the baseline properties when none exist. Returns whether a file was created.
pub async fn ensure_default_properties(server_dir: &Path) -> LauncherResult<bool> {
    let path = server_dir.join(PROPERTIES_FILE);
    if tokio::fs::metadata(&path).await.is_ok() {
        return Ok(false);
    }
    tokio::fs::write(&path, BASELINE_PROPERTIES)
        .await
        .map_err(|err| LauncherError::io(&path, err))?;
    info!(path = %path.display(), "created default server properties");
    Ok(true)
}

/// Removes logs, crash reports and debug output. Worlds, configuration and
/// the server artifact are never touched. Returns the removed entries.
pub async fn cleanup_server_dir(server_dir: &Path) -> LauncherResult<Vec<String>> {
    let mut removed = Vec::new();
    for name in CLEANUP_FILES {
        let path = server_dir.join(name);
        if tokio::fs::metadata(&path).await.is_ok() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|err| LauncherError::io(&path, err))?;
            removed.push(name.to_string());
        }
    }
    for name in CLEANUP_DIRS {
        let path = server_dir.join(name);
        if tokio::fs::metadata(&path).await.is_ok() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|err| LauncherError::io(&path, err))?;
            removed.push(name.to_string());
        }
    }
    Ok(removed)
}

fn current_timestamp() -> String {
    let format = time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]");
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    format
        .ok()
        .and_then(|format| now.format(&format).ok())
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_carries_acceptance_token() {
        let text = license_template("2024-01-01 00:00:00");
        assert!(text.contains("eula=true"));
        assert!(text.contains("# 2024-01-01 00:00:00"));
        assert!(text.starts_with('#'));
    }

    #[test]
    fn baseline_has_core_keys() {
        let text = baseline_properties();
        for key in ["max-players=", "server-port=25565", "motd=", "difficulty=", "spawn-monsters="] {
            assert!(text.contains(key), "missing {key}");
        }
    }
}
