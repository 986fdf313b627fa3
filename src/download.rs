use crate::{
    cores,
    error::{LauncherError, LauncherResult},
    mirrors,
    models::{CoreType, ServerProfile},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const USER_AGENT: &str = concat!("launcher/", env!("CARGO_PKG_VERSION"));

/// "Fetch this URL to this path" collaborator. Transport details, retries
/// and progress reporting belong to the implementation.
#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch_to(&self, url: &str, dest: &Path) -> bool;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| format!("request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(format!("request failed: status {}", response.status()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| format!("failed to read response: {err}"))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
        }
        let partial = partial_path(dest);
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|err| format!("failed to write {}: {err}", partial.display()))?;
        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|err| format!("failed to move download into place: {err}"))
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for ReqwestFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> bool {
        match self.download(url, dest).await {
            Ok(()) => true,
            Err(message) => {
                warn!(%url, %message, "download failed");
                false
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// File name an artifact is saved under.
pub fn artifact_file_name(core_type: CoreType, version: &str) -> String {
    if core_type == CoreType::Vanilla {
        return "server.jar".to_string();
    }
    format!(
        "{}-{}.jar",
        cores::describe(core_type).name.to_lowercase(),
        version.trim()
    )
}

/// Resolves, fetches and installs an artifact, then points the profile at
/// it and re-runs detection. Returns the saved file name.
pub async fn download_artifact(
    fetcher: &dyn ArtifactFetcher,
    profile: &mut ServerProfile,
    core_type: CoreType,
    version: &str,
    build_hint: Option<&str>,
) -> LauncherResult<String> {
    let url = mirrors::resolve(core_type, version, profile.mirror_site, build_hint).ok_or_else(
        || LauncherError::DownloadUnresolvable {
            core_type,
            version: version.to_string(),
        },
    )?;

    let file_name = artifact_file_name(core_type, version);
    let dest = profile.server_dir.join(&file_name);
    info!(%url, dest = %dest.display(), "downloading server artifact");
    if !fetcher.fetch_to(&url, &dest).await {
        return Err(LauncherError::DownloadFailed { url });
    }

    profile.server_jar = file_name.clone();
    cores::detect_into(profile);
    profile.touch();
    Ok(file_name)
}
