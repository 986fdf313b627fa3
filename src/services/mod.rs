use launcher::{
    backup, cores,
    cores::Identification,
    download::{self, ArtifactFetcher},
    models::{BackupRecord, CoreType, MirrorId, ServerProfile},
    runner::{RunStatus, ServerRunner, StopOutcome},
    server_files, storage,
    tasks::BackgroundTask,
    LauncherResult,
};
use serde::Serialize;
use std::{path::Path, sync::Arc};
use sysinfo::{Pid, System};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// State shared by the console and the HTTP API.
#[derive(Clone)]
pub struct AppState {
    pub profile: Arc<RwLock<ServerProfile>>,
    pub runner: ServerRunner,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub system: Arc<Mutex<System>>,
}

#[derive(Debug, Serialize)]
pub struct ServerOverview {
    #[serde(flatten)]
    pub run: RunStatus,
    pub uptime: Option<String>,
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub core_name: &'static str,
    pub license_accepted: bool,
    pub backup_count: usize,
    pub settings: ServerProfile,
}

impl AppState {
    /// Loads the profile for `server_dir`, refreshing the detected core and
    /// version before anything else reads it.
    pub async fn load(
        server_dir: &Path,
        runner: ServerRunner,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> LauncherResult<Self> {
        let mut profile = storage::load_profile(server_dir).await?;
        let before = profile.clone();
        cores::detect_into(&mut profile);
        if profile != before {
            profile.touch();
            storage::save_profile(&profile).await?;
        }
        info!(
            server_dir = %profile.server_dir.display(),
            core = %profile.core_type,
            "profile loaded"
        );
        Ok(Self {
            profile: Arc::new(RwLock::new(profile)),
            runner,
            fetcher,
            system: Arc::new(Mutex::new(System::new())),
        })
    }

    pub async fn profile(&self) -> ServerProfile {
        self.profile.read().await.clone()
    }

    async fn update_profile<F>(&self, change: F) -> LauncherResult<ServerProfile>
    where
        F: FnOnce(&mut ServerProfile),
    {
        let mut profile = self.profile.write().await;
        change(&mut profile);
        profile.touch();
        storage::save_profile(&profile).await?;
        Ok(profile.clone())
    }

    pub fn start(&self) -> BackgroundTask<LauncherResult<()>> {
        let state = self.clone();
        BackgroundTask::spawn("start", async move {
            let profile = state.profile().await;
            state.runner.start(&profile).await
        })
    }

    pub fn stop(&self, force: bool) -> BackgroundTask<LauncherResult<StopOutcome>> {
        let runner = self.runner.clone();
        let name = if force { "force-stop" } else { "stop" };
        BackgroundTask::spawn(name, async move { runner.stop(force).await })
    }

    pub fn restart(&self) -> BackgroundTask<LauncherResult<()>> {
        let state = self.clone();
        BackgroundTask::spawn("restart", async move {
            let profile = state.profile().await;
            state.runner.restart(&profile).await
        })
    }

    pub fn create_backup(&self) -> BackgroundTask<LauncherResult<BackupRecord>> {
        let state = self.clone();
        BackgroundTask::spawn("backup", async move {
            let server_dir = state.profile().await.server_dir;
            backup::create_backup(&server_dir).await
        })
    }

    /// Applies the profile's `max_backups` limit.
    pub async fn prune_backups(&self) -> LauncherResult<Vec<String>> {
        let profile = self.profile().await;
        backup::prune_backups(&profile.server_dir, profile.max_backups).await
    }

    pub async fn backups(&self) -> LauncherResult<Vec<BackupRecord>> {
        let server_dir = self.profile().await.server_dir;
        let mut records = backup::list_records(&server_dir).await?;
        for record in &mut records {
            record.size_bytes = backup::backup_size(&server_dir, &record.name).await.ok();
        }
        Ok(records)
    }

    pub async fn delete_backup(&self, name: &str) -> LauncherResult<()> {
        let server_dir = self.profile().await.server_dir;
        backup::delete_backup(&server_dir, name).await
    }

    pub async fn accept_license(&self) -> LauncherResult<()> {
        let server_dir = self.profile().await.server_dir;
        server_files::accept_license(&server_dir).await
    }

    pub async fn cleanup(&self) -> LauncherResult<Vec<String>> {
        if self.runner.is_running().await {
            return Err(launcher::LauncherError::AlreadyRunning(
                self.runner.status().await.state,
            ));
        }
        let server_dir = self.profile().await.server_dir;
        server_files::cleanup_server_dir(&server_dir).await
    }

    pub async fn detect(&self) -> LauncherResult<(ServerProfile, Identification)> {
        let mut profile = self.profile.write().await;
        let identification = cores::detect_into(&mut profile);
        profile.touch();
        storage::save_profile(&profile).await?;
        Ok((profile.clone(), identification))
    }

    pub async fn set_mirror(&self, mirror: MirrorId) -> LauncherResult<ServerProfile> {
        self.update_profile(|profile| profile.mirror_site = mirror).await
    }

    /// Downloads into a snapshot so the profile lock is not held over the
    /// network, then commits the updated profile.
    pub async fn download(
        &self,
        core_type: CoreType,
        version: &str,
        build_hint: Option<&str>,
    ) -> LauncherResult<String> {
        let mut snapshot = self.profile().await;
        let file_name = download::download_artifact(
            self.fetcher.as_ref(),
            &mut snapshot,
            core_type,
            version,
            build_hint,
        )
        .await?;
        storage::save_profile(&snapshot).await?;
        *self.profile.write().await = snapshot;
        Ok(file_name)
    }

    pub async fn overview(&self) -> ServerOverview {
        let run = self.runner.status().await;
        let settings = self.profile().await;
        let (license_accepted, _) = server_files::check_license(&settings.server_dir).await;
        let backup_count = backup::list_backups(&settings.server_dir)
            .await
            .map(|names| names.len())
            .unwrap_or(0);
        let (cpu, ram) = match run.pid {
            Some(pid) => process_metrics(&self.system, pid).await,
            None => (None, None),
        };
        ServerOverview {
            uptime: run.uptime_secs.map(format_duration),
            cpu,
            ram,
            core_name: cores::describe(settings.core_type).name,
            license_accepted,
            backup_count,
            run,
            settings,
        }
    }
}

async fn process_metrics(system: &Mutex<System>, pid: u32) -> (Option<String>, Option<String>) {
    let mut system = system.lock().await;
    system.refresh_processes();
    match system.process(Pid::from_u32(pid)) {
        Some(process) => {
            let cpu = format!("{:.1}%", process.cpu_usage());
            let memory_mb = (process.memory() as f64) / (1024.0 * 1024.0);
            (Some(cpu), Some(format!("{memory_mb:.1} MB")))
        }
        None => (None, None),
    }
}

pub fn format_duration(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}h {minutes}m {seconds}s")
}
