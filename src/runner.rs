use crate::{
    error::{LauncherError, LauncherResult},
    java,
    models::ServerProfile,
    server_files, storage,
};
use std::io::{Read, Seek, SeekFrom};
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::{Duration, Instant},
};
use sysinfo::{Pid, Signal, System};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, Command},
    sync::{broadcast, Mutex},
};
use tracing::{error, info, warn};

const MAX_LOG_LINES: usize = 500;
const LOG_FILE_NAME: &str = "server.log";
const STOP_COMMAND: &str = "stop";

/// How long a graceful `stop` waits for the server to exit on its own.
pub const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(30);
/// Grace window between termination requests during escalation.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(2);
/// Settle time between stop and start on restart.
pub const RESTART_DELAY: Duration = Duration::from_secs(3);
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_secs(1);
const ESCALATION_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunState::Stopped => "stopped",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
        };
        f.write_str(label)
    }
}

/// How a `stop` call reached `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// Nothing was running; no process operations were performed.
    AlreadyStopped,
    /// The server honoured the in-band stop command.
    Graceful,
    /// The stop command timed out and termination signals were needed.
    Escalated,
    /// Termination was requested up front.
    Forced,
}

/// Supervises at most one server process.
#[derive(Clone)]
pub struct ServerRunner {
    inner: Arc<Mutex<RunInner>>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    sender: broadcast::Sender<String>,
    runtime: PathBuf,
}

struct RunInner {
    state: RunState,
    child: Option<Child>,
    pid: Option<u32>,
    launched_at: Option<Instant>,
    started_at: Option<u64>,
    profile: Option<ServerProfile>,
    buffer: VecDeque<String>,
    log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunStatus {
    pub state: RunState,
    pub running: bool,
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub uptime_secs: Option<u64>,
    /// Profile of the current or most recent launch attempt.
    pub profile: Option<ServerProfile>,
}

impl Default for ServerRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerRunner {
    pub fn new() -> Self {
        Self::with_runtime(java::DEFAULT_RUNTIME)
    }

    /// Uses `runtime` as the preferred interpreter instead of `java` on PATH.
    pub fn with_runtime(runtime: impl Into<PathBuf>) -> Self {
        let (sender, _) = broadcast::channel(200);
        let inner = RunInner {
            state: RunState::Stopped,
            child: None,
            pid: None,
            launched_at: None,
            started_at: None,
            profile: None,
            buffer: VecDeque::new(),
            log_path: None,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            stdin: Arc::new(Mutex::new(None)),
            sender,
            runtime: runtime.into(),
        }
    }

    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    /// Registers an output sink. Every line drained from the process is
    /// delivered to all live receivers.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub async fn status(&self) -> RunStatus {
        let mut inner = self.inner.lock().await;
        refresh_liveness(&mut inner);
        let running = inner.state == RunState::Running;
        RunStatus {
            state: inner.state,
            running,
            pid: inner.pid,
            started_at: inner.started_at,
            uptime_secs: inner
                .launched_at
                .filter(|_| running)
                .map(|launched| launched.elapsed().as_secs()),
            profile: inner.profile.clone(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.status().await.running
    }

    pub async fn tail(&self, limit: usize) -> Vec<String> {
        let inner = self.inner.lock().await;
        let start = inner.buffer.len().saturating_sub(limit);
        inner.buffer.iter().skip(start).cloned().collect()
    }

    pub async fn tail_persisted(&self, limit: usize) -> Vec<String> {
        let path = {
            let inner = self.inner.lock().await;
            inner.log_path.clone()
        };

        if let Some(path) = path {
            if let Ok(lines) = read_last_lines(path, limit).await {
                return lines;
            }
        }

        self.tail(limit).await
    }

    /// Launches the server described by `profile`.
    ///
    /// Rejected unless the runner is `Stopped`. Any failure after the state
    /// check returns the runner to `Stopped`. The transition runs on its own
    /// task, so dropping the returned future never strands `Starting`.
    pub async fn start(&self, profile: &ServerProfile) -> LauncherResult<()> {
        let runner = self.clone();
        let profile = profile.clone();
        tokio::spawn(async move { runner.run_start(&profile).await })
            .await
            .map_err(|err| {
                error!(error = %err, "start transition aborted");
                LauncherError::TaskCancelled("start".to_string())
            })?
    }

    async fn run_start(&self, profile: &ServerProfile) -> LauncherResult<()> {
        {
            let mut inner = self.inner.lock().await;
            refresh_liveness(&mut inner);
            if inner.state != RunState::Stopped {
                return Err(LauncherError::AlreadyRunning(inner.state));
            }
            inner.state = RunState::Starting;
            inner.profile = Some(profile.clone());
        }

        match self.launch(profile).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "server start failed");
                let mut inner = self.inner.lock().await;
                clear_process(&mut inner);
                Err(err)
            }
        }
    }

    async fn launch(&self, profile: &ServerProfile) -> LauncherResult<()> {
        let artifact = match profile.artifact_path() {
            Some(path) if path.is_file() => path,
            Some(path) => return Err(LauncherError::ArtifactMissing(path.display().to_string())),
            None => {
                return Err(LauncherError::ArtifactMissing(
                    "no server artifact configured".to_string(),
                ))
            }
        };

        let runtime = java::locate_runtime(&self.runtime).await?;
        server_files::ensure_license(&profile.server_dir).await?;
        server_files::ensure_default_properties(&profile.server_dir).await?;

        let args = launch_args(profile, &artifact);
        info!(
            core_type = %profile.core_type,
            version = %profile.minecraft_version,
            command = %format!("{} {}", runtime.display(), args.join(" ")),
            "starting server"
        );

        let mut command = Command::new(&runtime);
        command
            .current_dir(&profile.server_dir)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let mut child = command
            .spawn()
            .map_err(|err| LauncherError::ProcessSpawnFailed(err.to_string()))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdin = child.stdin.take();
        {
            let mut inner = self.inner.lock().await;
            inner.pid = child.id();
            inner.launched_at = Some(Instant::now());
            inner.started_at = Some(current_epoch_seconds());
            inner.child = Some(child);
            inner.profile = Some(profile.clone());
            inner.buffer.clear();
            inner.log_path = Some(profile.server_dir.join(LOG_FILE_NAME));
            inner.state = RunState::Running;
            info!(pid = ?inner.pid, "server started");
        }
        *self.stdin.lock().await = stdin;

        if let Some(stdout) = stdout {
            self.spawn_reader(stdout);
        }
        if let Some(stderr) = stderr {
            self.spawn_reader(stderr);
        }

        let mut saved = profile.clone();
        saved.touch();
        if let Err(err) = storage::save_profile(&saved).await {
            warn!(error = %err, "failed to persist profile after start");
        }
        Ok(())
    }

    fn spawn_reader<R>(&self, stream: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            // A closed stream is the normal end of a session.
            while let Ok(Some(line)) = lines.next_line().await {
                manager.push_line(line).await;
            }
        });
    }

    /// Writes one line to the server console. Only valid while `Running`.
    pub async fn send_command(&self, text: &str) -> LauncherResult<()> {
        if !self.is_running().await {
            self.release_stdin_if_stopped().await;
            return Err(LauncherError::ProcessNotRunning);
        }
        self.write_line(text).await
    }

    async fn write_line(&self, text: &str) -> LauncherResult<()> {
        let mut line = text.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let mut stdin = self.stdin.lock().await;
        let writer = stdin.as_mut().ok_or(LauncherError::ProcessNotRunning)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Stops the server and always leaves the runner `Stopped`.
    ///
    /// Graceful: send `stop`, wait up to [`GRACEFUL_STOP_TIMEOUT`], then
    /// escalate to a termination signal and finally an unconditional kill.
    /// Forced: kill right away.
    ///
    /// Like `start`, the body runs on its own task so an abandoned caller
    /// cannot leave the runner in `Stopping`.
    pub async fn stop(&self, force: bool) -> LauncherResult<StopOutcome> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_stop(force).await })
            .await
            .map_err(|err| {
                error!(error = %err, "stop transition aborted");
                LauncherError::TaskCancelled("stop".to_string())
            })?
    }

    async fn run_stop(&self, force: bool) -> LauncherResult<StopOutcome> {
        let pid = {
            let mut inner = self.inner.lock().await;
            refresh_liveness(&mut inner);
            match inner.state {
                RunState::Stopping => return Err(LauncherError::InvalidState(RunState::Stopping)),
                RunState::Starting => return Err(LauncherError::InvalidState(RunState::Starting)),
                RunState::Stopped | RunState::Running => {}
            }
            if inner.child.is_none() {
                clear_process(&mut inner);
                *self.stdin.lock().await = None;
                return Ok(StopOutcome::AlreadyStopped);
            }
            inner.state = RunState::Stopping;
            inner.pid
        };

        let outcome = if force {
            info!(?pid, "force-stopping server");
            self.kill_now().await;
            if !self.wait_for_exit(KILL_GRACE_PERIOD, ESCALATION_POLL_INTERVAL).await {
                self.kill_by_pid(pid).await;
            }
            StopOutcome::Forced
        } else {
            info!(?pid, "sending stop command");
            if let Err(err) = self.write_line(STOP_COMMAND).await {
                warn!(error = %err, "failed to send stop command");
            }
            if self.wait_for_exit(GRACEFUL_STOP_TIMEOUT, LIVENESS_POLL_INTERVAL).await {
                StopOutcome::Graceful
            } else {
                warn!(?pid, timeout = ?GRACEFUL_STOP_TIMEOUT, "stop timeout, escalating to termination");
                self.terminate(pid).await;
                if !self.wait_for_exit(KILL_GRACE_PERIOD, ESCALATION_POLL_INTERVAL).await {
                    self.kill_now().await;
                    self.kill_by_pid(pid).await;
                }
                StopOutcome::Escalated
            }
        };

        self.finish_stop().await;
        info!(?outcome, "server stopped");
        Ok(outcome)
    }

    /// Graceful stop (when running), settle delay, then start.
    pub async fn restart(&self, profile: &ServerProfile) -> LauncherResult<()> {
        let outcome = self.stop(false).await?;
        if outcome != StopOutcome::AlreadyStopped {
            tokio::time::sleep(RESTART_DELAY).await;
        }
        self.start(profile).await
    }

    /// Polls liveness until the child exits or `timeout` elapses.
    async fn wait_for_exit(&self, timeout: Duration, interval: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_exited().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn has_exited(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(Some(_)) => true,
                Ok(None) => false,
                Err(err) => {
                    warn!(error = %err, "liveness check failed");
                    false
                }
            },
            None => true,
        }
    }

    /// Polite termination request. Falls back to the child handle where
    /// signals are unavailable.
    async fn terminate(&self, pid: Option<u32>) {
        if let Some(pid) = pid {
            let mut system = System::new();
            system.refresh_processes();
            if let Some(process) = system.process(Pid::from_u32(pid)) {
                if process.kill_with(Signal::Term).is_some() {
                    return;
                }
            }
        }
        self.kill_now().await;
    }

    async fn kill_now(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(child) = inner.child.as_mut() {
            if let Err(err) = child.start_kill() {
                warn!(error = %err, "failed to kill server process");
            }
        }
    }

    /// Last resort, addressed by process id.
    async fn kill_by_pid(&self, pid: Option<u32>) {
        let Some(pid) = pid else { return };
        if self.has_exited().await {
            return;
        }

        #[cfg(windows)]
        {
            let result = Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if let Err(err) = result {
                error!(pid, error = %err, "taskkill failed");
            }
        }

        #[cfg(not(windows))]
        {
            let mut system = System::new();
            system.refresh_processes();
            match system.process(Pid::from_u32(pid)) {
                Some(process) => {
                    if !process.kill() {
                        error!(pid, "unconditional kill failed");
                    }
                }
                None => warn!(pid, "process vanished before kill"),
            }
        }
    }

    /// Reaps the child outside the lock so `status()` stays responsive,
    /// then clears the handle.
    async fn finish_stop(&self) {
        let (pid, child) = {
            let mut inner = self.inner.lock().await;
            (inner.pid, inner.child.take())
        };
        if let Some(mut child) = child {
            if tokio::time::timeout(KILL_GRACE_PERIOD, child.wait()).await.is_err() {
                error!(?pid, "process did not exit after kill; marking stopped");
            }
        }
        let mut inner = self.inner.lock().await;
        clear_process(&mut inner);
        // Cleared under the state lock so a launch that follows keeps its writer.
        *self.stdin.lock().await = None;
    }

    /// Drops a writer left behind by a process that exited on its own.
    async fn release_stdin_if_stopped(&self) {
        let inner = self.inner.lock().await;
        if inner.state == RunState::Stopped {
            *self.stdin.lock().await = None;
        }
    }

    async fn push_line(&self, line: String) {
        let log_path = {
            let mut inner = self.inner.lock().await;
            if inner.buffer.len() >= MAX_LOG_LINES {
                inner.buffer.pop_front();
            }
            inner.buffer.push_back(line.clone());
            inner.log_path.clone()
        };
        if let Some(path) = log_path {
            let _ = append_line_to_file(&path, &line).await;
        }
        let _ = self.sender.send(line);
    }
}

/// Runtime arguments: launch options, the artifact, and `nogui` unless the
/// core is a mod loader.
pub fn launch_args(profile: &ServerProfile, artifact: &Path) -> Vec<String> {
    let mut args = profile.launch_options();
    args.push("-jar".to_string());
    args.push(artifact.display().to_string());
    if !profile.core_type.is_mod_loader() {
        args.push("nogui".to_string());
    }
    args
}

/// Applies the `Running -> Stopped` edge for a process that exited on its own.
fn refresh_liveness(inner: &mut RunInner) {
    if inner.state != RunState::Running {
        return;
    }
    if let Some(child) = inner.child.as_mut() {
        match child.try_wait() {
            Ok(Some(status)) => {
                info!(pid = ?inner.pid, %status, "server exited");
                clear_process(inner);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "liveness check failed"),
        }
    } else {
        clear_process(inner);
    }
}

fn clear_process(inner: &mut RunInner) {
    inner.state = RunState::Stopped;
    inner.child = None;
    inner.pid = None;
    inner.launched_at = None;
    inner.started_at = None;
}

fn current_epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

async fn append_line_to_file(path: &Path, line: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| format!("failed to create log dir: {err}"))?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|err| format!("failed to open log file: {err}"))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|err| format!("failed to write log: {err}"))?;
    file.write_all(b"\n")
        .await
        .map_err(|err| format!("failed to write log newline: {err}"))?;
    Ok(())
}

async fn read_last_lines(path: PathBuf, limit: usize) -> Result<Vec<String>, String> {
    tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&path)
            .map_err(|err| format!("failed to open log file: {err}"))?;
        let mut position = file
            .metadata()
            .map_err(|err| format!("failed to read log metadata: {err}"))?
            .len();
        if position == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = Vec::new();
        let mut newline_count = 0usize;
        let chunk_size: u64 = 8192;

        while position > 0 && newline_count <= limit {
            let read_size = position.min(chunk_size);
            position -= read_size;
            file.seek(SeekFrom::Start(position))
                .map_err(|err| format!("failed to seek log file: {err}"))?;

            let mut chunk = vec![0u8; read_size as usize];
            file.read_exact(&mut chunk)
                .map_err(|err| format!("failed to read log file: {err}"))?;
            newline_count += chunk.iter().filter(|&&byte| byte == b'\n').count();
            buffer.splice(0..0, chunk);
        }

        let text = String::from_utf8_lossy(&buffer);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(limit);
        Ok(lines[start..].iter().map(|line| (*line).to_string()).collect())
    })
    .await
    .map_err(|err| format!("failed to read log tail: {err}"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CoreType;
    use tokio_stream::wrappers::BroadcastStream;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn tail_returns_last_lines() {
        let manager = ServerRunner::new();
        for idx in 0..10 {
            manager.push_line(format!("line-{idx}")).await;
        }

        let tail = manager.tail(3).await;
        assert_eq!(tail, vec!["line-7", "line-8", "line-9"]);
    }

    #[tokio::test]
    async fn subscribers_receive_lines() {
        let manager = ServerRunner::new();
        let receiver = manager.subscribe();
        let mut stream = BroadcastStream::new(receiver).filter_map(|message| message.ok());

        manager.push_line("Done (3.2s)!".to_string()).await;

        let next = stream.next().await.expect("missing line");
        assert_eq!(next, "Done (3.2s)!");
    }

    #[tokio::test]
    async fn stop_when_idle_is_a_no_op() {
        let manager = ServerRunner::new();
        assert_eq!(manager.stop(false).await.expect("stop"), StopOutcome::AlreadyStopped);
        assert_eq!(manager.stop(true).await.expect("stop"), StopOutcome::AlreadyStopped);
        let status = manager.status().await;
        assert_eq!(status.state, RunState::Stopped);
        assert!(status.pid.is_none());
    }

    #[tokio::test]
    async fn send_command_requires_running_process() {
        let manager = ServerRunner::new();
        let err = manager.send_command("say hi").await.expect_err("should fail");
        assert!(matches!(err, LauncherError::ProcessNotRunning));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_after_exit_releases_the_old_writer() {
        let manager = ServerRunner::new();
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("spawn cat");
        *manager.stdin.lock().await = child.stdin.take();

        let err = manager.send_command("say hi").await.expect_err("not running");
        assert!(matches!(err, LauncherError::ProcessNotRunning));
        assert!(manager.stdin.lock().await.is_none());
        child.wait().await.expect("cat exits on eof");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn status_answers_while_a_stop_reaps_the_child() {
        let manager = ServerRunner::new();
        let child = Command::new("sleep")
            .arg("5")
            .kill_on_drop(true)
            .spawn()
            .expect("spawn sleep");
        {
            let mut inner = manager.inner.lock().await;
            inner.pid = child.id();
            inner.child = Some(child);
            inner.state = RunState::Stopping;
        }

        let reaper = manager.clone();
        let finishing = tokio::spawn(async move { reaper.finish_stop().await });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = tokio::time::timeout(Duration::from_millis(500), manager.status())
            .await
            .expect("status blocked by reaping");
        assert_eq!(status.state, RunState::Stopping);

        finishing.await.expect("finish");
        let status = manager.status().await;
        assert_eq!(status.state, RunState::Stopped);
        assert!(status.pid.is_none());
    }

    #[test]
    fn plugin_servers_launch_headless() {
        let mut profile = ServerProfile::new("/srv/mc");
        profile.java_opts = "-Xmx4G  -XX:+UseG1GC".to_string();
        profile.core_type = CoreType::Paper;
        let args = launch_args(&profile, Path::new("/srv/mc/paper.jar"));
        assert_eq!(args, vec!["-Xmx4G", "-XX:+UseG1GC", "-jar", "/srv/mc/paper.jar", "nogui"]);
    }

    #[test]
    fn mod_loaders_launch_without_nogui() {
        let mut profile = ServerProfile::new("/srv/mc");
        for core in [CoreType::Forge, CoreType::NeoForge, CoreType::Fabric] {
            profile.core_type = core;
            let args = launch_args(&profile, Path::new("/srv/mc/server.jar"));
            assert_eq!(args.last().map(String::as_str), Some("/srv/mc/server.jar"));
        }
    }
}
