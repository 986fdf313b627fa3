use crate::services::AppState;
use launcher::{
    cores, mirrors,
    models::{CoreType, MirrorId},
    server_files, LauncherError, LauncherResult,
};
use std::fmt::Display;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::warn;

const DEFAULT_LOG_LINES: usize = 50;

const HELP: &str = "\
commands:
  start                          launch the server
  stop                           ask the server to stop, escalating after a timeout
  force-stop                     terminate the server immediately
  restart                        stop, wait, start
  accept-license                 write an accepted eula.txt
  status                         show process and profile state
  backup create|list|prune       manage snapshots under backups/
  backup delete <name>           remove one snapshot
  detect                         re-identify the server artifact
  url <core> <version> [build]   print the download URL for a core
  download <core> <version> [build]
  mirror <mslmc|bmclapi|mc>      select the download mirror
  cleanup                        remove logs and crash reports
  logs [n]                       print recent console output
  send <text>                    write a line to the server console
  help                           show this list
  exit                           stop the server if running and quit";

enum Flow {
    Continue,
    Exit,
}

/// Reads commands from stdin until `exit` or end of input.
pub async fn run(state: AppState) {
    spawn_output_printer(&state);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "failed to read console input");
                break;
            }
        };
        if let Flow::Exit = handle_line(&state, line.trim()).await {
            break;
        }
    }
    shutdown(&state).await;
}

fn spawn_output_printer(state: &AppState) {
    let mut receiver = state.runner.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(line) => println!("{line}"),
                Err(RecvError::Lagged(skipped)) => println!("... {skipped} lines skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown(state: &AppState) {
    if !state.runner.is_running().await {
        return;
    }
    println!("stopping server before exit...");
    report("stop", flatten(state.stop(false).join().await));
}

async fn handle_line(state: &AppState, line: &str) -> Flow {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Flow::Continue;
    };
    let args: Vec<&str> = parts.collect();

    match command {
        "start" => {
            println!("starting server...");
            let task = state.start();
            tokio::spawn(async move { report("start", flatten(task.join().await)) });
        }
        "stop" | "force-stop" => {
            let force = command == "force-stop";
            println!("stopping server...");
            let task = state.stop(force);
            tokio::spawn(async move {
                match flatten(task.join().await) {
                    Ok(outcome) => println!("stop: {}", describe_outcome(outcome)),
                    Err(err) => print_error("stop", &err),
                }
            });
        }
        "restart" => {
            println!("restarting server...");
            let task = state.restart();
            tokio::spawn(async move { report("restart", flatten(task.join().await)) });
        }
        "accept-license" => report("accept-license", state.accept_license().await),
        "status" => print_status(state).await,
        "backup" => handle_backup(state, &args).await,
        "detect" => match state.detect().await {
            Ok((profile, identification)) => println!(
                "core: {} ({:?}), version: {}, artifact: {}",
                cores::describe(identification.core_type).name,
                identification.confidence,
                display_or_unknown(&profile.minecraft_version),
                display_or_unknown(&profile.server_jar),
            ),
            Err(err) => print_error("detect", &err),
        },
        "url" => match parse_core_args(&args) {
            Some((core_type, version, build)) => {
                let mirror = state.profile().await.mirror_site;
                match mirrors::resolve(core_type, version, mirror, build) {
                    Some(url) => println!("{url}"),
                    None => println!(
                        "no download URL for {core_type} {version}; download it manually from {}",
                        cores::describe(core_type).website
                    ),
                }
            }
            None => println!("usage: url <core> <version> [build]"),
        },
        "download" => match parse_core_args(&args) {
            Some((core_type, version, build)) => {
                println!("downloading {core_type} {version}...");
                let state = state.clone();
                let version = version.to_string();
                let build = build.map(str::to_string);
                tokio::spawn(async move {
                    match state.download(core_type, &version, build.as_deref()).await {
                        Ok(file_name) => println!("download: saved {file_name}"),
                        Err(err) => print_error("download", &err),
                    }
                });
            }
            None => println!("usage: download <core> <version> [build]"),
        },
        "mirror" => match args.first().and_then(|tag| MirrorId::from_tag(tag)) {
            Some(mirror) => match state.set_mirror(mirror).await {
                Ok(_) => println!("mirror: {}", mirrors::describe(mirror).name),
                Err(err) => print_error("mirror", &err),
            },
            None => {
                let known: Vec<&str> = MirrorId::ALL.iter().map(MirrorId::as_str).collect();
                println!("usage: mirror <{}>", known.join("|"));
            }
        },
        "cleanup" => match state.cleanup().await {
            Ok(removed) if removed.is_empty() => println!("cleanup: nothing to remove"),
            Ok(removed) => println!("cleanup: removed {}", removed.join(", ")),
            Err(err) => print_error("cleanup", &err),
        },
        "logs" => {
            let limit = args
                .first()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(DEFAULT_LOG_LINES);
            let mut lines = state.runner.tail(limit).await;
            if lines.is_empty() {
                lines = state.runner.tail_persisted(limit).await;
            }
            for line in lines {
                println!("{line}");
            }
        }
        "send" => {
            let text = args.join(" ");
            if text.is_empty() {
                println!("usage: send <text>");
            } else {
                report("send", state.runner.send_command(&text).await);
            }
        }
        "help" => println!("{HELP}"),
        "exit" | "quit" => return Flow::Exit,
        other => println!("unknown command '{other}', type 'help' for a list"),
    }
    Flow::Continue
}

async fn handle_backup(state: &AppState, args: &[&str]) {
    match args {
        ["create"] => {
            println!("creating backup...");
            let task = state.create_backup();
            tokio::spawn(async move {
                match flatten(task.join().await) {
                    Ok(record) => println!("backup: created {}", record.name),
                    Err(err) => print_error("backup", &err),
                }
            });
        }
        ["list"] => match state.backups().await {
            Ok(records) if records.is_empty() => println!("no backups"),
            Ok(records) => {
                for record in records {
                    let size = record
                        .size_bytes
                        .map(|bytes| format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)))
                        .unwrap_or_else(|| "?".to_string());
                    let created = record.created_at.unwrap_or_else(|| "-".to_string());
                    println!("{:<24} {:<20} {size}", record.name, created);
                }
            }
            Err(err) => print_error("backup list", &err),
        },
        ["delete", name] => report("backup delete", state.delete_backup(name).await),
        ["prune"] => match state.prune_backups().await {
            Ok(removed) if removed.is_empty() => println!("prune: nothing to remove"),
            Ok(removed) => println!("prune: removed {}", removed.join(", ")),
            Err(err) => print_error("prune", &err),
        },
        _ => println!("usage: backup create|list|delete <name>|prune"),
    }
}

async fn print_status(state: &AppState) {
    let overview = state.overview().await;
    let settings = &overview.settings;
    println!("state:      {}", overview.run.state);
    if let Some(pid) = overview.run.pid {
        println!("pid:        {pid}");
    }
    if let Some(uptime) = &overview.uptime {
        println!("uptime:     {uptime}");
    }
    if let (Some(cpu), Some(ram)) = (&overview.cpu, &overview.ram) {
        println!("usage:      {cpu} cpu, {ram}");
    }
    println!("directory:  {}", settings.server_dir.display());
    println!("artifact:   {}", display_or_unknown(&settings.server_jar));
    let descriptor = cores::describe(settings.core_type);
    println!("core:       {} ({})", overview.core_name, descriptor.description);
    println!("version:    {}", display_or_unknown(&settings.minecraft_version));
    println!("runtime:    {}", state.runner.runtime().display());
    println!("java opts:  {}", settings.java_opts);
    println!("mirror:     {}", mirrors::describe(settings.mirror_site).name);
    let (_, license) = server_files::check_license(&settings.server_dir).await;
    println!("license:    {license}");
    println!("backups:    {}", overview.backup_count);
}

fn parse_core_args<'a>(args: &[&'a str]) -> Option<(CoreType, &'a str, Option<&'a str>)> {
    match args {
        [core, version] => Some((CoreType::from_tag(core), *version, None)),
        [core, version, build] => Some((CoreType::from_tag(core), *version, Some(*build))),
        _ => None,
    }
}

fn describe_outcome(outcome: launcher::runner::StopOutcome) -> &'static str {
    use launcher::runner::StopOutcome;
    match outcome {
        StopOutcome::AlreadyStopped => "server was not running",
        StopOutcome::Graceful => "server stopped",
        StopOutcome::Escalated => "server did not stop in time and was terminated",
        StopOutcome::Forced => "server terminated",
    }
}

fn display_or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "unknown"
    } else {
        value
    }
}

fn flatten<T>(joined: LauncherResult<LauncherResult<T>>) -> LauncherResult<T> {
    joined.and_then(|result| result)
}

fn report<T>(label: &str, result: LauncherResult<T>) {
    match result {
        Ok(_) => println!("{label}: ok"),
        Err(err) => print_error(label, &err),
    }
}

fn print_error(label: impl Display, err: &LauncherError) {
    println!("{label} failed [{}]: {err}", err.as_label());
}
