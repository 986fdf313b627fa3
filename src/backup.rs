use crate::error::{LauncherError, LauncherResult};
use crate::models::BackupRecord;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const BACKUP_DIR: &str = "backups";
const NAME_PREFIX: &str = "backup_";
const NAME_FORMAT: &str = "[year][month][day]_[hour][minute][second]";

/// Top-level configuration files copied when present.
pub const BACKUP_FILES: [&str; 6] = [
    "server.properties",
    "eula.txt",
    "ops.json",
    "whitelist.json",
    "banned-players.json",
    "usercache.json",
];

/// World directories copied recursively when present.
pub const WORLD_DIRS: [&str; 3] = ["world", "world_nether", "world_the_end"];

pub fn backups_dir(server_dir: &Path) -> PathBuf {
    server_dir.join(BACKUP_DIR)
}

/// Snapshots configuration and worlds into `backups/backup_<timestamp>`.
///
/// The first failing copy aborts the run; the partial unit is left in place.
pub async fn create_backup(server_dir: &Path) -> LauncherResult<BackupRecord> {
    create_backup_at(server_dir, now_local()).await
}

/// Same as `create_backup`, with the unit named after `at`. Reusing a name
/// overwrites the files and replaces the world folders in that unit.
pub async fn create_backup_at(
    server_dir: &Path,
    at: time::OffsetDateTime,
) -> LauncherResult<BackupRecord> {
    let name = backup_name_for(at);
    let server_dir = server_dir.to_path_buf();
    let unit_name = name.clone();
    tokio::task::spawn_blocking(move || copy_unit(&server_dir, &unit_name))
        .await
        .map_err(|err| LauncherError::BackupPartialFailure {
            name: name.clone(),
            message: format!("backup task failed: {err}"),
        })??;

    info!(backup = %name, "backup created");
    Ok(BackupRecord {
        created_at: created_at_for(&name),
        name,
        size_bytes: None,
    })
}

fn copy_unit(server_dir: &Path, name: &str) -> LauncherResult<()> {
    let unit = backups_dir(server_dir).join(name);
    let partial = |message: String| LauncherError::BackupPartialFailure {
        name: name.to_string(),
        message,
    };

    std::fs::create_dir_all(&unit)
        .map_err(|err| partial(format!("failed to create {}: {err}", unit.display())))?;

    for file_name in BACKUP_FILES {
        let source = server_dir.join(file_name);
        if !source.is_file() {
            continue;
        }
        std::fs::copy(&source, unit.join(file_name))
            .map_err(|err| partial(format!("failed to copy {file_name}: {err}")))?;
    }

    for dir_name in WORLD_DIRS {
        let source = server_dir.join(dir_name);
        if !source.is_dir() {
            continue;
        }
        let target = unit.join(dir_name);
        if target.exists() {
            std::fs::remove_dir_all(&target)
                .map_err(|err| partial(format!("failed to clear stale {dir_name}: {err}")))?;
        }
        copy_dir_recursive(&source, &target)
            .map_err(|err| partial(format!("failed to copy {dir_name}: {err}")))?;
    }
    Ok(())
}

fn copy_dir_recursive(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&path, &destination)?;
        } else {
            std::fs::copy(&path, &destination)?;
        }
    }
    Ok(())
}

/// Backup unit names, newest first.
pub async fn list_backups(server_dir: &Path) -> LauncherResult<Vec<String>> {
    let root = backups_dir(server_dir);
    let mut entries = match tokio::fs::read_dir(&root).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(LauncherError::io(root, err)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| LauncherError::io(&root, err))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|kind| kind.is_dir())
            .unwrap_or(false);
        if is_dir {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort_by(|a, b| b.cmp(a));
    Ok(names)
}

pub async fn list_records(server_dir: &Path) -> LauncherResult<Vec<BackupRecord>> {
    Ok(list_backups(server_dir)
        .await?
        .into_iter()
        .map(|name| BackupRecord {
            created_at: created_at_for(&name),
            name,
            size_bytes: None,
        })
        .collect())
}

pub async fn delete_backup(server_dir: &Path, name: &str) -> LauncherResult<()> {
    let unit = unit_path(server_dir, name)?;
    if !unit.is_dir() {
        return Err(LauncherError::BackupNotFound(name.to_string()));
    }
    tokio::fs::remove_dir_all(&unit)
        .await
        .map_err(|err| LauncherError::io(&unit, err))?;
    info!(backup = %name, "backup deleted");
    Ok(())
}

/// Total bytes of all files in a unit.
pub async fn backup_size(server_dir: &Path, name: &str) -> LauncherResult<u64> {
    let unit = unit_path(server_dir, name)?;
    if !unit.is_dir() {
        return Err(LauncherError::BackupNotFound(name.to_string()));
    }
    tokio::task::spawn_blocking(move || dir_size(&unit).map_err(|err| LauncherError::io(&unit, err)))
        .await
        .map_err(|err| LauncherError::io(PathBuf::new(), std::io::Error::other(err)))?
}

fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let kind = entry.file_type()?;
        if kind.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Deletes the oldest units beyond `keep`. `keep == 0` keeps everything.
/// Returns the removed names.
pub async fn prune_backups(server_dir: &Path, keep: usize) -> LauncherResult<Vec<String>> {
    if keep == 0 {
        return Ok(Vec::new());
    }
    let names = list_backups(server_dir).await?;
    let mut removed = Vec::new();
    for name in names.into_iter().skip(keep) {
        match delete_backup(server_dir, &name).await {
            Ok(()) => removed.push(name),
            Err(err) => warn!(backup = %name, error = %err, "failed to prune backup"),
        }
    }
    Ok(removed)
}

fn unit_path(server_dir: &Path, name: &str) -> LauncherResult<PathBuf> {
    if !is_valid_unit_name(name) {
        return Err(LauncherError::BackupNotFound(name.to_string()));
    }
    Ok(backups_dir(server_dir).join(name))
}

/// Single path component, no traversal.
fn is_valid_unit_name(name: &str) -> bool {
    regex::Regex::new(r"^[A-Za-z0-9_.-]+$")
        .map(|re| re.is_match(name) && name != "." && name != "..")
        .unwrap_or(false)
}

pub fn backup_name_for(at: time::OffsetDateTime) -> String {
    let stamp = time::format_description::parse(NAME_FORMAT)
        .ok()
        .and_then(|format| at.format(&format).ok())
        .unwrap_or_else(|| at.unix_timestamp().to_string());
    format!("{NAME_PREFIX}{stamp}")
}

/// Recovers `YYYY-MM-DD HH:MM:SS` from a unit name, if it follows the scheme.
pub fn created_at_for(name: &str) -> Option<String> {
    let stamp = name.strip_prefix(NAME_PREFIX)?;
    let input = time::format_description::parse(NAME_FORMAT).ok()?;
    let parsed = time::PrimitiveDateTime::parse(stamp, &input).ok()?;
    let output =
        time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]").ok()?;
    parsed.format(&output).ok()
}

fn now_local() -> time::OffsetDateTime {
    time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc())
}
