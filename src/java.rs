use crate::error::{LauncherError, LauncherResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_RUNTIME: &str = "java";

#[cfg(windows)]
const WELL_KNOWN_RUNTIMES: &[&str] = &[
    "C:\\Program Files\\Java\\jdk-21\\bin\\java.exe",
    "C:\\Program Files\\Java\\jdk-17\\bin\\java.exe",
    "C:\\Program Files\\Java\\jdk-11\\bin\\java.exe",
    "C:\\Program Files\\Java\\jdk-8\\bin\\java.exe",
    "C:\\Program Files\\Java\\jre-21\\bin\\java.exe",
    "C:\\Program Files\\Java\\jre-17\\bin\\java.exe",
    "C:\\Program Files\\Java\\jre-8\\bin\\java.exe",
];

#[cfg(not(windows))]
const WELL_KNOWN_RUNTIMES: &[&str] = &["/usr/bin/java", "/usr/local/bin/java", "/opt/java/bin/java"];

/// Finds a runtime able to launch the server: `preferred` if its version
/// probe succeeds, otherwise the first existing well-known install path.
pub async fn locate_runtime(preferred: &Path) -> LauncherResult<PathBuf> {
    match probe_version(preferred).await {
        Ok(version) => {
            info!(runtime = %preferred.display(), version = %version.unwrap_or_default(), "java runtime found");
            return Ok(preferred.to_path_buf());
        }
        Err(message) => warn!(runtime = %preferred.display(), %message, "java probe failed, searching install locations"),
    }

    for candidate in WELL_KNOWN_RUNTIMES {
        let path = Path::new(candidate);
        if path.is_file() {
            info!(runtime = %path.display(), "using java runtime from install location");
            return Ok(path.to_path_buf());
        }
        debug!(runtime = %candidate, "not present");
    }

    Err(LauncherError::RuntimeNotFound)
}

/// Runs `<runtime> -version`; returns the reported version string if parseable.
pub async fn probe_version(runtime: &Path) -> Result<Option<String>, String> {
    let output = Command::new(runtime)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| format!("failed to run version probe: {err}"))?;

    if !output.status.success() {
        return Err(format!("version probe exited with {}", output.status));
    }

    // The JVM prints its banner on stderr.
    let banner = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    Ok(parse_version_banner(&banner))
}

pub fn parse_version_banner(banner: &str) -> Option<String> {
    let re = regex::Regex::new(r#"version "([^"]+)""#).ok()?;
    re.captures(banner)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openjdk_banner() {
        let banner = "openjdk version \"21.0.2\" 2024-01-16\nOpenJDK Runtime Environment (build 21.0.2+13)";
        assert_eq!(parse_version_banner(banner), Some("21.0.2".to_string()));
    }

    #[test]
    fn parses_legacy_banner() {
        let banner = "java version \"1.8.0_392\"\nJava(TM) SE Runtime Environment";
        assert_eq!(parse_version_banner(banner), Some("1.8.0_392".to_string()));
    }

    #[test]
    fn garbage_banner_has_no_version() {
        assert_eq!(parse_version_banner("command not found"), None);
    }

    #[tokio::test]
    async fn missing_runtime_probe_fails() {
        let result = probe_version(Path::new("/nonexistent/bin/java-does-not-exist")).await;
        assert!(result.is_err());
    }
}
