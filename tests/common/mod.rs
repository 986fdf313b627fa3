#![allow(dead_code)]

use rand::{distributions::Alphanumeric, Rng};
use std::path::{Path, PathBuf};

/// Scratch directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        let path = std::env::temp_dir().join(format!("launcher-{prefix}-{suffix}"));
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// How the fake runtime reacts to shutdown requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behaviour {
    /// Exits on `stop` and on SIGTERM.
    Obedient,
    /// Exits on `stop`; SIGTERM is trapped.
    IgnoresTerm,
    /// Echoes `stop` like any other line and traps SIGTERM, so only a kill ends it.
    IgnoresStop,
}

/// Writes a shell script standing in for the `java` runtime.
///
/// `-version` prints a banner and exits. Any other invocation echoes its
/// arguments, then echoes every stdin line.
#[cfg(unix)]
pub fn fake_runtime(dir: &Path, behaviour: Behaviour) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let trap = match behaviour {
        Behaviour::Obedient => "",
        Behaviour::IgnoresTerm | Behaviour::IgnoresStop => "trap '' TERM\n",
    };
    let on_stop = match behaviour {
        Behaviour::IgnoresStop => "    echo \"Ignoring stop\"",
        _ => "    echo \"Stopping server\"\n    exit 0",
    };
    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo 'openjdk version "21.0.2" 2024-01-16' >&2
  exit 0
fi
{trap}echo "booting $*"
echo "Done (0.1s)! For help, type \"help\""
while IFS= read -r line; do
  echo "> $line"
  if [ "$line" = "stop" ]; then
{on_stop}
  fi
done
"#
    );
    let path = dir.join("fake-java.sh");
    std::fs::write(&path, script).expect("write fake runtime");
    let mut permissions = std::fs::metadata(&path).expect("metadata").permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("chmod");
    path
}
