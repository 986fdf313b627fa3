use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_JAVA_OPTS: &str = "-Xmx2048M -Xms2048M";

/// Server core vendor. Serialized as the lowercase tag stored in the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoreType {
    Purpur,
    Paper,
    Spigot,
    CraftBukkit,
    Vanilla,
    Fabric,
    Forge,
    NeoForge,
    CatServer,
    Mohist,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CoreType {
    pub const ALL: [CoreType; 10] = [
        CoreType::Purpur,
        CoreType::Paper,
        CoreType::Spigot,
        CoreType::CraftBukkit,
        CoreType::Vanilla,
        CoreType::Fabric,
        CoreType::Forge,
        CoreType::NeoForge,
        CoreType::CatServer,
        CoreType::Mohist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoreType::Purpur => "purpur",
            CoreType::Paper => "paper",
            CoreType::Spigot => "spigot",
            CoreType::CraftBukkit => "craftbukkit",
            CoreType::Vanilla => "vanilla",
            CoreType::Fabric => "fabric",
            CoreType::Forge => "forge",
            CoreType::NeoForge => "neoforge",
            CoreType::CatServer => "catserver",
            CoreType::Mohist => "mohist",
            CoreType::Unknown => "unknown",
        }
    }

    /// Unrecognized tags parse as `Unknown`.
    pub fn from_tag(tag: &str) -> CoreType {
        let tag = tag.trim().to_lowercase();
        CoreType::ALL
            .into_iter()
            .find(|core| core.as_str() == tag)
            .unwrap_or(CoreType::Unknown)
    }

    /// Mod-loader cores boot without the `nogui` flag.
    pub fn is_mod_loader(&self) -> bool {
        matches!(self, CoreType::Forge | CoreType::NeoForge | CoreType::Fabric)
    }
}

impl std::fmt::Display for CoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download host preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MirrorId {
    #[default]
    Mslmc,
    Bmclapi,
    /// Official vendor sources only.
    Mc,
}

impl MirrorId {
    pub const ALL: [MirrorId; 3] = [MirrorId::Mslmc, MirrorId::Bmclapi, MirrorId::Mc];

    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorId::Mslmc => "mslmc",
            MirrorId::Bmclapi => "bmclapi",
            MirrorId::Mc => "mc",
        }
    }

    pub fn from_tag(tag: &str) -> Option<MirrorId> {
        let tag = tag.trim().to_lowercase();
        MirrorId::ALL.into_iter().find(|mirror| mirror.as_str() == tag)
    }
}

impl std::fmt::Display for MirrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted per-directory launcher record (`server_launcher.json`).
///
/// `core_type` and `minecraft_version` are derived from `server_jar`; callers
/// that change the artifact must re-run detection (`cores::detect_into`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerProfile {
    #[serde(default)]
    pub server_dir: PathBuf,
    #[serde(default)]
    pub server_jar: String,
    #[serde(default = "default_java_opts")]
    pub java_opts: String,
    #[serde(default)]
    pub core_type: CoreType,
    #[serde(default)]
    pub minecraft_version: String,
    #[serde(default)]
    pub mirror_site: MirrorId,
    #[serde(default = "default_true")]
    pub auto_backup: bool,
    #[serde(default = "default_backup_interval")]
    pub backup_interval: u64,
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl ServerProfile {
    pub fn new(server_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_dir: server_dir.into(),
            server_jar: String::new(),
            java_opts: default_java_opts(),
            core_type: CoreType::Unknown,
            minecraft_version: String::new(),
            mirror_site: MirrorId::default(),
            auto_backup: true,
            backup_interval: default_backup_interval(),
            max_backups: default_max_backups(),
            last_modified: None,
        }
    }

    /// Absolute artifact path, or `None` while no artifact is configured.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        let name = self.server_jar.trim();
        if name.is_empty() {
            None
        } else {
            Some(self.server_dir.join(name))
        }
    }

    pub fn launch_options(&self) -> Vec<String> {
        self.java_opts
            .split_whitespace()
            .map(|value| value.to_string())
            .collect()
    }

    /// Stamps `last_modified` with the current time.
    pub fn touch(&mut self) {
        let now = time::OffsetDateTime::now_local()
            .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
        self.last_modified = now
            .format(&time::format_description::well_known::Rfc3339)
            .ok();
    }
}

/// One timestamped snapshot under `<server_dir>/backups`.
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub name: String,
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

fn default_java_opts() -> String {
    DEFAULT_JAVA_OPTS.to_string()
}

fn default_true() -> bool {
    true
}

fn default_backup_interval() -> u64 {
    3600
}

fn default_max_backups() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_tags_round_trip() {
        for core in CoreType::ALL {
            assert_eq!(CoreType::from_tag(core.as_str()), core);
        }
        assert_eq!(CoreType::from_tag("Quilt"), CoreType::Unknown);
    }

    #[test]
    fn unknown_tag_deserializes_as_unknown() {
        let core: CoreType = serde_json::from_str("\"bungeecord\"").expect("parse");
        assert_eq!(core, CoreType::Unknown);
        let core: CoreType = serde_json::from_str("\"neoforge\"").expect("parse");
        assert_eq!(core, CoreType::NeoForge);
    }

    #[test]
    fn partial_record_fills_defaults() {
        let profile: ServerProfile =
            serde_json::from_str(r#"{"server_dir": "/srv/mc", "server_jar": "paper.jar"}"#)
                .expect("parse");
        assert_eq!(profile.java_opts, DEFAULT_JAVA_OPTS);
        assert_eq!(profile.mirror_site, MirrorId::Mslmc);
        assert_eq!(profile.max_backups, 10);
        assert_eq!(profile.artifact_path(), Some(PathBuf::from("/srv/mc/paper.jar")));
    }

    #[test]
    fn empty_artifact_has_no_path() {
        let profile = ServerProfile::new("/srv/mc");
        assert!(profile.artifact_path().is_none());
        assert_eq!(profile.launch_options(), vec!["-Xmx2048M", "-Xms2048M"]);
    }
}
