//! Server core catalogue and artifact identification.
//!
//! Identification is a closed-world lookup: a fixed keyword priority list
//! over the file name, then an archive probe for the official server. Known
//! versions come from a hand-maintained catalogue; extend [`MINECRAFT_VERSIONS`]
//! instead of parsing version numbers.

use crate::error::{LauncherError, LauncherResult};
use crate::models::{CoreType, ServerProfile};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct CoreTypeDescriptor {
    pub core_type: CoreType,
    pub name: &'static str,
    pub website: &'static str,
    pub description: &'static str,
    /// Placeholders: `{version}`, `{build}`, `{loader}`, `{hash}`.
    pub download_pattern: &'static str,
}

pub static CORE_TYPES: [CoreTypeDescriptor; 10] = [
    CoreTypeDescriptor {
        core_type: CoreType::Purpur,
        name: "Purpur",
        website: "https://purpurmc.org",
        description: "Paper fork with extra gameplay options and optimizations",
        download_pattern: "https://api.purpurmc.org/v2/purpur/{version}/latest/download",
    },
    CoreTypeDescriptor {
        core_type: CoreType::Paper,
        name: "Paper",
        website: "https://papermc.io",
        description: "High-performance Spigot fork with many bug fixes",
        download_pattern: "https://api.papermc.io/v2/projects/paper/versions/{version}/builds/{build}/downloads/paper-{version}-{build}.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::Spigot,
        name: "Spigot",
        website: "https://spigotmc.org",
        description: "Optimized Bukkit implementation",
        download_pattern: "https://download.spigotmc.org/spigot/spigot-{version}.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::CraftBukkit,
        name: "CraftBukkit",
        website: "https://bukkit.org",
        description: "Reference Bukkit server",
        download_pattern: "https://download.craftbukkit.org/craftbukkit-{version}.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::Vanilla,
        name: "Vanilla",
        website: "https://minecraft.net",
        description: "Official unmodified server",
        download_pattern: "https://launcher.mojang.com/v1/objects/{hash}/server.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::Fabric,
        name: "Fabric",
        website: "https://fabricmc.net",
        description: "Lightweight mod loader",
        download_pattern: "https://meta.fabricmc.net/v2/versions/loader/{version}/{loader}/server/jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::Forge,
        name: "Forge",
        website: "https://files.minecraftforge.net",
        description: "Classic mod loader",
        download_pattern: "https://maven.minecraftforge.net/net/minecraftforge/forge/{version}/forge-{version}-installer.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::NeoForge,
        name: "NeoForge",
        website: "https://neoforged.net",
        description: "Modern fork of Forge",
        download_pattern: "https://maven.neoforged.net/releases/net/neoforged/forge/{version}/forge-{version}-installer.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::CatServer,
        name: "CatServer",
        website: "https://catserver.moe",
        description: "Hybrid server running Forge mods and Bukkit plugins",
        download_pattern: "https://github.com/Luohuayu/CatServer/releases/download/{version}/catserver-{version}.jar",
    },
    CoreTypeDescriptor {
        core_type: CoreType::Mohist,
        name: "Mohist",
        website: "https://mohistmc.com",
        description: "Hybrid server running Forge mods and Bukkit plugins",
        download_pattern: "https://mohistmc.com/api/v2/projects/mohist/{version}/builds/{build}/downloads/mohist-{version}-{build}.jar",
    },
];

static UNKNOWN_CORE: CoreTypeDescriptor = CoreTypeDescriptor {
    core_type: CoreType::Unknown,
    name: "Unknown core",
    website: "",
    description: "Unrecognized server core",
    download_pattern: "",
};

/// Checked in order; the first keyword found in the lowercased file name wins.
/// `neoforge` precedes `forge` because every NeoForge name contains both.
const FILENAME_KEYWORDS: [(&str, CoreType); 9] = [
    ("purpur", CoreType::Purpur),
    ("paper", CoreType::Paper),
    ("spigot", CoreType::Spigot),
    ("craftbukkit", CoreType::CraftBukkit),
    ("fabric", CoreType::Fabric),
    ("neoforge", CoreType::NeoForge),
    ("forge", CoreType::Forge),
    ("mohist", CoreType::Mohist),
    ("catserver", CoreType::CatServer),
];

const GENERIC_SERVER_TOKEN: &str = "server";
const VANILLA_EXCLUSION_TOKEN: &str = "vanilla";
const VANILLA_MAIN_CLASS: &str = "net/minecraft/server/Main.class";

/// Newest first, so `1.21.4` is tried before `1.21`.
pub const MINECRAFT_VERSIONS: [&str; 48] = [
    "1.21.8", "1.21.7", "1.21.6", "1.21.5",
    "1.21.4", "1.21.3", "1.21.2", "1.21.1", "1.21",
    "1.20.6", "1.20.5", "1.20.4", "1.20.3", "1.20.2", "1.20.1", "1.20",
    "1.19.4", "1.19.3", "1.19.2", "1.19.1", "1.19",
    "1.18.2", "1.18.1", "1.18",
    "1.17.1", "1.17",
    "1.16.5", "1.16.4", "1.16.3", "1.16.2", "1.16.1",
    "1.15.2", "1.15.1", "1.15",
    "1.14.4", "1.14.3", "1.14.2", "1.14.1",
    "1.13.2", "1.13.1",
    "1.12.2", "1.12.1",
    "1.11.2",
    "1.10.2",
    "1.9.4",
    "1.8.9",
    "1.7.10",
    "1.7.2",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// A vendor keyword matched the file name.
    Filename,
    /// The archive contained a vendor-specific class.
    ArchiveContent,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identification {
    pub core_type: CoreType,
    pub confidence: Confidence,
}

impl Identification {
    fn unknown() -> Self {
        Self {
            core_type: CoreType::Unknown,
            confidence: Confidence::None,
        }
    }
}

pub fn describe(core_type: CoreType) -> &'static CoreTypeDescriptor {
    CORE_TYPES
        .iter()
        .find(|descriptor| descriptor.core_type == core_type)
        .unwrap_or(&UNKNOWN_CORE)
}

/// Classifies an artifact. Never fails: anything unrecognizable, including
/// a missing file, is `unknown`.
pub fn identify(path: &Path) -> Identification {
    if !path.is_file() {
        return Identification::unknown();
    }
    let file_name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return Identification::unknown(),
    };

    if let Some(core_type) = match_filename(&file_name) {
        return Identification {
            core_type,
            confidence: Confidence::Filename,
        };
    }

    if file_name.contains(GENERIC_SERVER_TOKEN) && !file_name.contains(VANILLA_EXCLUSION_TOKEN) {
        match inspect_archive(path) {
            Ok(CoreType::Unknown) => {}
            Ok(core_type) => {
                return Identification {
                    core_type,
                    confidence: Confidence::ArchiveContent,
                }
            }
            Err(err) => debug!(path = %path.display(), error = %err, "archive inspection failed"),
        }
    }

    Identification::unknown()
}

pub fn match_filename(file_name: &str) -> Option<CoreType> {
    let lowered = file_name.to_lowercase();
    FILENAME_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, core_type)| *core_type)
}

/// Opens the artifact as a zip archive and looks for the official server
/// entry point. Errors are returned, not swallowed; `identify` decides.
pub fn inspect_archive(path: &Path) -> LauncherResult<CoreType> {
    let file = std::fs::File::open(path).map_err(|err| LauncherError::io(path, err))?;
    let archive = zip::ZipArchive::new(file)?;
    let found = archive.file_names().any(|name| name == VANILLA_MAIN_CLASS);
    Ok(if found {
        CoreType::Vanilla
    } else {
        CoreType::Unknown
    })
}

pub fn detect_version(file_name: &str) -> Option<&'static str> {
    let lowered = file_name.to_lowercase();
    MINECRAFT_VERSIONS
        .iter()
        .find(|version| lowered.contains(*version))
        .copied()
}

/// First `*.jar` in `server_dir` that is not an installer, by name.
pub fn find_artifact(server_dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(server_dir).ok()?;
    let mut candidates: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| {
            let lowered = name.to_lowercase();
            lowered.ends_with(".jar") && !lowered.contains("installer")
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Re-derives `core_type` and `minecraft_version` from the artifact, picking
/// an artifact from the directory first when none is configured.
pub fn detect_into(profile: &mut ServerProfile) -> Identification {
    if profile.server_jar.trim().is_empty() {
        if let Some(found) = find_artifact(&profile.server_dir) {
            debug!(artifact = %found, "picked server artifact from directory");
            profile.server_jar = found;
        }
    }

    let Some(path) = profile.artifact_path() else {
        profile.core_type = CoreType::Unknown;
        profile.minecraft_version.clear();
        return Identification::unknown();
    };

    let identification = identify(&path);
    profile.core_type = identification.core_type;
    profile.minecraft_version = artifact_version(&path).unwrap_or_default();
    identification
}

fn artifact_version(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().to_string();
    detect_version(&name).map(|version| version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_ignores_case_and_surroundings() {
        assert_eq!(match_filename("PURPUR-1.21.4-2301.jar"), Some(CoreType::Purpur));
        assert_eq!(match_filename("my-Paper-server.jar"), Some(CoreType::Paper));
        assert_eq!(match_filename("craftbukkit-1.12.2.jar"), Some(CoreType::CraftBukkit));
        assert_eq!(match_filename("catserver-universal.jar"), Some(CoreType::CatServer));
        assert_eq!(match_filename("server.jar"), None);
    }

    #[test]
    fn neoforge_keeps_its_own_tag() {
        assert_eq!(match_filename("neoforge-21.1.77.jar"), Some(CoreType::NeoForge));
        assert_eq!(match_filename("forge-1.20.1-47.2.0.jar"), Some(CoreType::Forge));
    }

    #[test]
    fn earlier_keyword_wins_on_collision() {
        assert_eq!(match_filename("mohist-1.20.1-forge.jar"), Some(CoreType::Forge));
        assert_eq!(match_filename("paper-with-spigot-api.jar"), Some(CoreType::Paper));
    }

    #[test]
    fn version_catalogue_prefers_longest_known() {
        assert_eq!(detect_version("purpur-1.21.4.jar"), Some("1.21.4"));
        assert_eq!(detect_version("paper-1.20.jar"), Some("1.20"));
        assert_eq!(detect_version("forge-1.7.10-universal.jar"), Some("1.7.10"));
        assert_eq!(detect_version("server-9.9.9.jar"), None);
    }

    #[test]
    fn missing_path_is_unknown() {
        let identification = identify(Path::new("/definitely/not/here/purpur-1.21.4.jar"));
        assert_eq!(identification.core_type, CoreType::Unknown);
        assert_eq!(identification.confidence, Confidence::None);
    }

    #[test]
    fn describe_falls_back_for_unknown() {
        assert_eq!(describe(CoreType::Paper).name, "Paper");
        assert_eq!(describe(CoreType::Unknown).name, "Unknown core");
    }
}
