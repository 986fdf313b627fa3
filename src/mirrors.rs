use crate::cores;
use crate::models::{CoreType, MirrorId};
use serde::Serialize;

/// Sentinel substituted for `{build}`/`{loader}` when no concrete build is known.
pub const LATEST_BUILD: &str = "latest";

#[derive(Debug, Clone, Serialize)]
pub struct MirrorDescriptor {
    pub mirror: MirrorId,
    pub name: &'static str,
    pub url: &'static str,
    pub patterns: &'static [(CoreType, &'static str)],
}

pub static MIRROR_SITES: [MirrorDescriptor; 3] = [
    MirrorDescriptor {
        mirror: MirrorId::Mslmc,
        name: "MSLMC mirror",
        url: "https://dl.mslmc.cn/",
        patterns: &[
            (CoreType::Paper, "https://dl.mslmc.cn"),
            (CoreType::Purpur, "https://dl.mslmc.cn"),
            (CoreType::Vanilla, "https://dl.mslmc.cn"),
            (CoreType::Spigot, "https://dl.mslmc.cn"),
            (CoreType::CraftBukkit, "https://dl.mslmc.cn"),
        ],
    },
    MirrorDescriptor {
        mirror: MirrorId::Bmclapi,
        name: "BMCLAPI mirror",
        url: "https://bmclapi2.bangbang93.com/",
        patterns: &[
            (
                CoreType::Paper,
                "https://bmclapi2.bangbang93.com/projects/paper/versions/{version}/builds/{build}/downloads/paper-{version}-{build}.jar",
            ),
            (
                CoreType::Purpur,
                "https://bmclapi2.bangbang93.com/projects/purpur/versions/{version}/builds/{build}/downloads/purpur-{version}-{build}.jar",
            ),
            (
                CoreType::Vanilla,
                "https://bmclapi2.bangbang93.com/version/{version}/server",
            ),
            (
                CoreType::Fabric,
                "https://bmclapi2.bangbang93.com/fabric-meta/v2/versions/loader/{version}/{loader}/server/jar",
            ),
            (
                CoreType::Forge,
                "https://bmclapi2.bangbang93.com/maven/net/minecraftforge/forge/{version}/forge-{version}-installer.jar",
            ),
        ],
    },
    MirrorDescriptor {
        mirror: MirrorId::Mc,
        name: "Official sources",
        url: "",
        patterns: &[],
    },
];

pub fn describe(mirror: MirrorId) -> &'static MirrorDescriptor {
    MIRROR_SITES
        .iter()
        .find(|descriptor| descriptor.mirror == mirror)
        .unwrap_or(&MIRROR_SITES[0])
}

impl MirrorDescriptor {
    pub fn pattern_for(&self, core_type: CoreType) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|(core, _)| *core == core_type)
            .map(|(_, pattern)| *pattern)
    }
}

/// Resolves a download URL for the given core and version.
///
/// `None` is an expected outcome: the official server needs a
/// content-hash URL from the upstream version manifest, and unknown
/// cores have no template. Callers fall back to asking for a manual URL.
pub fn resolve(
    core_type: CoreType,
    version: &str,
    mirror: MirrorId,
    build_hint: Option<&str>,
) -> Option<String> {
    if core_type == CoreType::Vanilla {
        return None;
    }

    let pattern = describe(mirror)
        .pattern_for(core_type)
        .or_else(|| Some(cores::describe(core_type).download_pattern))
        .filter(|pattern| !pattern.is_empty())?;

    let build = build_hint
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(LATEST_BUILD);

    Some(
        pattern
            .replace("{version}", version.trim())
            .replace("{build}", build)
            .replace("{loader}", build),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanilla_is_always_unresolvable() {
        for mirror in MirrorId::ALL {
            assert_eq!(resolve(CoreType::Vanilla, "1.21.4", mirror, None), None);
            assert_eq!(resolve(CoreType::Vanilla, "1.21.4", mirror, Some("12")), None);
        }
    }

    #[test]
    fn mirror_template_substitutes_build_sentinel() {
        let url = resolve(CoreType::Paper, "1.20.4", MirrorId::Bmclapi, None).expect("url");
        assert_eq!(
            url,
            "https://bmclapi2.bangbang93.com/projects/paper/versions/1.20.4/builds/latest/downloads/paper-1.20.4-latest.jar"
        );
    }

    #[test]
    fn build_hint_is_used_verbatim() {
        let url = resolve(CoreType::Paper, "1.20.4", MirrorId::Bmclapi, Some("496")).expect("url");
        assert!(url.ends_with("/builds/496/downloads/paper-1.20.4-496.jar"));
    }

    #[test]
    fn falls_back_to_vendor_template() {
        let url = resolve(CoreType::Mohist, "1.20.1", MirrorId::Bmclapi, None).expect("url");
        assert_eq!(
            url,
            "https://mohistmc.com/api/v2/projects/mohist/1.20.1/builds/latest/downloads/mohist-1.20.1-latest.jar"
        );
        let url = resolve(CoreType::Spigot, "1.12.2", MirrorId::Mc, None).expect("url");
        assert_eq!(url, "https://download.spigotmc.org/spigot/spigot-1.12.2.jar");
    }

    #[test]
    fn fabric_loader_placeholder_is_filled() {
        let url = resolve(CoreType::Fabric, "1.21.1", MirrorId::Mc, Some("0.16.5")).expect("url");
        assert_eq!(url, "https://meta.fabricmc.net/v2/versions/loader/1.21.1/0.16.5/server/jar");
    }

    #[test]
    fn unknown_core_is_unresolvable() {
        assert_eq!(resolve(CoreType::Unknown, "1.21.4", MirrorId::Mslmc, None), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        for core in CoreType::ALL {
            for mirror in MirrorId::ALL {
                assert_eq!(
                    resolve(core, "1.19.4", mirror, Some("7")),
                    resolve(core, "1.19.4", mirror, Some("7"))
                );
            }
        }
    }
}
