use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::StickerBotConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stickerbot.toml",
    "stickerbot.yaml",
    "stickerbot.yml",
    "stickerbot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<StickerBotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./stickerbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/stickerbot/stickerbot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `StickerBotConfig::default()` if no config file is found.
pub fn discover_and_load() -> StickerBotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    StickerBotConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/stickerbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stickerbot").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory used for the temp workspace and session
/// credentials. Falls back to `./data` when no home directory is available.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "stickerbot")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Apply environment overrides (currently `PORT`, as set by PaaS hosts).
pub fn apply_env_overrides(config: &mut StickerBotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(
    config: &mut StickerBotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(raw) = lookup("PORT") {
        match raw.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %raw, error = %e, "ignoring invalid PORT"),
        }
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StickerBotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stickerbot.toml");
        std::fs::write(&path, "[server]\nport = 8080\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.bind, "0.0.0.0");
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("stickerbot.yaml");
        std::fs::write(&yaml, "media:\n  ffmpeg_path: /usr/bin/ffmpeg\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().media.ffmpeg_path, "/usr/bin/ffmpeg");

        let json = dir.path().join("stickerbot.json");
        std::fs::write(&json, r#"{"bot": {"owner_name": "Rehan"}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().bot.owner_name, "Rehan");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stickerbot.ini");
        std::fs::write(&path, "port=1").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/stickerbot.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stickerbot.toml"));
    }

    #[test]
    fn port_override_applies() {
        let mut cfg = StickerBotConfig::default();
        apply_env_overrides_with(&mut cfg, |name| {
            (name == "PORT").then(|| "8123".to_string())
        });
        assert_eq!(cfg.server.port, 8123);
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut cfg = StickerBotConfig::default();
        apply_env_overrides_with(&mut cfg, |_| Some("not-a-port".to_string()));
        assert_eq!(cfg.server.port, 3000);
    }
}
