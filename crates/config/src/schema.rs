/// Config schema types (server, media pipeline, sticker pack, bot identity, whatsapp).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::loader::data_dir;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerBotConfig {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub sticker: StickerConfig,
    pub bot: BotIdentity,
    pub whatsapp: WhatsAppConfig,
}

/// Status server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. The `PORT` environment variable takes precedence.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Transcoding pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory for transient transcoding artifacts. Defaults to
    /// `<data dir>/temp`.
    pub temp_dir: Option<PathBuf>,
    /// ffmpeg binary, either a bare name resolved via `PATH` or a full path.
    pub ffmpeg_path: String,
    /// Wall-clock limit for a single engine invocation.
    pub engine_timeout_secs: u64,
    /// Leftover workspace files older than this are removed at startup.
    pub stale_file_max_age_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            ffmpeg_path: "ffmpeg".into(),
            engine_timeout_secs: 60,
            stale_file_max_age_secs: 3600,
        }
    }
}

/// Sticker pack attributes stamped on every sticker the bot sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerConfig {
    pub author: String,
    pub pack_name: String,
    pub categories: Vec<String>,
}

impl Default for StickerConfig {
    fn default() -> Self {
        Self {
            author: "Sticker Bot".into(),
            pack_name: "Sticker".into(),
            categories: vec!["🎨".into()],
        }
    }
}

/// Bot identity shown by the `.info` and `.owner` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotIdentity {
    pub name: String,
    pub version: String,
    pub owner_name: String,
    pub owner_contact: Option<String>,
    pub owner_motto: Option<String>,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            name: "WhatsApp Sticker Bot".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            owner_name: "unknown".into(),
            owner_contact: None,
            owner_motto: None,
        }
    }
}

/// WhatsApp Web session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Directory containing the Node sidecar (with `package.json`).
    pub sidecar_dir: Option<PathBuf>,
    /// Port the sidecar WebSocket server listens on.
    pub sidecar_port: u16,
    /// Directory for WhatsApp session credentials. Defaults to
    /// `<data dir>/whatsapp-auth`.
    pub auth_dir: Option<PathBuf>,
    /// Spawn and supervise the sidecar process. Disable when running the
    /// sidecar manually.
    pub auto_start_sidecar: bool,
    /// Delay before reconnecting after the session drops.
    pub reconnect_delay_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            sidecar_dir: None,
            sidecar_port: 3001,
            auth_dir: None,
            auto_start_sidecar: true,
            reconnect_delay_secs: 5,
        }
    }
}

impl WhatsAppConfig {
    /// Configured credentials directory, else `<data dir>/whatsapp-auth`.
    pub fn effective_auth_dir(&self) -> PathBuf {
        self.auth_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("whatsapp-auth"))
    }
}
