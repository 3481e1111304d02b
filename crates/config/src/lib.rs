//! Configuration loading, validation and env substitution.
//!
//! Config files: `stickerbot.toml`, `stickerbot.yaml`, or `stickerbot.json`
//! Searched in `./` then `~/.config/stickerbot/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, data_dir, discover_and_load, load_config},
    schema::{
        BotIdentity, MediaConfig, ServerConfig, StickerBotConfig, StickerConfig, WhatsAppConfig,
    },
    validate::validate,
};
