//! Sanity checks run once after loading.

use crate::schema::StickerBotConfig;

/// Reject configurations the pipeline cannot run with.
pub fn validate(config: &StickerBotConfig) -> anyhow::Result<()> {
    let mut problems = Vec::new();

    if config.media.engine_timeout_secs == 0 {
        problems.push("media.engine_timeout_secs must be greater than zero");
    }
    if config.media.ffmpeg_path.trim().is_empty() {
        problems.push("media.ffmpeg_path must not be empty");
    }
    if config.sticker.pack_name.trim().is_empty() {
        problems.push("sticker.pack_name must not be empty");
    }
    if config.whatsapp.auto_start_sidecar && config.whatsapp.sidecar_port == config.server.port {
        problems.push("whatsapp.sidecar_port must differ from server.port");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("invalid configuration: {}", problems.join("; "))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate(&StickerBotConfig::default()).unwrap();
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = StickerBotConfig::default();
        cfg.media.engine_timeout_secs = 0;
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("engine_timeout_secs"));
    }

    #[test]
    fn collects_every_problem() {
        let mut cfg = StickerBotConfig::default();
        cfg.media.ffmpeg_path = " ".into();
        cfg.whatsapp.sidecar_port = cfg.server.port;
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("ffmpeg_path"));
        assert!(err.contains("sidecar_port"));
    }
}
