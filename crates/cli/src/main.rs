mod config_commands;
mod convert_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    stickerbot_auto_reply::Dispatcher,
    stickerbot_channels::PairingState,
    stickerbot_config::{MediaConfig, StickerBotConfig},
    stickerbot_gateway::AppState,
    stickerbot_media::{FfmpegEngine, TempWorkspace, Transcoder},
    stickerbot_whatsapp::WhatsAppChannel,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "stickerbot", about = "Stickerbot, WhatsApp sticker maker", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: stickerbot.{toml,yaml,json} in ./ or the user
    /// config directory).
    #[arg(long, global = true, env = "STICKERBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Address for the status server (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port for the status server (overrides config value and `PORT`).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Convert a local file with one recipe, without WhatsApp.
    Convert(convert_commands::ConvertArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Effective configuration: file, then `PORT`, then command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<StickerBotConfig> {
    let mut config = match &cli.config {
        Some(path) => stickerbot_config::load_config(path)?,
        None => stickerbot_config::discover_and_load(),
    };
    stickerbot_config::apply_env_overrides(&mut config);
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    stickerbot_config::validate(&config)?;
    Ok(config)
}

/// Workspace under the configured (or data-dir) temp root, with leftovers
/// from earlier runs purged, driving ffmpeg.
fn build_transcoder(media: &MediaConfig) -> anyhow::Result<Transcoder> {
    let root = media
        .temp_dir
        .clone()
        .unwrap_or_else(|| stickerbot_config::data_dir().join("temp"));
    let workspace = TempWorkspace::create(root.clone())
        .with_context(|| format!("failed to create temp workspace at {}", root.display()))?;

    let purged = workspace.purge_stale(Duration::from_secs(media.stale_file_max_age_secs))?;
    if purged > 0 {
        info!(purged, path = %root.display(), "removed stale workspace files");
    }

    let engine = Arc::new(FfmpegEngine::new(&media.ffmpeg_path));
    Ok(Transcoder::new(engine, workspace)
        .with_timeout(Duration::from_secs(media.engine_timeout_secs)))
}

async fn run_bot(config: StickerBotConfig) -> anyhow::Result<()> {
    let ffmpeg = FfmpegEngine::new(&config.media.ffmpeg_path);
    match ffmpeg.version().await {
        Ok(version) => info!(%version, "ffmpeg available"),
        Err(e) => warn!(
            binary = %ffmpeg.binary().display(),
            error = %e,
            "ffmpeg probe failed, conversions will fail until it is installed"
        ),
    }

    let transcoder = build_transcoder(&config.media)?;
    let dispatcher = Arc::new(Dispatcher::from_config(transcoder, &config));
    let pairing = PairingState::new();
    let shutdown = CancellationToken::new();

    let status = tokio::spawn({
        let state = AppState::new(pairing.clone());
        let shutdown = shutdown.clone();
        let bind = config.server.bind.clone();
        let port = config.server.port;
        async move {
            if let Err(e) = stickerbot_gateway::serve(&bind, port, state, shutdown).await {
                error!(error = %e, "status server failed");
            }
        }
    });

    let channel = WhatsAppChannel::new(config.whatsapp.clone(), pairing, dispatcher);
    let session = tokio::spawn(channel.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    shutdown.cancel();

    session.await.context("whatsapp task panicked")??;
    status.await.context("status server task panicked")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match &cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "stickerbot starting");
            let config = load_config(&cli)?;
            run_bot(config).await
        },
        Some(Commands::Convert(args)) => {
            let config = load_config(&cli)?;
            let transcoder = build_transcoder(&config.media)?;
            convert_commands::handle_convert(args, &transcoder).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, &cli),
    }
}
