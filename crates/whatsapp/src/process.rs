//! The Node sidecar process that speaks the WhatsApp Web protocol.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    anyhow::{Context, Result, bail},
    stickerbot_config::WhatsAppConfig,
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, BufReader},
        process::{Child, Command},
    },
    tracing::{debug, error, info, warn},
};

const SIDECAR_DIR_ENV: &str = "STICKERBOT_WHATSAPP_SIDECAR_DIR";
const PORT_ENV: &str = "STICKERBOT_WHATSAPP_PORT";
const AUTH_DIR_ENV: &str = "STICKERBOT_WHATSAPP_AUTH_DIR";

/// Where the sidecar usually lives, relative to the working directory.
const DEV_PATHS: [&str; 3] = [
    "sidecar/whatsapp",
    "../sidecar/whatsapp",
    "../../sidecar/whatsapp",
];

const STARTUP_GRACE: Duration = Duration::from_millis(500);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How to launch the sidecar.
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Directory holding the sidecar's `package.json`.
    pub sidecar_dir: PathBuf,
    pub port: u16,
    /// Session credentials directory handed to the sidecar.
    pub auth_dir: PathBuf,
}

impl SidecarConfig {
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self> {
        Ok(Self {
            sidecar_dir: find_sidecar_dir(config.sidecar_dir.as_deref())?,
            port: config.sidecar_port,
            auth_dir: config.effective_auth_dir(),
        })
    }
}

/// A running sidecar. Killed when dropped; [`SidecarProcess::stop`] asks it
/// to exit first.
pub struct SidecarProcess {
    child: Child,
    port: u16,
}

impl SidecarProcess {
    /// Build the sidecar if needed, spawn it and give it a moment to fail.
    pub async fn start(config: &SidecarConfig) -> Result<Self> {
        let dir = &config.sidecar_dir;
        if !dir.join("package.json").exists() {
            bail!(
                "WhatsApp sidecar not found at {}. Run `npm install && npm run build` there first.",
                dir.display()
            );
        }

        if !dir.join("dist/index.js").exists() {
            info!(path = %dir.display(), "building WhatsApp sidecar");
            if !dir.join("node_modules").exists() {
                npm(dir, &["install"]).await?;
            }
            npm(dir, &["run", "build"]).await?;
        }

        info!(path = %dir.display(), port = config.port, "starting WhatsApp sidecar");
        let mut cmd = Command::new("node");
        cmd.arg("dist/index.js")
            .current_dir(dir)
            .env(PORT_ENV, config.port.to_string())
            .env(AUTH_DIR_ENV, &config.auth_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().context("failed to spawn sidecar process")?;
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_stdout(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        tokio::time::sleep(STARTUP_GRACE).await;
        if let Some(status) = child
            .try_wait()
            .context("failed to check sidecar process status")?
        {
            bail!("sidecar process exited immediately with status: {status}");
        }

        Ok(Self {
            child,
            port: config.port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// SIGTERM, then kill if it has not exited within a few seconds.
    pub async fn stop(&mut self) -> Result<()> {
        info!("stopping WhatsApp sidecar");

        #[cfg(unix)]
        {
            use nix::{
                sys::signal::{Signal, kill},
                unistd::Pid,
            };

            if let Some(pid) = self.child.id().and_then(|pid| i32::try_from(pid).ok()) {
                let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }

        match tokio::time::timeout(STOP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => info!(?status, "WhatsApp sidecar exited"),
            Ok(Err(e)) => warn!(error = %e, "error waiting for sidecar"),
            Err(_) => {
                warn!("sidecar did not exit in time, killing");
                self.child.kill().await?;
            },
        }
        Ok(())
    }
}

/// Locate the sidecar directory: the configured path, then
/// `STICKERBOT_WHATSAPP_SIDECAR_DIR`, then next to the executable, then the
/// usual development locations.
pub fn find_sidecar_dir(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.join("package.json").exists() {
            return Ok(path.to_path_buf());
        }
        bail!(
            "sidecar directory does not exist or lacks package.json: {}",
            path.display()
        );
    }

    if let Ok(dir) = std::env::var(SIDECAR_DIR_ENV) {
        let path = PathBuf::from(&dir);
        if path.join("package.json").exists() {
            return Ok(path);
        }
        warn!(path = %dir, "{SIDECAR_DIR_ENV} set but package.json not found");
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(exe_dir) = exe.parent()
    {
        for relative in ["../sidecar/whatsapp", "../../sidecar/whatsapp"] {
            let candidate = exe_dir.join(relative);
            if candidate.join("package.json").exists() {
                return Ok(candidate);
            }
        }
    }

    for relative in DEV_PATHS {
        let path = PathBuf::from(relative);
        if path.join("package.json").exists() {
            return Ok(path.canonicalize().unwrap_or(path));
        }
    }

    bail!(
        "WhatsApp sidecar not found. Set {SIDECAR_DIR_ENV} or whatsapp.sidecar_dir, or run the \
         sidecar yourself with whatsapp.auto_start_sidecar = false"
    )
}

async fn npm(dir: &Path, args: &[&str]) -> Result<()> {
    let rendered = args.join(" ");
    info!(path = %dir.display(), "running npm {rendered}");

    let output = Command::new("npm")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .with_context(|| format!("failed to run npm {rendered}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("npm {rendered} failed: {stderr}");
    }
    Ok(())
}

/// Sidecar stdout is pino JSON; re-emit each record at its own level.
async fn forward_stdout(stdout: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some((level, msg)) = parse_pino(&line) else {
            info!(target: "whatsapp_sidecar", "{line}");
            continue;
        };
        match level {
            0..=20 => debug!(target: "whatsapp_sidecar", "{msg}"),
            21..=30 => info!(target: "whatsapp_sidecar", "{msg}"),
            31..=40 => warn!(target: "whatsapp_sidecar", "{msg}"),
            _ => error!(target: "whatsapp_sidecar", "{msg}"),
        }
    }
}

async fn forward_stderr(stderr: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!(target: "whatsapp_sidecar", "{line}");
    }
}

/// Level and message of a pino log record.
fn parse_pino(line: &str) -> Option<(u64, String)> {
    if !line.starts_with('{') {
        return None;
    }
    let record: serde_json::Value = serde_json::from_str(line).ok()?;
    let level = record
        .get("level")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(30);
    let msg = record
        .get("msg")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(line)
        .to_string();
    Some((level, msg))
}
