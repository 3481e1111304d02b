//! The WhatsApp session loop.
//!
//! Keeps a sidecar connection alive, publishes pairing codes, and hands every
//! inbound message to the handler on its own task. A dropped session is
//! retried after `reconnect_delay_secs` until shutdown.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    stickerbot_channels::{InboundHandler, PairingState},
    stickerbot_config::WhatsAppConfig,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    message::WhatsAppMessage,
    process::{SidecarConfig, SidecarProcess},
    sidecar::{SidecarHandle, connect_with_retry},
    types::{GatewayMessage, SidecarMessage},
};

const CONNECT_ATTEMPTS: u32 = 10;

/// What the session loop does after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Reconnect,
}

pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    pairing: PairingState,
    handler: Arc<dyn InboundHandler>,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig, pairing: PairingState, handler: Arc<dyn InboundHandler>) -> Self {
        Self {
            config,
            pairing,
            handler,
        }
    }

    /// Run sessions until `shutdown` fires. Stops the sidecar process on the
    /// way out if this channel started it.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);
        let mut process: Option<SidecarProcess> = None;

        loop {
            let session = async {
                if self.config.auto_start_sidecar {
                    self.ensure_process(&mut process).await?;
                }
                self.session().await
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = session => match result {
                    Ok(()) => warn!("whatsapp session ended"),
                    Err(e) => error!(error = %e, "whatsapp session failed"),
                },
            }

            self.pairing.clear();
            info!(delay_secs = delay.as_secs(), "reconnecting to whatsapp after delay");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {},
            }
        }

        info!("whatsapp channel shutting down");
        self.pairing.clear();
        if let Some(mut process) = process.take() {
            process.stop().await?;
        }
        Ok(())
    }

    async fn ensure_process(&self, process: &mut Option<SidecarProcess>) -> Result<()> {
        if let Some(running) = process.as_mut() {
            if running.is_running() {
                return Ok(());
            }
            warn!(port = running.port(), "sidecar process died, restarting");
        }
        let config = SidecarConfig::from_config(&self.config)?;
        *process = Some(SidecarProcess::start(&config).await?);
        Ok(())
    }

    /// One connection: log in, then follow events until the session drops.
    async fn session(&self) -> Result<()> {
        let (sidecar, mut events) =
            connect_with_retry(self.config.sidecar_port, CONNECT_ATTEMPTS).await?;
        sidecar.send(&GatewayMessage::Login {
            auth_dir: Some(self.config.effective_auth_dir().display().to_string()),
        })?;

        while let Some(event) = events.recv().await {
            if self.on_event(event, &sidecar) == Flow::Reconnect {
                return Ok(());
            }
        }
        debug!("sidecar event stream closed");
        Ok(())
    }

    fn on_event(&self, event: SidecarMessage, sidecar: &SidecarHandle) -> Flow {
        match event {
            SidecarMessage::Qr { qr } => {
                self.pairing.issue(qr);
                Flow::Continue
            },
            SidecarMessage::Connected { phone_number } => {
                info!(?phone_number, "whatsapp session authenticated");
                self.pairing.mark_connected();
                Flow::Continue
            },
            SidecarMessage::Disconnected { reason } => {
                warn!(reason, "whatsapp session disconnected");
                Flow::Reconnect
            },
            SidecarMessage::LoggedOut => {
                warn!("whatsapp session logged out, a new pairing code will follow");
                Flow::Reconnect
            },
            SidecarMessage::Message { message } => {
                debug!(
                    message_id = %message.id,
                    chat_id = %message.chat_id,
                    has_media = message.has_media,
                    "inbound message"
                );
                let message = WhatsAppMessage::new(message, sidecar.clone());
                let handler = Arc::clone(&self.handler);
                tokio::spawn(async move {
                    handler.handle(Box::new(message)).await;
                });
                Flow::Continue
            },
            SidecarMessage::SendResult { request_id, .. } => {
                debug!(request_id, "send result outside the reader");
                Flow::Continue
            },
            SidecarMessage::Error { error } => {
                warn!(error, "sidecar error");
                Flow::Continue
            },
        }
    }
}
