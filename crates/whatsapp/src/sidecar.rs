//! WebSocket connection to the sidecar.
//!
//! One writer task drains outgoing frames; one reader task parses incoming
//! frames, settles pending sends on `send_result`, and forwards everything
//! else as session events. The event channel closes when the socket does.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    anyhow::{Context, Result, anyhow, bail},
    futures::{SinkExt, StreamExt},
    tokio::sync::{mpsc, oneshot},
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::types::{GatewayMessage, SidecarMessage};

pub const DEFAULT_SIDECAR_PORT: u16 = 3001;

/// How long a send waits for the sidecar's `send_result`.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

type SendOutcome = std::result::Result<(), String>;

/// Sends awaiting their `send_result`, keyed by request id.
#[derive(Clone, Default)]
struct Pending(Arc<Mutex<HashMap<String, oneshot::Sender<SendOutcome>>>>);

impl Pending {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<SendOutcome>>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, request_id: &str) -> oneshot::Receiver<SendOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(request_id.to_string(), tx);
        rx
    }

    fn forget(&self, request_id: &str) {
        self.lock().remove(request_id);
    }

    fn complete(&self, request_id: &str, success: bool, error: Option<String>) -> bool {
        let Some(tx) = self.lock().remove(request_id) else {
            debug!(request_id, "send result for unknown request");
            return false;
        };
        let outcome = if success {
            Ok(())
        } else {
            Err(error.unwrap_or_else(|| "unknown error".into()))
        };
        let _ = tx.send(outcome);
        true
    }

    /// Dropping the senders wakes every waiter with a closed-channel error.
    fn abandon_all(&self) {
        let abandoned = {
            let mut pending = self.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        if abandoned > 0 {
            warn!(abandoned, "sidecar connection closed with sends in flight");
        }
    }
}

/// Cloneable sender side of a sidecar connection.
#[derive(Clone)]
pub struct SidecarHandle {
    write_tx: mpsc::UnboundedSender<String>,
    pending: Pending,
    reply_timeout: Duration,
}

impl SidecarHandle {
    fn new(write_tx: mpsc::UnboundedSender<String>, pending: Pending) -> Self {
        Self {
            write_tx,
            pending,
            reply_timeout: REPLY_TIMEOUT,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.write_tx.is_closed()
    }

    /// Queue a frame without waiting for any confirmation.
    pub fn send(&self, message: &GatewayMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.write_tx
            .send(json)
            .map_err(|_| anyhow!("sidecar connection closed"))
    }

    /// Send a frame and wait for the sidecar to confirm it.
    pub async fn request(&self, message: GatewayMessage) -> Result<()> {
        let request_id = message
            .request_id()
            .ok_or_else(|| anyhow!("frame has no request id to confirm"))?
            .to_string();
        if !self.is_connected() {
            bail!("sidecar connection closed, cannot send {request_id}");
        }

        let rx = self.pending.register(&request_id);
        if let Err(e) = self.send(&message) {
            self.pending.forget(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(error))) => bail!("sidecar failed to send {request_id}: {error}"),
            Ok(Err(_)) => bail!("sidecar connection closed before confirming {request_id}"),
            Err(_) => {
                self.pending.forget(&request_id);
                bail!(
                    "no confirmation for {request_id} within {}s",
                    self.reply_timeout.as_secs()
                )
            },
        }
    }

    /// Settle a pending send. Returns whether anyone was waiting for it.
    pub fn complete(&self, request_id: &str, success: bool, error: Option<String>) -> bool {
        self.pending.complete(request_id, success, error)
    }

    /// A handle with no socket behind it; frames land in the returned
    /// receiver.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        (Self::new(write_tx, Pending::default()), write_rx)
    }

    #[cfg(test)]
    pub(crate) fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

/// Connect to the sidecar on localhost.
///
/// Returns the handle and the stream of session events; the stream ends when
/// the socket closes.
pub async fn connect(port: u16) -> Result<(SidecarHandle, mpsc::UnboundedReceiver<SidecarMessage>)> {
    let url = format!("ws://127.0.0.1:{port}");
    let (ws_stream, _response) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to sidecar at {url}"))?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();

    let (write_tx, mut write_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let pending = Pending::default();
    let closed = CancellationToken::new();

    let writer_closed = closed.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_closed.cancelled() => break,
                frame = write_rx.recv() => {
                    let Some(json) = frame else { break };
                    if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                        warn!(error = %e, "failed to write to sidecar");
                        break;
                    }
                },
            }
        }
        let _ = ws_sink.close().await;
    });

    let reader_pending = pending.clone();
    tokio::spawn(async move {
        while let Some(frame) = ws_reader.next().await {
            match frame {
                Ok(Message::Text(text)) => route_frame(text.as_str(), &reader_pending, &event_tx),
                Ok(Message::Close(_)) => break,
                Ok(_) => {},
                Err(e) => {
                    warn!(error = %e, "sidecar socket error");
                    break;
                },
            }
        }
        debug!("sidecar socket closed");
        closed.cancel();
        reader_pending.abandon_all();
    });

    info!(port, "connected to WhatsApp sidecar");
    Ok((SidecarHandle::new(write_tx, pending), event_rx))
}

/// [`connect`], retrying while the sidecar process is still starting.
pub async fn connect_with_retry(
    port: u16,
    attempts: u32,
) -> Result<(SidecarHandle, mpsc::UnboundedReceiver<SidecarMessage>)> {
    let mut attempt = 1;
    loop {
        match connect(port).await {
            Ok(connection) => return Ok(connection),
            Err(e) if attempt < attempts => {
                debug!(attempt, error = %e, "sidecar not reachable yet, retrying");
                attempt += 1;
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            },
            Err(e) => return Err(e.context(format!("gave up after {attempts} attempts"))),
        }
    }
}

fn route_frame(
    text: &str,
    pending: &Pending,
    event_tx: &mpsc::UnboundedSender<SidecarMessage>,
) {
    let message = match serde_json::from_str::<SidecarMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "unparseable frame from sidecar");
            return;
        },
    };
    match message {
        SidecarMessage::SendResult {
            request_id,
            success,
            error,
        } => {
            pending.complete(&request_id, success, error);
        },
        other => {
            let _ = event_tx.send(other);
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tokio::net::TcpListener, tokio_tungstenite::accept_async};

    fn send_text(request_id: &str) -> GatewayMessage {
        GatewayMessage::SendText {
            request_id: request_id.into(),
            to: "123@s.whatsapp.net".into(),
            quoted_message_id: None,
            text: "hello".into(),
        }
    }

    #[tokio::test]
    async fn request_resolves_on_success() {
        let (handle, mut frames) = SidecarHandle::detached();
        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.request(send_text("r1")).await }
        });

        let frame: serde_json::Value = serde_json::from_str(&frames.recv().await.unwrap()).unwrap();
        assert_eq!(frame["request_id"], "r1");
        assert!(handle.complete("r1", true, None));

        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn request_surfaces_sidecar_error() {
        let (handle, mut frames) = SidecarHandle::detached();
        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.request(send_text("r2")).await }
        });

        frames.recv().await.unwrap();
        handle.complete("r2", false, Some("not on whatsapp".into()));

        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("not on whatsapp"));
    }

    #[tokio::test]
    async fn request_times_out_and_forgets() {
        let (handle, _frames) = SidecarHandle::detached();
        let handle = handle.with_reply_timeout(Duration::from_millis(20));

        let err = handle.request(send_text("r3")).await.unwrap_err();
        assert!(err.to_string().contains("no confirmation"));
        assert!(!handle.complete("r3", true, None), "timed out request is forgotten");
    }

    #[tokio::test]
    async fn closed_connection_fails_fast() {
        let (handle, frames) = SidecarHandle::detached();
        drop(frames);

        assert!(!handle.is_connected());
        let err = handle.request(send_text("r4")).await.unwrap_err();
        assert!(err.to_string().contains("connection closed"));
        assert!(!handle.complete("r4", true, None));
    }

    #[tokio::test]
    async fn login_needs_no_confirmation() {
        let (handle, _frames) = SidecarHandle::detached();
        assert!(
            handle
                .request(GatewayMessage::Login { auth_dir: None })
                .await
                .is_err()
        );
        handle.send(&GatewayMessage::Login { auth_dir: None }).unwrap();
    }

    #[tokio::test]
    async fn talks_to_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"type":"qr","qr":"2@pair"}"#.into()))
                .await
                .unwrap();

            // Confirm the first send request we see.
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let frame: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                if frame["type"] == "send_text" {
                    let result = serde_json::json!({
                        "type": "send_result",
                        "request_id": frame["request_id"],
                        "success": true,
                    });
                    ws.send(Message::Text(result.to_string().into())).await.unwrap();
                    break;
                }
            }
            ws.close(None).await.ok();
        });

        let (handle, mut events) = connect_with_retry(port, 3).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SidecarMessage::Qr {
            qr: "2@pair".into()
        });

        handle.request(send_text("live")).await.unwrap();
        server.await.unwrap();

        assert!(events.recv().await.is_none(), "events end with the socket");
    }
}
