//! Process-wide pairing state.
//!
//! Written only by the channel's session events: a code is set when one is
//! issued and cleared once the session authenticates or drops. Everything
//! else (the status page) reads it.

use std::sync::{Arc, RwLock};

use {
    qrcode::{
        QrCode,
        render::{svg, unicode},
    },
    tracing::{debug, info},
};

#[derive(Debug, Default)]
struct Inner {
    code: Option<String>,
    connected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PairingState {
    inner: Arc<RwLock<Inner>>,
}

impl PairingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new pairing code was issued and awaits scanning.
    pub fn issue(&self, code: impl Into<String>) {
        let code = code.into();
        match render_terminal(&code) {
            Some(qr) => info!(
                code = %code,
                "pairing code issued, scan it with the WhatsApp app\n{qr}"
            ),
            None => info!(code = %code, "pairing code issued, scan it with the WhatsApp app"),
        }
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.code = Some(code);
        inner.connected = false;
    }

    /// The session authenticated; any pending code is spent.
    pub fn mark_connected(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.code = None;
        inner.connected = true;
    }

    /// The session went away; the code is no longer valid.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.code.take().is_some() {
            debug!("pairing code cleared");
        }
        inner.connected = false;
    }

    /// Currently pending pairing code, if any.
    pub fn current(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .code
            .clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .code
            .is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).connected
    }
}

/// Scannable QR for a terminal, two modules per character row.
pub fn render_terminal(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    Some(
        qr.render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    )
}

/// Inline `<svg>` element for the status page.
pub fn render_svg(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    let image = qr
        .render::<svg::Color<'_>>()
        .min_dimensions(256, 256)
        .build();
    // Drop the XML prolog so the element can sit inside HTML.
    let start = image.find("<svg")?;
    Some(image[start..].to_string())
}
