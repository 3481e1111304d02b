//! JSON frames exchanged with the sidecar over its WebSocket.

use serde::{Deserialize, Serialize};

/// Sidecar → bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarMessage {
    /// A pairing code to render as a QR code.
    Qr { qr: String },
    Connected {
        #[serde(default)]
        phone_number: Option<String>,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    LoggedOut,
    Message { message: WireMessage },
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    Error { error: String },
}

/// Bot → sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayMessage {
    Login {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_dir: Option<String>,
    },
    Logout,
    SendText {
        request_id: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quoted_message_id: Option<String>,
        text: String,
    },
    SendMedia {
        request_id: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quoted_message_id: Option<String>,
        mime_type: String,
        /// Base64 body.
        data: String,
        filename: String,
        send_as_sticker: bool,
        send_as_animation: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sticker_author: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sticker_name: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sticker_categories: Vec<String>,
    },
}

impl GatewayMessage {
    /// Correlation id of sends that expect a `send_result`.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::SendText { request_id, .. } | Self::SendMedia { request_id, .. } => {
                Some(request_id)
            },
            Self::Login { .. } | Self::Logout => None,
        }
    }
}

/// A chat message as the sidecar reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub chat_id: String,
    #[serde(default)]
    pub sender: Option<String>,
    /// Text, or the caption of a media message.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub has_media: bool,
    /// Present when the sidecar managed to download the attachment.
    #[serde(default)]
    pub media: Option<WireMedia>,
    #[serde(default)]
    pub quoted: Option<Box<WireMessage>>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMedia {
    pub mime_type: String,
    /// Base64 body.
    pub data: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl std::fmt::Debug for WireMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireMedia")
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.data.len())
            .field("filename", &self.filename)
            .finish()
    }
}
