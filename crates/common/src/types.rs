//! Value objects that flow between the channel layer and the media pipeline.

use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    serde::{Deserialize, Serialize},
};

/// Raw media downloaded from an inbound message.
///
/// Lives only for the duration of a single command handling.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub filename: Option<String>,
}

impl MediaPayload {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Decode a base64 body as delivered by the WhatsApp bridge.
    pub fn from_base64(
        data: &str,
        mime_type: impl Into<String>,
    ) -> Result<Self, base64::DecodeError> {
        Ok(Self::new(STANDARD.decode(data)?, mime_type))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPayload")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .finish()
    }
}

/// Sticker pack attributes attached to sticker replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerMetadata {
    pub author: String,
    pub pack_name: String,
    pub categories: Vec<String>,
}

/// Transcoded media ready to be sent back as a reply.
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
    /// Ask the platform to render the media as a sticker.
    pub send_as_sticker: bool,
    /// Ask the platform to render the media as an auto-playing animation.
    pub send_as_animation: bool,
    pub sticker: Option<StickerMetadata>,
}

impl OutboundMedia {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn with_sticker_metadata(mut self, metadata: StickerMetadata) -> Self {
        if self.send_as_sticker {
            self.sticker = Some(metadata);
        }
        self
    }
}

impl std::fmt::Debug for OutboundMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundMedia")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .field("send_as_sticker", &self.send_as_sticker)
            .field("send_as_animation", &self.send_as_animation)
            .field("sticker", &self.sticker)
            .finish()
    }
}

/// A reply sent back to the chat an inbound message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Media(OutboundMedia),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Media(_) => None,
        }
    }

    pub fn as_media(&self) -> Option<&OutboundMedia> {
        match self {
            Self::Text(_) => None,
            Self::Media(media) => Some(media),
        }
    }
}
