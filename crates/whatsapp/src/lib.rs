//! WhatsApp Web channel.
//!
//! The protocol itself is spoken by a Node sidecar process; this crate
//! starts it, talks to it over a local WebSocket, adapts its messages to
//! [`InboundMessage`](stickerbot_channels::InboundMessage), and keeps the
//! session alive.

pub mod channel;
pub mod message;
pub mod process;
pub mod sidecar;
pub mod types;

pub use {
    channel::WhatsAppChannel,
    message::WhatsAppMessage,
    process::{SidecarConfig, SidecarProcess, find_sidecar_dir},
    sidecar::{DEFAULT_SIDECAR_PORT, SidecarHandle, connect, connect_with_retry},
    types::{GatewayMessage, SidecarMessage, WireMedia, WireMessage},
};
