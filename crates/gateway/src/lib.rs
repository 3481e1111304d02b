//! HTTP status surface: liveness, health and the pending pairing code.
//!
//! Runs beside the WhatsApp session on its own task and only ever reads the
//! shared [`PairingState`](stickerbot_channels::PairingState).

pub mod server;

pub use server::{AppState, build_app, serve};
