//! Channel interfaces.
//!
//! A messaging channel (WhatsApp Web) delivers [`InboundMessage`]s to an
//! [`InboundHandler`] and publishes its pairing code through
//! [`PairingState`]. The media pipeline only ever sees these traits.

pub mod inbound;
pub mod pairing;

pub use {
    inbound::{InboundHandler, InboundMessage},
    pairing::{PairingState, render_svg, render_terminal},
};
