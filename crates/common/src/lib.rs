//! Value types shared by the channel layer and the media pipeline.

pub mod types;

pub use types::{MediaPayload, OutboundMedia, Reply, StickerMetadata};
