//! Inbound message processing: the glue between the channel and the media
//! pipeline.
//!
//! Flow: channel message → parse command → canned reply, or resolve target
//! media → classify → pick recipe → transcode → reply with the sticker or
//! animation.

pub mod commands;
pub mod dispatch;
pub mod error;
pub mod resolve;
pub mod texts;

pub use {
    commands::Command,
    dispatch::{Dispatcher, Outcome},
    error::{Error, Result},
    resolve::resolve,
    texts::Texts,
};
