//! Media pipeline: temp workspace, MIME classification, conversion recipes,
//! engine invocation, and transcoding into stickers and animations.

pub mod engine;
pub mod error;
pub mod image_ops;
pub mod mime;
pub mod recipe;
pub mod transcode;
pub mod workspace;

pub use {
    engine::{ConversionEngine, EngineInvocation, FfmpegEngine},
    error::{Error, Result},
    mime::{MediaClass, classify},
    recipe::Recipe,
    transcode::{DEFAULT_ENGINE_TIMEOUT, Transcoder},
    workspace::{PathKind, TempPath, TempWorkspace},
};
