//! Command dispatch: one inbound message in, zero or more replies out.

use {
    async_trait::async_trait,
    stickerbot_channels::{InboundHandler, InboundMessage},
    stickerbot_common::types::{Reply, StickerMetadata},
    stickerbot_config::StickerBotConfig,
    stickerbot_media::{Recipe, Transcoder, classify},
    tracing::{debug, error, warn},
};

use crate::{
    commands::Command,
    error::{Error, Result},
    resolve::resolve,
    texts::Texts,
};

/// What happened to a message. Returned for logging and tests; the chat has
/// already been answered by the time a caller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command.
    Ignored,
    /// A text command got its canned reply.
    Answered(Command),
    /// A media command found nothing to convert.
    NoMedia(Command),
    Unsupported { command: Command, mime_type: String },
    Converted { command: Command, recipe: Recipe },
    /// Conversion or download failed; the user got the generic apology.
    Failed(Command),
}

/// Routes inbound messages to canned replies or the media pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    transcoder: Transcoder,
    texts: Texts,
    sticker: StickerMetadata,
}

impl Dispatcher {
    pub fn new(transcoder: Transcoder, texts: Texts, sticker: StickerMetadata) -> Self {
        Self {
            transcoder,
            texts,
            sticker,
        }
    }

    pub fn from_config(transcoder: Transcoder, config: &StickerBotConfig) -> Self {
        let sticker = StickerMetadata {
            author: config.sticker.author.clone(),
            pack_name: config.sticker.pack_name.clone(),
            categories: config.sticker.categories.clone(),
        };
        Self::new(transcoder, Texts::from_identity(&config.bot), sticker)
    }

    /// Handle one message. Never fails: every error ends as a reply or a log
    /// line.
    pub async fn dispatch(&self, message: &dyn InboundMessage) -> Outcome {
        let Some(command) = Command::parse(message.body()) else {
            return Outcome::Ignored;
        };
        debug!(command = command.keyword(), "command received");

        if let Some(text) = self.texts.canned(command) {
            self.send(message, Reply::text(text)).await;
            return Outcome::Answered(command);
        }

        match self.convert(command, message).await {
            Ok(recipe) => Outcome::Converted { command, recipe },
            Err(e) => self.report(command, e, message).await,
        }
    }

    async fn convert(&self, command: Command, message: &dyn InboundMessage) -> Result<Recipe> {
        let payload = resolve(message).await?;
        let class = classify(&payload.mime_type);
        let recipe = command
            .recipe_for(class)
            .ok_or_else(|| Error::UnsupportedFormat {
                mime_type: payload.mime_type.clone(),
            })?;

        self.send(message, Reply::text(self.texts.processing(recipe)))
            .await;

        let media = self
            .transcoder
            .transcode(recipe, &payload)
            .await?
            .with_sticker_metadata(self.sticker.clone());
        self.send(message, Reply::Media(media)).await;

        if let Some(done) = self.texts.done(recipe) {
            self.send(message, Reply::text(done)).await;
        }
        Ok(recipe)
    }

    async fn report(&self, command: Command, err: Error, message: &dyn InboundMessage) -> Outcome {
        let keyword = command.keyword();
        match err {
            Error::NoMediaFound | Error::Transcode(stickerbot_media::Error::NoMedia) => {
                debug!(command = keyword, "no media to convert");
                self.send(message, Reply::text(self.texts.usage(command)))
                    .await;
                Outcome::NoMedia(command)
            },
            Error::UnsupportedFormat { mime_type } => {
                debug!(command = keyword, %mime_type, "unsupported media type");
                self.send(message, Reply::text(self.texts.unsupported(command)))
                    .await;
                Outcome::Unsupported { command, mime_type }
            },
            err => {
                error!(command = keyword, error = %err, "command failed");
                self.send(message, Reply::text(self.texts.failure())).await;
                Outcome::Failed(command)
            },
        }
    }

    async fn send(&self, message: &dyn InboundMessage, reply: Reply) {
        let kind = if reply.as_media().is_some() {
            "media"
        } else {
            "text"
        };
        if let Err(e) = message.reply(reply).await {
            warn!(kind, error = %e, "failed to send reply");
        }
    }
}

#[async_trait]
impl InboundHandler for Dispatcher {
    async fn handle(&self, message: Box<dyn InboundMessage>) {
        let outcome = self.dispatch(message.as_ref()).await;
        debug!(?outcome, "message handled");
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        anyhow::anyhow,
        image::{DynamicImage, ImageFormat, RgbaImage},
        std::{
            io::Cursor,
            path::Path,
            sync::{Arc, Mutex},
        },
        stickerbot_common::types::MediaPayload,
        stickerbot_media::{ConversionEngine, EngineInvocation, TempWorkspace},
    };

    /// Scriptable inbound message that records what the bot sends back.
    #[derive(Clone, Default)]
    pub(crate) struct FakeMessage {
        body: String,
        media: Option<MediaPayload>,
        quoted: Option<Box<FakeMessage>>,
        quoted_deleted: bool,
        download_fails: bool,
        reply_fails: bool,
        replies: Arc<Mutex<Vec<Reply>>>,
    }

    impl FakeMessage {
        pub(crate) fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                ..Self::default()
            }
        }

        pub(crate) fn with_media(mut self, mime_type: &str, data: &[u8]) -> Self {
            self.media = Some(MediaPayload::new(data.to_vec(), mime_type));
            self
        }

        pub(crate) fn quoting(mut self, quoted: FakeMessage) -> Self {
            self.quoted = Some(Box::new(quoted));
            self
        }

        /// Quotes a message that can no longer be fetched.
        pub(crate) fn quoting_deleted(mut self) -> Self {
            self.quoted_deleted = true;
            self
        }

        pub(crate) fn failing_download(mut self) -> Self {
            self.download_fails = true;
            self
        }

        pub(crate) fn failing_replies(mut self) -> Self {
            self.reply_fails = true;
            self
        }

        pub(crate) fn replies(&self) -> Vec<Reply> {
            self.replies.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InboundMessage for FakeMessage {
        fn body(&self) -> &str {
            &self.body
        }

        fn has_media(&self) -> bool {
            self.media.is_some()
        }

        fn has_quoted_message(&self) -> bool {
            self.quoted.is_some() || self.quoted_deleted
        }

        async fn quoted_message(&self) -> anyhow::Result<Option<Box<dyn InboundMessage>>> {
            if self.quoted_deleted {
                return Ok(None);
            }
            Ok(self
                .quoted
                .clone()
                .map(|quoted| quoted as Box<dyn InboundMessage>))
        }

        async fn download_media(&self) -> anyhow::Result<Option<MediaPayload>> {
            if self.download_fails {
                return Err(anyhow!("media server unreachable"));
            }
            Ok(self.media.clone())
        }

        async fn reply(&self, reply: Reply) -> anyhow::Result<()> {
            if self.reply_fails {
                return Err(anyhow!("session closed"));
            }
            self.replies.lock().unwrap().push(reply);
            Ok(())
        }
    }

    /// Engine that writes canned bytes, or fails with a canned diagnostic.
    struct FakeEngine {
        output: std::result::Result<Vec<u8>, &'static str>,
        recipes: Mutex<Vec<Recipe>>,
    }

    impl FakeEngine {
        fn recipes(&self) -> Vec<Recipe> {
            self.recipes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConversionEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        async fn run(&self, invocation: &EngineInvocation) -> stickerbot_media::Result<()> {
            self.recipes.lock().unwrap().push(invocation.recipe);
            match &self.output {
                Ok(data) => {
                    std::fs::write(&invocation.output, data).unwrap();
                    Ok(())
                },
                Err(diagnostic) => Err(stickerbot_media::Error::engine(*diagnostic)),
            }
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        engine: Arc<FakeEngine>,
        transcoder: Transcoder,
        dispatcher: Dispatcher,
    }

    impl Harness {
        fn new(output: std::result::Result<Vec<u8>, &'static str>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let engine = Arc::new(FakeEngine {
                output,
                recipes: Mutex::new(Vec::new()),
            });
            let workspace = TempWorkspace::create(dir.path().join("temp")).unwrap();
            let transcoder = Transcoder::new(engine.clone(), workspace);
            let dispatcher =
                Dispatcher::from_config(transcoder.clone(), &StickerBotConfig::default());
            Self {
                _dir: dir,
                engine,
                transcoder,
                dispatcher,
            }
        }

        fn residue(&self) -> usize {
            residue(self.transcoder.workspace().root())
        }
    }

    fn residue(root: &Path) -> usize {
        std::fs::read_dir(root)
            .map(|entries| entries.count())
            .unwrap_or_default()
    }

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }

    fn sticker_webp() -> Vec<u8> {
        encode(512, 512, ImageFormat::WebP)
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".ping");

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Answered(Command::Ping));
        let replies = msg.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].as_text().unwrap().contains("Pong"));
        assert!(harness.engine.recipes().is_empty());
    }

    #[tokio::test]
    async fn ordinary_chat_is_ignored() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new("nice sticker!").with_media("image/png", b"png");

        assert_eq!(harness.dispatcher.dispatch(&msg).await, Outcome::Ignored);
        assert!(msg.replies().is_empty());
    }

    #[tokio::test]
    async fn sticker_without_media_gets_usage() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".sticker");

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::NoMedia(Command::Sticker));
        let replies = msg.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].as_text().unwrap().contains(".sticker"));
        assert!(harness.engine.recipes().is_empty());
    }

    #[tokio::test]
    async fn png_becomes_sticker_with_metadata() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg =
            FakeMessage::new(".sticker").with_media("image/png", &encode(40, 20, ImageFormat::Png));

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Converted {
            command: Command::Sticker,
            recipe: Recipe::StaticSticker,
        });
        let replies = msg.replies();
        assert_eq!(replies.len(), 2);
        assert!(replies[0].as_text().is_some(), "processing notice first");
        let media = replies[1].as_media().unwrap();
        assert_eq!(media.mime_type, "image/webp");
        assert!(media.send_as_sticker);
        let sticker = media.sticker.as_ref().unwrap();
        assert_eq!(sticker.pack_name, "Sticker");
        assert_eq!(harness.engine.recipes(), vec![Recipe::StaticSticker]);
        assert_eq!(harness.residue(), 0);
    }

    #[tokio::test]
    async fn quoted_gif_becomes_animated_sticker() {
        let harness = Harness::new(Ok(b"RIFF....WEBP".to_vec()));
        let quoted = FakeMessage::new("").with_media("image/gif", b"GIF89a");
        let msg = FakeMessage::new(".s").quoting(quoted);

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Converted {
            command: Command::Sticker,
            recipe: Recipe::AnimatedSticker,
        });
        assert_eq!(msg.replies().len(), 2);
    }

    #[tokio::test]
    async fn video_becomes_animation_with_confirmation() {
        let harness = Harness::new(Ok(b"\0\0\0\x18ftypisom".to_vec()));
        let msg = FakeMessage::new(".gif").with_media("video/mp4", b"clip");

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Converted {
            command: Command::Animation,
            recipe: Recipe::Animation,
        });
        let replies = msg.replies();
        assert_eq!(replies.len(), 3);
        let media = replies[1].as_media().unwrap();
        assert!(media.send_as_animation);
        assert!(media.sticker.is_none());
        assert!(replies[2].as_text().is_some());
        assert_eq!(harness.residue(), 0);
    }

    #[tokio::test]
    async fn unsupported_format_is_rejected_before_the_engine() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".sticker").with_media("application/pdf", b"%PDF");

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Unsupported {
            command: Command::Sticker,
            mime_type: "application/pdf".into(),
        });
        assert!(msg.replies()[0].as_text().unwrap().contains("not supported"));
        assert!(harness.engine.recipes().is_empty());
    }

    #[tokio::test]
    async fn gif_sticker_rejects_video() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".gs").with_media("video/mp4", b"clip");

        assert!(matches!(
            harness.dispatcher.dispatch(&msg).await,
            Outcome::Unsupported {
                command: Command::GifSticker,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn engine_failure_hides_diagnostic() {
        let harness = Harness::new(Err("moov atom not found"));
        let msg = FakeMessage::new(".sticker").with_media("video/mp4", b"broken");

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Failed(Command::Sticker));
        let replies = msg.replies();
        assert_eq!(replies.len(), 2);
        let apology = replies[1].as_text().unwrap();
        assert!(apology.contains("try again"));
        assert!(!apology.contains("moov"));
        assert_eq!(harness.residue(), 0);
    }

    #[tokio::test]
    async fn download_failure_gets_generic_reply() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".sticker")
            .with_media("image/png", b"png")
            .failing_download();

        assert_eq!(
            harness.dispatcher.dispatch(&msg).await,
            Outcome::Failed(Command::Sticker)
        );
        assert!(msg.replies()[0].as_text().unwrap().contains("try again"));
    }

    #[tokio::test]
    async fn reply_failures_are_not_fatal() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".sticker")
            .with_media("image/png", &encode(8, 8, ImageFormat::Png))
            .failing_replies();

        let outcome = harness.dispatcher.dispatch(&msg).await;

        assert_eq!(outcome, Outcome::Converted {
            command: Command::Sticker,
            recipe: Recipe::StaticSticker,
        });
        assert_eq!(harness.residue(), 0);
    }

    #[tokio::test]
    async fn handler_replies_through_boxed_message() {
        let harness = Harness::new(Ok(sticker_webp()));
        let msg = FakeMessage::new(".menu");
        let replies = msg.replies.clone();

        harness.dispatcher.handle(Box::new(msg)).await;

        let replies = replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].as_text().unwrap().contains(".sticker"));
    }
}
