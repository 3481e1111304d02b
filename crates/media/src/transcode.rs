//! Runs a recipe over a payload: stage the input in the workspace, invoke the
//! engine under a deadline, read the result back, and clean up both files on
//! every exit path.

use std::{sync::Arc, time::Duration};

use {
    stickerbot_common::types::{MediaPayload, OutboundMedia},
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    engine::{ConversionEngine, EngineInvocation},
    error::{Error, Result},
    image_ops, mime,
    recipe::Recipe,
    workspace::{PathKind, TempPath, TempWorkspace},
};

/// Default wall-clock limit for one engine run.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(60);

/// One in-flight conversion. Owns both workspace paths; dropping the job
/// removes them.
struct TranscodeJob {
    recipe: Recipe,
    input: TempPath,
    output: TempPath,
    started_at: Instant,
}

impl TranscodeJob {
    fn new(workspace: &TempWorkspace, recipe: Recipe, input_mime: &str) -> Result<Self> {
        Ok(Self {
            recipe,
            input: workspace.acquire(PathKind::Input, mime::extension_for(input_mime))?,
            output: workspace.acquire(PathKind::Output, recipe.output_extension())?,
            started_at: Instant::now(),
        })
    }

    async fn release(self) {
        for path in [self.input, self.output] {
            let shown = path.path().display().to_string();
            if let Err(e) = path.release().await {
                warn!(path = %shown, error = %e, "failed to release workspace file");
            }
        }
    }
}

/// Converts payloads with a [`ConversionEngine`] inside a [`TempWorkspace`].
#[derive(Clone)]
pub struct Transcoder {
    engine: Arc<dyn ConversionEngine>,
    workspace: TempWorkspace,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(engine: Arc<dyn ConversionEngine>, workspace: TempWorkspace) -> Self {
        Self {
            engine,
            workspace,
            timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workspace(&self) -> &TempWorkspace {
        &self.workspace
    }

    /// Convert `payload` with `recipe`.
    ///
    /// Both workspace files are gone by the time this returns, whatever the
    /// outcome.
    pub async fn transcode(&self, recipe: Recipe, payload: &MediaPayload) -> Result<OutboundMedia> {
        if payload.is_empty() {
            return Err(Error::NoMedia);
        }

        let job = TranscodeJob::new(&self.workspace, recipe, &payload.mime_type)?;
        debug!(
            %recipe,
            engine = self.engine.name(),
            max_duration_secs = ?recipe.max_duration_secs(),
            input_mime = %payload.mime_type,
            input_bytes = payload.data.len(),
            "transcode started"
        );

        let result = self.run(&job, payload).await;
        let elapsed_ms = job.started_at.elapsed().as_millis() as u64;
        job.release().await;

        match &result {
            Ok(media) => info!(
                %recipe,
                output_bytes = media.data.len(),
                elapsed_ms,
                "transcode finished"
            ),
            Err(e) => warn!(%recipe, elapsed_ms, error = %e, "transcode failed"),
        }
        result
    }

    async fn run(&self, job: &TranscodeJob, payload: &MediaPayload) -> Result<OutboundMedia> {
        tokio::fs::write(job.input.path(), &payload.data)
            .await
            .map_err(|e| Error::io("writing transcode input", e))?;

        let invocation = EngineInvocation::new(job.recipe, job.input.path(), job.output.path());
        match tokio::time::timeout(self.timeout, self.engine.run(&invocation)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(Error::Timeout {
                    after: self.timeout,
                });
            },
        }

        let data = tokio::fs::read(job.output.path())
            .await
            .map_err(|e| Error::io("reading transcode output", e))?;
        check_output(job.recipe, &data)?;

        Ok(OutboundMedia {
            data,
            mime_type: job.recipe.output_mime().to_string(),
            filename: job.recipe.output_filename().to_string(),
            send_as_sticker: job.recipe.send_as_sticker(),
            send_as_animation: job.recipe.send_as_animation(),
            sticker: None,
        })
    }
}

fn check_output(recipe: Recipe, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::invalid_output("engine produced an empty file"));
    }
    // Single-frame stickers are cheap to inspect; animated outputs are
    // trusted to the recipe's pad filter.
    if recipe == Recipe::StaticSticker
        && let Some((width, height)) = recipe.fixed_canvas()
    {
        image_ops::ensure_canvas(data, width, height)?;
    }
    Ok(())
}
