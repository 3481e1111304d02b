//! `stickerbot convert`: run one recipe over a local file.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    clap::Args,
    stickerbot_common::types::MediaPayload,
    stickerbot_media::{Recipe, Transcoder, classify, image_ops, mime::mime_for_extension},
};

#[derive(Args)]
pub struct ConvertArgs {
    /// static-sticker, animated-sticker, animation or gif-sticker.
    #[arg(long, short)]
    recipe: Recipe,
    /// Input MIME type. Guessed from the content or extension when omitted.
    #[arg(long)]
    mime: Option<String>,
    input: PathBuf,
    output: PathBuf,
}

pub async fn handle_convert(args: &ConvertArgs, transcoder: &Transcoder) -> Result<()> {
    let data = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mime = input_mime(args.mime.as_deref(), &args.input, &data)
        .context("cannot tell the input type, pass --mime")?;

    let class = classify(&mime);
    if !args.recipe.accepts(class) {
        bail!("{} cannot convert {mime} ({class})", args.recipe);
    }

    let media = transcoder
        .transcode(args.recipe, &MediaPayload::new(data, mime))
        .await?;
    tokio::fs::write(&args.output, &media.data)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "{} -> {} ({}, {} bytes)",
        args.input.display(),
        args.output.display(),
        media.mime_type,
        media.data.len()
    );
    Ok(())
}

/// Explicit MIME, else sniffed image format, else the file extension.
fn input_mime(explicit: Option<&str>, path: &Path, data: &[u8]) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| image_ops::sniff_mime(data).map(str::to_string))
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(mime_for_extension)
                .map(str::to_string)
        })
}
