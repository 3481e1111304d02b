//! MIME classification of inbound media.

/// Input class a payload falls into, derived from its MIME type alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    StillImage,
    AnimatedImage,
    Video,
    Unsupported,
}

impl MediaClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StillImage => "still_image",
            Self::AnimatedImage => "animated_image",
            Self::Video => "video",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for MediaClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased `type/subtype` without parameters (`video/mp4; codecs=avc1`
/// becomes `video/mp4`).
pub fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Classify a MIME string.
///
/// `image/gif` is animated, every other `image/*` is still, `video/*` is
/// video, anything else is unsupported.
pub fn classify(mime: &str) -> MediaClass {
    let essence = essence(mime);
    let Some((top, sub)) = essence.split_once('/') else {
        return MediaClass::Unsupported;
    };
    if sub.is_empty() {
        return MediaClass::Unsupported;
    }

    match (top, sub) {
        ("image", "gif") => MediaClass::AnimatedImage,
        ("image", _) => MediaClass::StillImage,
        ("video", _) => MediaClass::Video,
        _ => MediaClass::Unsupported,
    }
}

/// File extension used when writing a payload of this MIME type to disk, so
/// the engine's demuxer probing gets a hint.
pub fn extension_for(mime: &str) -> &'static str {
    match essence(mime).as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

/// MIME type for a file extension, for inputs that arrive without one.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp4" | "m4v" => "video/mp4",
        "3gp" => "video/3gpp",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("image/png", MediaClass::StillImage)]
    #[case("image/jpeg", MediaClass::StillImage)]
    #[case("image/webp", MediaClass::StillImage)]
    #[case("IMAGE/PNG", MediaClass::StillImage)]
    #[case("image/gif", MediaClass::AnimatedImage)]
    #[case("Image/GIF", MediaClass::AnimatedImage)]
    #[case("video/mp4", MediaClass::Video)]
    #[case("video/mp4; codecs=avc1", MediaClass::Video)]
    #[case("video/3gpp", MediaClass::Video)]
    #[case("audio/ogg", MediaClass::Unsupported)]
    #[case("application/pdf", MediaClass::Unsupported)]
    #[case("text/plain", MediaClass::Unsupported)]
    #[case("image/", MediaClass::Unsupported)]
    #[case("image", MediaClass::Unsupported)]
    #[case("", MediaClass::Unsupported)]
    #[case("gif", MediaClass::Unsupported)]
    fn classifies_mime(#[case] mime: &str, #[case] expected: MediaClass) {
        assert_eq!(classify(mime), expected);
    }

    #[rstest]
    #[case("image/png", "png")]
    #[case("image/jpeg", "jpg")]
    #[case("image/gif", "gif")]
    #[case("video/mp4; codecs=avc1", "mp4")]
    #[case("video/quicktime", "mov")]
    #[case("application/octet-stream", "bin")]
    fn picks_extension(#[case] mime: &str, #[case] expected: &str) {
        assert_eq!(extension_for(mime), expected);
    }

    #[rstest]
    #[case("PNG", Some("image/png"))]
    #[case("jpeg", Some("image/jpeg"))]
    #[case("mov", Some("video/quicktime"))]
    #[case("txt", None)]
    #[case("", None)]
    fn maps_extension_to_mime(#[case] extension: &str, #[case] expected: Option<&str>) {
        assert_eq!(mime_for_extension(extension), expected);
    }
}
