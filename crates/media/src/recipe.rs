//! Conversion recipes: the engine flags and output contract for each kind of
//! sticker or animation the bot produces.

use std::{fmt, str::FromStr};

use crate::mime::MediaClass;

/// Sticker canvas edge in pixels.
pub const STICKER_CANVAS: u32 = 512;

/// Maximum length of an animated sticker cut from a clip.
pub const ANIMATED_STICKER_MAX_SECS: u32 = 8;

/// Maximum length of an animation clip.
pub const ANIMATION_MAX_SECS: u32 = 5;

/// Width of animation clips; height follows the aspect ratio.
pub const ANIMATION_WIDTH: u32 = 320;

/// libwebp quality for still stickers.
pub const STATIC_STICKER_QUALITY: u8 = 80;

/// Fit into the canvas preserving aspect ratio, then pad to a square with a
/// fully transparent fill.
const STICKER_FIT: &str = "scale=512:512:force_original_aspect_ratio=decrease,format=rgba,\
                           pad=512:512:(ow-iw)/2:(oh-ih)/2:color=#00000000";

const GIF_STICKER_FIT: &str = "scale=512:512:flags=lanczos:force_original_aspect_ratio=decrease,\
                               format=rgba,pad=512:512:-1:-1:color=#00000000";

/// `-2` keeps the height even, which yuv420p requires.
const ANIMATION_SCALE: &str = "scale=320:-2:flags=lanczos";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipe {
    /// Still image to a single-frame 512×512 WebP sticker.
    StaticSticker,
    /// GIF or video to a looping, silent, lossless WebP sticker of at most
    /// eight seconds.
    AnimatedSticker,
    /// Video to a short silent MP4 rendered as an auto-playing animation.
    Animation,
    /// GIF to a looping WebP sticker keeping the full animation.
    GifSticker,
}

impl Recipe {
    pub const ALL: [Self; 4] = [
        Self::StaticSticker,
        Self::AnimatedSticker,
        Self::Animation,
        Self::GifSticker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::StaticSticker => "static-sticker",
            Self::AnimatedSticker => "animated-sticker",
            Self::Animation => "animation",
            Self::GifSticker => "gif-sticker",
        }
    }

    /// Input classes this recipe can convert.
    pub fn accepts(self, class: MediaClass) -> bool {
        match self {
            Self::StaticSticker => class == MediaClass::StillImage,
            Self::AnimatedSticker | Self::Animation => {
                matches!(class, MediaClass::AnimatedImage | MediaClass::Video)
            },
            Self::GifSticker => class == MediaClass::AnimatedImage,
        }
    }

    /// The sticker recipe matching an input class, as used by the plain
    /// sticker command.
    pub fn sticker_for(class: MediaClass) -> Option<Self> {
        match class {
            MediaClass::StillImage => Some(Self::StaticSticker),
            MediaClass::AnimatedImage | MediaClass::Video => Some(Self::AnimatedSticker),
            MediaClass::Unsupported => None,
        }
    }

    pub fn output_mime(self) -> &'static str {
        match self {
            Self::StaticSticker | Self::AnimatedSticker | Self::GifSticker => "image/webp",
            Self::Animation => "video/mp4",
        }
    }

    pub fn output_extension(self) -> &'static str {
        match self {
            Self::StaticSticker | Self::AnimatedSticker | Self::GifSticker => "webp",
            Self::Animation => "mp4",
        }
    }

    pub fn output_filename(self) -> &'static str {
        match self {
            Self::StaticSticker | Self::AnimatedSticker | Self::GifSticker => "sticker.webp",
            Self::Animation => "animation.mp4",
        }
    }

    pub fn send_as_sticker(self) -> bool {
        self != Self::Animation
    }

    pub fn send_as_animation(self) -> bool {
        self == Self::Animation
    }

    /// Upper bound on the output duration, if the recipe cuts the input.
    pub fn max_duration_secs(self) -> Option<u32> {
        match self {
            Self::AnimatedSticker => Some(ANIMATED_STICKER_MAX_SECS),
            Self::Animation => Some(ANIMATION_MAX_SECS),
            Self::StaticSticker | Self::GifSticker => None,
        }
    }

    /// Whether the output must be exactly the sticker canvas.
    pub fn fixed_canvas(self) -> Option<(u32, u32)> {
        match self {
            Self::StaticSticker | Self::AnimatedSticker | Self::GifSticker => {
                Some((STICKER_CANVAS, STICKER_CANVAS))
            },
            Self::Animation => None,
        }
    }

    /// Engine flags placed before `-i`.
    pub fn input_args(self) -> Vec<String> {
        match self {
            // Stop decoding early instead of reading the whole clip.
            Self::AnimatedSticker => args(&["-t", &ANIMATED_STICKER_MAX_SECS.to_string()]),
            Self::StaticSticker | Self::Animation | Self::GifSticker => Vec::new(),
        }
    }

    /// Engine flags placed between the input and the output path.
    pub fn output_args(self) -> Vec<String> {
        match self {
            Self::StaticSticker => args(&[
                "-vf",
                STICKER_FIT,
                "-frames:v",
                "1",
                "-c:v",
                "libwebp",
                "-quality",
                &STATIC_STICKER_QUALITY.to_string(),
                "-f",
                "webp",
            ]),
            Self::AnimatedSticker => args(&[
                "-vf",
                STICKER_FIT,
                "-c:v",
                "libwebp",
                "-lossless",
                "1",
                "-qscale",
                "1",
                "-preset",
                "default",
                "-loop",
                "0",
                "-an",
                "-vsync",
                "0",
                "-t",
                &ANIMATED_STICKER_MAX_SECS.to_string(),
                "-f",
                "webp",
            ]),
            Self::Animation => args(&[
                "-vf",
                ANIMATION_SCALE,
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-pix_fmt",
                "yuv420p",
                "-an",
                "-t",
                &ANIMATION_MAX_SECS.to_string(),
                "-movflags",
                "+faststart",
                "-f",
                "mp4",
            ]),
            Self::GifSticker => args(&[
                "-vf",
                GIF_STICKER_FIT,
                "-c:v",
                "libwebp",
                "-loop",
                "0",
                "-compression_level",
                "6",
                "-f",
                "webp",
            ]),
        }
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Recipe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|recipe| recipe.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|r| r.name()).collect();
                format!("unknown recipe {s:?}, expected one of: {}", names.join(", "))
            })
    }
}
