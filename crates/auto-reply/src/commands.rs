//! Command vocabulary.
//!
//! Every media command names its recipe explicitly; the input format only
//! decides between still and animated output inside `.sticker`.

use stickerbot_media::{MediaClass, Recipe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Menu,
    Ping,
    Info,
    Owner,
    /// Still image → static sticker; GIF or video → animated sticker.
    Sticker,
    /// GIF → full-length looping sticker.
    GifSticker,
    /// Video or GIF → short silent animation.
    Animation,
}

/// Accepted spellings, matched case-insensitively against the whole message.
const VOCABULARY: &[(&str, Command)] = &[
    (".menu", Command::Menu),
    (".help", Command::Menu),
    (".ping", Command::Ping),
    (".info", Command::Info),
    (".owner", Command::Owner),
    (".sticker", Command::Sticker),
    (".s", Command::Sticker),
    (".gifsticker", Command::GifSticker),
    (".gs", Command::GifSticker),
    (".gif", Command::Animation),
    (".animation", Command::Animation),
];

impl Command {
    /// Parse a message body. Only an exact command (surrounding whitespace
    /// aside) counts; anything else is ordinary chat.
    pub fn parse(body: &str) -> Option<Self> {
        let normalized = body.trim().to_ascii_lowercase();
        VOCABULARY
            .iter()
            .find(|(word, _)| *word == normalized)
            .map(|(_, command)| *command)
    }

    /// Recipe for an input class, or `None` when this command cannot convert
    /// that class.
    pub fn recipe_for(self, class: MediaClass) -> Option<Recipe> {
        let recipe = match self {
            Self::Sticker => return Recipe::sticker_for(class),
            Self::GifSticker => Recipe::GifSticker,
            Self::Animation => Recipe::Animation,
            Self::Menu | Self::Ping | Self::Info | Self::Owner => return None,
        };
        recipe.accepts(class).then_some(recipe)
    }

    /// Primary spelling, as shown in the menu.
    pub fn keyword(self) -> &'static str {
        VOCABULARY
            .iter()
            .find(|(_, command)| *command == self)
            .map(|(word, _)| *word)
            .unwrap_or_default()
    }
}
