//! Reply texts.

use {stickerbot_config::BotIdentity, stickerbot_media::Recipe};

use crate::commands::Command;

const PONG: &str = "Pong! 🏓\nThe bot is up and ready.";

const PROCESSING_STICKER: &str = "⏳ Making your sticker...";
const PROCESSING_ANIMATION: &str = "⏳ Converting your video...";
const ANIMATION_DONE: &str = "✅ Video converted to an animation!";

const GENERIC_FAILURE: &str = "❌ Something went wrong while converting. Please try again.";

/// Canned replies, rendered once from the bot identity.
#[derive(Debug, Clone)]
pub struct Texts {
    menu: String,
    info: String,
    owner: String,
}

impl Texts {
    pub fn from_identity(identity: &BotIdentity) -> Self {
        let menu = format!(
            "🤖 *{name} MENU* 🤖\n\n\
             *1.* .sticker - make a sticker from an image, GIF or video\n\
             *2.* .gifsticker - make a looping sticker from a GIF\n\
             *3.* .gif - turn a video or GIF into a short animation\n\
             *4.* .ping - check the bot is alive\n\
             *5.* .info - bot information\n\
             *6.* .owner - who runs this bot\n\n\
             📝 *How to use:*\n\
             • Send media with the command as caption\n\
             • Or reply to a media message with the command",
            name = identity.name.to_uppercase(),
        );

        let info = format!(
            "🤖 *BOT INFO* 🤖\n\n\
             • Name: {}\n\
             • Version: {}\n\
             • Prefix: .\n\
             • Features: sticker maker, GIF sticker, video to animation",
            identity.name, identity.version,
        );

        let mut owner = format!("👨‍💻 *BOT OWNER* 👨‍💻\n\n• Name: {}", identity.owner_name);
        if let Some(contact) = &identity.owner_contact {
            owner.push_str(&format!("\n• Contact: {contact}"));
        }
        if let Some(motto) = &identity.owner_motto {
            owner.push_str(&format!("\n• Motto: {motto}"));
        }

        Self { menu, info, owner }
    }

    /// Immediate reply for text-only commands.
    pub fn canned(&self, command: Command) -> Option<&str> {
        match command {
            Command::Menu => Some(&self.menu),
            Command::Ping => Some(PONG),
            Command::Info => Some(&self.info),
            Command::Owner => Some(&self.owner),
            Command::Sticker | Command::GifSticker | Command::Animation => None,
        }
    }

    /// Corrective reply when no media could be resolved.
    pub fn usage(&self, command: Command) -> String {
        let what = match command {
            Command::GifSticker => "a GIF",
            Command::Animation => "a video or GIF",
            _ => "an image, GIF or video",
        };
        let keyword = command.keyword();
        format!(
            "❌ Send {what} with the caption {keyword}, or reply to a message containing {what} \
             with {keyword}"
        )
    }

    /// Reply when the media type does not fit the command.
    pub fn unsupported(&self, command: Command) -> String {
        let expected = match command {
            Command::GifSticker => "GIFs",
            Command::Animation => "videos and GIFs",
            _ => "images, GIFs and videos",
        };
        format!(
            "❌ Format not supported. {} works with {expected} only.",
            command.keyword()
        )
    }

    pub fn processing(&self, recipe: Recipe) -> &'static str {
        match recipe {
            Recipe::Animation => PROCESSING_ANIMATION,
            Recipe::StaticSticker | Recipe::AnimatedSticker | Recipe::GifSticker => {
                PROCESSING_STICKER
            },
        }
    }

    /// Follow-up text after the media reply, if the recipe has one.
    pub fn done(&self, recipe: Recipe) -> Option<&'static str> {
        (recipe == Recipe::Animation).then_some(ANIMATION_DONE)
    }

    pub fn failure(&self) -> &'static str {
        GENERIC_FAILURE
    }
}

impl Default for Texts {
    fn default() -> Self {
        Self::from_identity(&BotIdentity::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_says_pong() {
        assert!(Texts::default().canned(Command::Ping).unwrap_or_default().contains("Pong"));
    }

    #[test]
    fn media_commands_have_no_canned_reply() {
        let texts = Texts::default();
        assert!(texts.canned(Command::Sticker).is_none());
        assert!(texts.canned(Command::Animation).is_none());
    }

    #[test]
    fn identity_is_rendered() {
        let texts = Texts::from_identity(&BotIdentity {
            name: "Rehan Bot".into(),
            version: "1.0.0".into(),
            owner_name: "Rehan".into(),
            owner_contact: Some("@rehan".into()),
            owner_motto: None,
        });
        assert!(texts.canned(Command::Menu).unwrap_or_default().contains("REHAN BOT"));
        assert!(texts.canned(Command::Info).unwrap_or_default().contains("1.0.0"));
        let owner = texts.canned(Command::Owner).unwrap_or_default();
        assert!(owner.contains("@rehan"));
        assert!(!owner.contains("Motto"));
    }

    #[test]
    fn usage_names_the_command() {
        let usage = Texts::default().usage(Command::Sticker);
        assert!(usage.contains(".sticker"));
        assert!(
            Texts::default()
                .usage(Command::Animation)
                .contains("a video or GIF")
        );
        assert!(!Texts::default().usage(Command::GifSticker).contains("video"));
    }

    #[test]
    fn failure_text_is_generic() {
        assert!(Texts::default().failure().contains("try again"));
    }
}
