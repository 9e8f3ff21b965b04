use crate::commands::CommandHandler;
use crate::platform::{IncomingMessage, Reply};

pub const GREETING: &str = "Halo! Bot kamu sudah aktif 😄";

/// Shown next to `/start` in the Telegram command menu
pub const DESCRIPTION: &str = "Aktifkan bot";

/// Answers `/start` with the fixed greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartHandler;

impl CommandHandler for StartHandler {
    fn handle(&self, message: &IncomingMessage) -> Reply {
        Reply {
            chat_id: message.chat_id.clone(),
            text: GREETING.to_string(),
        }
    }
}
