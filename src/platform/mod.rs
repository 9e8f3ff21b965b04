pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A message received from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Command name without the leading slash or our own `@bot` suffix; empty for
    /// plain text and for commands addressed to another bot
    pub command: String,
    /// Platform-specific chat ID as string
    pub chat_id: String,
    /// The raw message text
    pub body: String,
}

impl IncomingMessage {
    /// Build a message for a bot that does not know its own username, so any
    /// `/cmd@name` form is treated as addressed elsewhere.
    pub fn from_text(chat_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self::for_bot(None, chat_id, body)
    }

    /// Build a message as seen by the bot `@bot_username`.
    pub fn for_bot(
        bot_username: Option<&str>,
        chat_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        Self {
            command: parse_command(&body, bot_username).to_string(),
            chat_id: chat_id.into(),
            body,
        }
    }
}

/// Outbound text addressed to a single chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: String,
    pub text: String,
}

/// Extract the command name from a message body.
///
/// `/start` and `/start now` give `start`. `/start@name` gives `start` only
/// when `name` is `bot_username` (ASCII case-insensitive); a command addressed
/// to another bot, or any mention when the username is unknown, gives an empty
/// string. Anything not starting with `/` gives an empty string too. Case of
/// the command itself is left untouched.
pub fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> &'a str {
    let Some(rest) = text.strip_prefix('/') else {
        return "";
    };
    let word = rest.split(char::is_whitespace).next().unwrap_or_default();
    match word.split_once('@') {
        None => word,
        Some((command, mention)) => match bot_username {
            Some(me) if mention.eq_ignore_ascii_case(me) => command,
            _ => "",
        },
    }
}

/// Produces incoming messages, one at a time, in delivery order.
#[async_trait]
pub trait UpdateSource: Send {
    /// Returns `None` once the source is closed.
    async fn next_message(&mut self) -> Option<IncomingMessage>;
}

/// Delivers replies back to the platform.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, reply: Reply) -> Result<()>;
}

/// Update source fed by an mpsc channel; closes when every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<IncomingMessage>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<IncomingMessage>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl UpdateSource for ChannelSource {
    async fn next_message(&mut self) -> Option<IncomingMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Replays a fixed list of messages, then closes.
    pub struct ScriptedSource {
        messages: VecDeque<IncomingMessage>,
    }

    impl ScriptedSource {
        pub fn new(messages: impl IntoIterator<Item = IncomingMessage>) -> Self {
            Self {
                messages: messages.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn next_message(&mut self) -> Option<IncomingMessage> {
            self.messages.pop_front()
        }
    }

    /// Keeps every reply it is asked to send.
    #[derive(Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<Reply>>,
    }

    impl RecordingSink {
        pub fn sent(&self) -> Vec<Reply> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send(&self, reply: Reply) -> Result<()> {
            self.sent.lock().unwrap().push(reply);
            Ok(())
        }
    }

    /// Fails every delivery, counting attempts.
    #[derive(Default)]
    pub struct FailingSink {
        attempts: AtomicUsize,
    }

    impl FailingSink {
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReplySink for FailingSink {
        async fn send(&self, reply: Reply) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("network down, could not reach chat {}", reply.chat_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_command() {
        assert_eq!(parse_command("/start", None), "start");
        assert_eq!(parse_command("/start", Some("HaloBot")), "start");
    }

    #[test]
    fn test_parse_accepts_own_mention_any_case() {
        assert_eq!(parse_command("/start@HaloBot", Some("HaloBot")), "start");
        assert_eq!(parse_command("/start@halobot", Some("HaloBot")), "start");
        assert_eq!(parse_command("/start@HALOBOT now", Some("HaloBot")), "start");
    }

    #[test]
    fn test_parse_rejects_other_bot_mention() {
        assert_eq!(parse_command("/start@SomeOtherBot", Some("HaloBot")), "");
        assert_eq!(parse_command("/start@HaloBotX", Some("HaloBot")), "");
        assert_eq!(parse_command("/start@", Some("HaloBot")), "");
    }

    #[test]
    fn test_parse_rejects_mention_when_username_unknown() {
        assert_eq!(parse_command("/start@HaloBot", None), "");
    }

    #[test]
    fn test_parse_ignores_arguments() {
        assert_eq!(parse_command("/start hello there", None), "start");
        assert_eq!(parse_command("/start\nsecond line", None), "start");
    }

    #[test]
    fn test_parse_keeps_case() {
        assert_eq!(parse_command("/Start", None), "Start");
    }

    #[test]
    fn test_parse_non_command_is_empty() {
        assert_eq!(parse_command("start", None), "");
        assert_eq!(parse_command("halo /start", None), "");
        assert_eq!(parse_command("", None), "");
        assert_eq!(parse_command("/", None), "");
        assert_eq!(parse_command("/ start", None), "");
    }

    #[test]
    fn test_for_bot_keeps_own_mention() {
        let msg = IncomingMessage::for_bot(Some("HaloBot"), "-100", "/start@HaloBot");
        assert_eq!(msg.command, "start");
        assert_eq!(msg.body, "/start@HaloBot");
    }

    #[test]
    fn test_from_text_fills_all_fields() {
        let msg = IncomingMessage::from_text("42", "/start");
        assert_eq!(msg.command, "start");
        assert_eq!(msg.chat_id, "42");
        assert_eq!(msg.body, "/start");
    }

    #[tokio::test]
    async fn test_channel_source_preserves_order_and_closes() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = ChannelSource::new(rx);

        tx.send(IncomingMessage::from_text("1", "/start")).await.unwrap();
        tx.send(IncomingMessage::from_text("2", "/help")).await.unwrap();
        drop(tx);

        assert_eq!(source.next_message().await.unwrap().chat_id, "1");
        assert_eq!(source.next_message().await.unwrap().chat_id, "2");
        assert!(source.next_message().await.is_none());
    }
}
