use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ChatId, Me, UpdateKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::commands::CommandTable;
use crate::dispatcher::CommandDispatcher;
use crate::platform::{ChannelSource, IncomingMessage, Reply, ReplySink};

/// Messages waiting between teloxide's polling and the dispatcher loop
const UPDATE_BUFFER: usize = 64;

/// Sends replies through the Bot API. Failures are logged here and
/// reported to the caller, never retried.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn deliver(&self, reply: Reply) -> Result<()> {
        let chat_id: i64 = reply
            .chat_id
            .parse()
            .with_context(|| format!("Invalid Telegram chat id: {}", reply.chat_id))?;
        self.bot
            .send_message(ChatId(chat_id), reply.text)
            .await
            .with_context(|| format!("Failed to send reply to chat {}", chat_id))?;
        Ok(())
    }
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn send(&self, reply: Reply) -> Result<()> {
        let result = self.deliver(reply).await;
        if let Err(e) = &result {
            error!("Reply delivery failed: {:#}", e);
        }
        result
    }
}

/// Ask Telegram who we are; a rejected token fails startup here.
pub async fn verify_token(bot: &Bot) -> Result<Me> {
    let me = bot
        .get_me()
        .await
        .context("Telegram rejected the bot token (getMe failed)")?;
    info!(
        "Authorized as @{} (id {})",
        me.user.username.as_deref().unwrap_or("<no username>"),
        me.user.id
    );
    Ok(me)
}

/// Publish the command menu. Not fatal: the bot works without it.
pub async fn register_commands(bot: &Bot, commands: &CommandTable) {
    if commands.is_empty() {
        return;
    }

    let menu: Vec<BotCommand> = commands
        .list()
        .into_iter()
        .map(|(name, description)| BotCommand::new(name, description))
        .collect();

    match bot.set_my_commands(menu).await {
        Ok(_) => info!("Registered {} command(s) with Telegram", commands.len()),
        Err(e) => warn!("Failed to register bot commands: {}", e),
    }
}

/// Run the Telegram platform until Ctrl-C.
///
/// teloxide polls and may process chats concurrently, so every text message,
/// new or edited, is funnelled through one channel into a single dispatcher
/// task. That task drains what is left once polling stops. `bot_username`
/// decides which `/cmd@name` mentions count as ours.
pub async fn run(
    bot: Bot,
    dispatcher: Arc<CommandDispatcher>,
    bot_username: Option<String>,
) -> Result<()> {
    info!("Starting Telegram platform...");

    let (tx, rx) = mpsc::channel::<IncomingMessage>(UPDATE_BUFFER);
    let sink = TelegramSink::new(bot.clone());
    let consumer = tokio::spawn(async move {
        let mut source = ChannelSource::new(rx);
        dispatcher.run(&mut source, &sink).await;
    });

    let handler = dptree::filter_map(move |update: Update| {
        incoming_from_update(&update, bot_username.as_deref())
    })
    .endpoint(forward_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tx])
        .default_handler(|upd| async move {
            if is_chat_message(&upd) {
                debug!("Skipping non-text message (update {:?})", upd.id);
            } else {
                warn!("Unhandled update: {:?}", upd.id);
            }
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    consumer.await.context("Dispatcher task panicked")?;

    Ok(())
}

/// Text of a new or edited message, as seen by `@bot_username`.
fn incoming_from_update(update: &Update, bot_username: Option<&str>) -> Option<IncomingMessage> {
    let msg = match &update.kind {
        UpdateKind::Message(msg) | UpdateKind::EditedMessage(msg) => msg,
        _ => return None,
    };
    let text = msg.text()?;
    Some(IncomingMessage::for_bot(
        bot_username,
        msg.chat.id.0.to_string(),
        text,
    ))
}

fn is_chat_message(update: &Update) -> bool {
    matches!(
        update.kind,
        UpdateKind::Message(_) | UpdateKind::EditedMessage(_)
    )
}

async fn forward_message(
    incoming: IncomingMessage,
    tx: mpsc::Sender<IncomingMessage>,
) -> ResponseResult<()> {
    info!(
        "Telegram message in chat {}: {}",
        incoming.chat_id, incoming.body
    );

    if tx.send(incoming).await.is_err() {
        warn!("Dispatcher loop is gone, dropping message");
    }

    Ok(())
}
