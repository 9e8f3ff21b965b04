mod commands;
mod config;
mod dispatcher;
mod platform;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatcher::CommandDispatcher;
use crate::platform::telegram;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,halo_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loading configuration");
    let config = Config::load().context("Failed to load bot configuration")?;

    info!("Configuration loaded successfully");
    info!("  Token: {}", config.redacted_token());

    let commands = commands::default_commands();
    info!("  Commands: {:?}", commands);
    let dispatcher = Arc::new(CommandDispatcher::new(commands));

    let bot = Bot::new(&config.telegram.bot_token);
    let me = telegram::verify_token(&bot).await?;
    telegram::register_commands(&bot, dispatcher.commands()).await;

    info!("Bot is starting...");
    telegram::run(bot, dispatcher, me.user.username.clone()).await?;

    info!("Bot stopped");
    Ok(())
}
