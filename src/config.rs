use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the bot token
pub const TOKEN_ENV: &str = "BOT_TOKEN";

/// Optional file that may carry the token when the environment does not
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .finish()
    }
}

impl Config {
    /// Load from `BOT_TOKEN`, falling back to `config.toml` in the working directory.
    pub fn load() -> Result<Self> {
        Self::resolve(std::env::var(TOKEN_ENV).ok(), Path::new(DEFAULT_CONFIG_PATH))
    }

    /// The environment token wins over the file; the result is always validated.
    fn resolve(env_token: Option<String>, path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            config.telegram.bot_token = token;
        }

        validate_token(&config.telegram.bot_token)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Token safe for logs: bot id kept, secret masked.
    pub fn redacted_token(&self) -> String {
        redact(&self.telegram.bot_token)
    }
}

fn redact(token: &str) -> String {
    match token.split_once(':') {
        Some((id, _)) => format!("{}:***", id),
        None if token.is_empty() => String::new(),
        None => "***".to_string(),
    }
}

/// Bot API tokens look like `123456789:AA...`.
pub fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!(
            "{} is not set (export it or add [telegram] bot_token to {})",
            TOKEN_ENV,
            DEFAULT_CONFIG_PATH
        );
    }
    if token.chars().any(char::is_whitespace) {
        bail!("Bot token must not contain whitespace");
    }
    let Some((id, secret)) = token.split_once(':') else {
        bail!("Bot token must have the form <bot id>:<secret>");
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        bail!("Bot token must start with a numeric bot id");
    }
    if secret.is_empty() {
        bail!("Bot token secret is empty");
    }
    Ok(())
}
