pub mod start;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::platform::{IncomingMessage, Reply};

pub use start::StartHandler;

/// Turns a routed message into the reply for its chat.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, message: &IncomingMessage) -> Reply;
}

#[derive(Clone)]
struct CommandEntry {
    description: String,
    handler: Arc<dyn CommandHandler>,
}

/// Fixed mapping from command name to handler.
///
/// Built once with [`CommandTable::with_command`] and never mutated after it
/// is handed to the dispatcher. Lookups are exact and case-sensitive.
#[derive(Clone, Default)]
pub struct CommandTable {
    entries: HashMap<String, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. A repeated name replaces the earlier entry.
    pub fn with_command(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        info!("Registered command: /{} ({})", name, description);
        self.entries.insert(
            name,
            CommandEntry {
                description,
                handler: Arc::new(handler),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.entries.get(name).map(|entry| entry.handler.as_ref())
    }

    /// `(name, description)` pairs sorted by name
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut commands: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
            .collect();
        commands.sort_unstable_by_key(|(name, _)| *name);
        commands
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.list().into_iter().map(|(name, _)| name))
            .finish()
    }
}

/// The table the bot runs with: just `/start`.
pub fn default_commands() -> CommandTable {
    CommandTable::new().with_command("start", start::DESCRIPTION, StartHandler)
}
