use tracing::{debug, info};

use crate::commands::CommandTable;
use crate::platform::{IncomingMessage, Reply, ReplySink, UpdateSource};

/// Routes incoming messages to the handler registered for their command.
/// Platform-agnostic: reads from an [`UpdateSource`], writes to a [`ReplySink`].
pub struct CommandDispatcher {
    commands: CommandTable,
}

impl CommandDispatcher {
    pub fn new(commands: CommandTable) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Reply for `message`, or `None` when its command is not registered.
    /// Unknown commands and plain text are ignored without error.
    pub fn dispatch(&self, message: &IncomingMessage) -> Option<Reply> {
        if message.command.is_empty() {
            return None;
        }
        let handler = self.commands.get(&message.command)?;
        Some(handler.handle(message))
    }

    /// Handle messages one by one until the source closes.
    ///
    /// Each reply is handed to the sink before the next message is pulled, so
    /// replies leave in the order their messages arrived. Delivery errors are
    /// the sink's business and never stop the loop.
    pub async fn run<S, K>(&self, source: &mut S, sink: &K)
    where
        S: UpdateSource + ?Sized,
        K: ReplySink + ?Sized,
    {
        info!("Dispatcher ready ({} commands)", self.commands.len());

        while let Some(message) = source.next_message().await {
            match self.dispatch(&message) {
                Some(reply) => {
                    debug!(
                        "Command /{} from chat {} handled",
                        message.command, message.chat_id
                    );
                    sink.send(reply).await.ok();
                }
                None => {
                    debug!(
                        "Ignoring message from chat {} (command: {:?})",
                        message.chat_id, message.command
                    );
                }
            }
        }

        info!("Update source closed, dispatcher stopping");
    }
}
