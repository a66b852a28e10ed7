use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{HandlerError, PeerError, Result};
use crate::message::Message;

/// Return type of handlers and the unknown-command hook.
pub type HandlerResult = std::result::Result<(), HandlerError>;

type Handler = Box<dyn FnMut(&Message) -> HandlerResult + Send>;
type UnknownHook = Box<dyn FnMut(UnknownCommand<'_>) -> HandlerResult + Send>;

/// Opaque handle returned by [`Dispatcher::attach`], used to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// What the unknown-command hook is called with.
#[derive(Debug, Clone, Copy)]
pub enum UnknownCommand<'a> {
    /// The command is known but nothing is attached to it.
    Unhandled(&'a Message),
    /// The frame's command token matched no command. Carries the unescaped
    /// token as it arrived.
    Unrecognized(&'a [u8]),
}

/// Per-command ordered handler lists plus a single unknown-command hook.
pub struct Dispatcher {
    handlers: HashMap<u16, Vec<(HandlerId, Handler)>>,
    unknown: UnknownHook,
    next_id: u64,
}

impl Dispatcher {
    /// Create a dispatcher whose unknown hook only logs.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            unknown: Box::new(log_unknown),
            next_id: 0,
        }
    }

    /// Append a handler to `command`'s list. Handlers run in attach order.
    pub fn attach<F>(&mut self, command: u16, handler: F) -> HandlerId
    where
        F: FnMut(&Message) -> HandlerResult + Send + 'static,
    {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(command)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Remove a handler wherever it is attached. Returns whether anything
    /// was removed.
    pub fn detach(&mut self, id: HandlerId) -> bool {
        for list in self.handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(handler_id, _)| *handler_id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Replace the unknown-command hook.
    pub fn on_unknown<F>(&mut self, hook: F)
    where
        F: FnMut(UnknownCommand<'_>) -> HandlerResult + Send + 'static,
    {
        self.unknown = Box::new(hook);
    }

    /// Number of handlers attached to `command`.
    pub fn handler_count(&self, command: u16) -> usize {
        self.handlers.get(&command).map_or(0, Vec::len)
    }

    /// Run every handler attached to the message's command, in order, or the
    /// unknown hook when none is attached. The first failure stops dispatch.
    pub fn dispatch(&mut self, message: &Message) -> Result<()> {
        match self.handlers.get_mut(&message.command) {
            Some(list) if !list.is_empty() => {
                for (_, handler) in list.iter_mut() {
                    handler(message).map_err(PeerError::Handler)?;
                }
                Ok(())
            }
            _ => (self.unknown)(UnknownCommand::Unhandled(message)).map_err(PeerError::Handler),
        }
    }

    /// Report a frame whose command token matched no command.
    pub fn dispatch_unrecognized(&mut self, token: &[u8]) -> Result<()> {
        (self.unknown)(UnknownCommand::Unrecognized(token)).map_err(PeerError::Handler)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(u16, usize)> = self
            .handlers
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(command, list)| (*command, list.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("handlers", &counts)
            .field("next_id", &self.next_id)
            .finish()
    }
}

fn log_unknown(unknown: UnknownCommand<'_>) -> HandlerResult {
    match unknown {
        UnknownCommand::Unhandled(message) => {
            debug!(
                command = message.command,
                args = message.args.len(),
                "no handler attached"
            );
        }
        UnknownCommand::Unrecognized(token) => {
            debug!(token = %String::from_utf8_lossy(token), "unrecognized command");
        }
    }
    Ok(())
}
