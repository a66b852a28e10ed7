//! Command dispatch and send/receive orchestration.
//!
//! This is the "just works" layer. Build a [`Messenger`] over any byte
//! stream from an ordered command list, attach handlers by command name or
//! id, then `send` commands and `receive` (or `run`) to dispatch inbound
//! ones.

pub mod dispatch;
pub mod error;
pub mod message;
pub mod messenger;

pub use dispatch::{Dispatcher, HandlerId, HandlerResult, UnknownCommand};
pub use error::{HandlerError, PeerError, Result};
pub use message::Message;
pub use messenger::{Messenger, RecoveryPolicy};
