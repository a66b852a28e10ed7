//! Parameter types and command tables for cmdmsg.
//!
//! A [`ParamType`] knows how to turn a [`Value`] into the unescaped bytes of
//! one field and back. A [`CommandTable`] maps command ids and names to the
//! ordered parameter types each command carries.

pub mod error;
pub mod registry;
pub mod types;

pub use error::{CodecError, Result, SchemaError};
pub use registry::{Command, CommandRef, CommandSpec, CommandTable, MAX_COMMANDS};
pub use types::{ParamType, Value, WireKind};
