use cmdmsg_frame::FrameError;
use cmdmsg_schema::{CodecError, SchemaError};

/// Error type returned by message handlers and the unknown-command hook.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while sending, receiving or dispatching commands.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The command list could not be turned into a table.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No command matches the id or name passed to `send`.
    #[error("unknown command {0}")]
    UnknownCommand(String),

    /// `send` was called with the wrong number of arguments.
    #[error("command {command} takes {expected} arguments, got {found}")]
    ArgumentCount {
        command: u16,
        expected: usize,
        found: usize,
    },

    /// An outbound argument does not fit its declared parameter type.
    #[error("cannot encode argument {index} of command {command}: {source}")]
    Encode {
        command: u16,
        index: usize,
        source: CodecError,
    },

    /// An inbound field does not parse as its declared parameter type.
    #[error("cannot decode field {index} of command {command}: {source}")]
    Decode {
        command: u16,
        index: usize,
        source: CodecError,
    },

    /// A command with fixed-width parameters arrived on the line path, which
    /// cannot locate binary field boundaries.
    #[error("command {command} has binary parameters and cannot be read as a line")]
    BinaryInLineMode { command: u16 },

    /// A handler or the unknown-command hook failed.
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),
}

impl PeerError {
    /// True when the stream is still usable after this error, possibly after
    /// resynchronizing to the next line separator.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PeerError::Frame(err) => matches!(
                err,
                FrameError::MissingFields { .. }
                    | FrameError::MissingDelimiter { .. }
                    | FrameError::FieldTooLarge { .. }
                    | FrameError::LineTooLarge { .. }
            ),
            PeerError::UnknownCommand(_)
            | PeerError::ArgumentCount { .. }
            | PeerError::Encode { .. }
            | PeerError::Decode { .. }
            | PeerError::BinaryInLineMode { .. } => true,
            PeerError::Schema(_) | PeerError::Handler(_) => false,
        }
    }

    /// True when the failing frame was read through its line separator, so
    /// no resynchronization is needed before the next receive.
    pub fn is_frame_complete(&self) -> bool {
        match self {
            PeerError::Frame(err) => err.is_frame_complete(),
            PeerError::Decode { .. } | PeerError::BinaryInLineMode { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
