/// Errors that can occur while encoding or tokenizing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly between frames.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended after part of a frame was read.
    #[error("connection closed (incomplete frame)")]
    IncompleteFrame,

    /// The line separator arrived before every declared field was read.
    #[error("frame ended after {found} of {expected} fields")]
    MissingFields { expected: usize, found: usize },

    /// A fixed-width field was not followed by a field or line separator.
    #[error("expected separator after fixed-width field, found byte 0x{found:02x}")]
    MissingDelimiter { found: u8 },

    /// A single field exceeded the configured maximum size.
    #[error("field too large (over {max} bytes)")]
    FieldTooLarge { max: usize },

    /// A raw line exceeded the configured maximum size.
    #[error("line too large (over {max} bytes)")]
    LineTooLarge { max: usize },

    /// The separator configuration is unusable.
    #[error("invalid separators: {0}")]
    InvalidSeparators(String),
}

impl FrameError {
    /// True when the frame's line separator has already been consumed, so the
    /// stream sits at the start of the next frame.
    pub fn is_frame_complete(&self) -> bool {
        matches!(self, FrameError::MissingFields { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
