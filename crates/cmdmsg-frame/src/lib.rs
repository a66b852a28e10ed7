//! Escaped, delimiter-separated command framing for serial byte streams.
//!
//! Every frame is a command id followed by zero or more fields:
//! - A field separator (default `,`) between tokens
//! - A line separator (default `;`) ending the frame
//! - An escape byte (default `/`) making the next byte literal
//!
//! Text fields end at the next unescaped separator. Binary fields have a fixed
//! logical width and are followed by exactly one separator. Both are tokenized
//! by the same byte-at-a-time reader.

pub mod codec;
pub mod error;
pub mod reader;
pub mod separators;
pub mod writer;

pub use codec::{
    encode_frame, escape, escape_into, unescape, FieldWidth, FrameConfig, RawFrame, Terminator,
    DEFAULT_MAX_FIELD_SIZE, DEFAULT_MAX_LINE_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use separators::{Separators, DEFAULT_ESCAPE, DEFAULT_FIELD_SEPARATOR, DEFAULT_LINE_SEPARATOR};
pub use writer::FrameWriter;
