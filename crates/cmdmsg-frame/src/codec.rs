use bytes::{BufMut, Bytes, BytesMut};

use crate::separators::Separators;

/// Default upper bound for a single unescaped field: 16 KiB.
pub const DEFAULT_MAX_FIELD_SIZE: usize = 16 * 1024;

/// Default upper bound for a raw line read in line mode: 64 KiB.
pub const DEFAULT_MAX_LINE_SIZE: usize = 64 * 1024;

/// How the tokenizer finds the end of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// Text field, ended by the next unescaped field or line separator.
    Delimited,
    /// Binary field of exactly N logical bytes, followed by one separator.
    Fixed(usize),
}

/// The separator that ended a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// More fields follow.
    Field,
    /// End of frame.
    Line,
}

/// A tokenized frame: the unescaped command token and its unescaped fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// The command id token as it appeared on the wire (after unescaping).
    pub command: Bytes,
    /// One token per declared field, or `None` when the command token did not
    /// resolve to a schema and the frame was skipped.
    pub fields: Option<Vec<Bytes>>,
}

impl RawFrame {
    /// True when the command token resolved to a known schema.
    pub fn is_resolved(&self) -> bool {
        self.fields.is_some()
    }
}

/// Configuration for the frame tokenizer and encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Reserved separator bytes.
    pub separators: Separators,
    /// Maximum unescaped size of one field. Default: 16 KiB.
    pub max_field_size: usize,
    /// Maximum raw size of a line read in line mode. Default: 64 KiB.
    pub max_line_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            separators: Separators::default(),
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            max_line_size: DEFAULT_MAX_LINE_SIZE,
        }
    }
}

/// Append `src` to `dst`, prefixing every reserved byte with the escape byte.
pub fn escape_into(src: &[u8], separators: &Separators, dst: &mut BytesMut) {
    dst.reserve(src.len());
    for &byte in src {
        if separators.is_reserved(byte) {
            dst.put_u8(separators.escape);
        }
        dst.put_u8(byte);
    }
}

/// Escape a single field.
pub fn escape(src: &[u8], separators: &Separators) -> Vec<u8> {
    let mut dst = BytesMut::with_capacity(src.len());
    escape_into(src, separators, &mut dst);
    dst.to_vec()
}

/// Reverse [`escape`], scanning strictly left to right.
///
/// An escape byte makes the following byte literal, whatever it is. A trailing
/// escape byte with nothing after it is dropped.
pub fn unescape(src: &[u8], escape: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut escaped = false;
    for &byte in src {
        if !escaped && byte == escape {
            escaped = true;
            continue;
        }
        escaped = false;
        out.push(byte);
    }
    out
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// <command id>[<fs><field 1>[<fs><field 2>...]]<ls>
/// ```
///
/// The decimal command id and every field are escaped; separators are not.
pub fn encode_frame<F: AsRef<[u8]>>(
    command: u16,
    fields: &[F],
    separators: &Separators,
    dst: &mut BytesMut,
) {
    escape_into(command.to_string().as_bytes(), separators, dst);
    for field in fields {
        dst.put_u8(separators.field);
        escape_into(field.as_ref(), separators, dst);
    }
    dst.put_u8(separators.line);
}
