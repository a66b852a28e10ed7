use crate::types::ParamType;

/// Errors raised while building a command table.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A command declares a parameter type that is not registered.
    #[error("command {command} declares unknown parameter type '{type_name}'")]
    UnknownType { command: String, type_name: String },

    /// The command list does not fit the 16-bit id space.
    #[error("too many commands ({count}, max {max})")]
    TooManyCommands { count: usize, max: usize },

    /// The command list is not valid JSON.
    #[error("command list is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors raised while encoding or decoding a single field.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value's kind does not fit the declared parameter type.
    #[error("cannot encode {found} value as {expected}")]
    TypeMismatch {
        expected: ParamType,
        found: &'static str,
    },

    /// A numeric value lies outside the range of the declared type.
    #[error("{value} does not fit {ty}")]
    OutOfRange { ty: ParamType, value: String },

    /// A binary field has the wrong number of bytes.
    #[error("{ty} needs {expected} bytes, got {actual}")]
    WidthMismatch {
        ty: ParamType,
        expected: usize,
        actual: usize,
    },

    /// A text field is not valid UTF-8.
    #[error("{ty} field is not valid UTF-8: {source}")]
    InvalidUtf8 {
        ty: ParamType,
        source: std::str::Utf8Error,
    },

    /// A text field does not parse as its declared type.
    #[error("cannot parse '{text}' as {ty}")]
    Parse { ty: ParamType, text: String },

    /// A field that needs at least one character is empty.
    #[error("{ty} field is empty")]
    Empty { ty: ParamType },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
