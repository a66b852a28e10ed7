//! Reserved separator bytes.
//!
//! Three distinct bytes structure the wire format: the field separator between
//! tokens, the line separator ending a frame, and the escape byte that makes the
//! next byte literal. NUL is reserved as well and always travels escaped.

use crate::error::{FrameError, Result};

/// Default field separator (`,`).
pub const DEFAULT_FIELD_SEPARATOR: u8 = b',';

/// Default line separator (`;`).
pub const DEFAULT_LINE_SEPARATOR: u8 = b';';

/// Default escape byte (`/`).
pub const DEFAULT_ESCAPE: u8 = b'/';

/// The separator set shared by both ends of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    /// Separates the command id and the fields of a frame.
    pub field: u8,
    /// Terminates a frame.
    pub line: u8,
    /// Makes the following byte literal.
    pub escape: u8,
}

impl Separators {
    /// Build a validated separator set.
    pub fn new(field: u8, line: u8, escape: u8) -> Result<Self> {
        let separators = Self {
            field,
            line,
            escape,
        };
        separators.validate()?;
        Ok(separators)
    }

    /// Check that the three bytes are distinct and none of them is NUL.
    pub fn validate(&self) -> Result<()> {
        if self.field == self.line || self.field == self.escape || self.line == self.escape {
            return Err(FrameError::InvalidSeparators(format!(
                "field 0x{:02x}, line 0x{:02x} and escape 0x{:02x} must be distinct",
                self.field, self.line, self.escape
            )));
        }
        if [self.field, self.line, self.escape].contains(&0) {
            return Err(FrameError::InvalidSeparators(
                "NUL cannot be used as a separator".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if `byte` must be escaped on the wire.
    pub fn is_reserved(&self, byte: u8) -> bool {
        byte == self.field || byte == self.line || byte == self.escape || byte == 0
    }
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            field: DEFAULT_FIELD_SEPARATOR,
            line: DEFAULT_LINE_SEPARATOR,
            escape: DEFAULT_ESCAPE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_separators_are_valid() {
        let separators = Separators::default();
        assert!(separators.validate().is_ok());
        assert_eq!(separators.field, b',');
        assert_eq!(separators.line, b';');
        assert_eq!(separators.escape, b'/');
    }

    #[test]
    fn duplicate_separators_rejected() {
        let err = Separators::new(b',', b',', b'/').unwrap_err();
        assert!(matches!(err, FrameError::InvalidSeparators(_)));

        let err = Separators::new(b',', b';', b';').unwrap_err();
        assert!(matches!(err, FrameError::InvalidSeparators(_)));
    }

    #[test]
    fn nul_separator_rejected() {
        let err = Separators::new(0, b';', b'/').unwrap_err();
        assert!(matches!(err, FrameError::InvalidSeparators(_)));
    }

    #[test]
    fn reserved_bytes() {
        let separators = Separators::default();
        for byte in [b',', b';', b'/', 0] {
            assert!(separators.is_reserved(byte));
        }
        assert!(!separators.is_reserved(b'a'));
        assert!(!separators.is_reserved(0xFF));
    }
}
