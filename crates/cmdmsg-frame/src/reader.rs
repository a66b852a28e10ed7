use std::io::{ErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{FieldWidth, FrameConfig, RawFrame, Terminator};
use crate::error::{FrameError, Result};

/// Tokenizes frames from any `Read` stream, one byte at a time.
///
/// The reader never reads past the separator that ends the current field, so
/// the stream may be non-seekable and non-peekable. Escapes are resolved while
/// reading: an escape byte sets a flag, and the next byte is taken literally
/// whatever it is.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
    in_frame: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            in_frame: false,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// `resolve` maps the unescaped command token to the widths of the fields
    /// the command declares. When it returns `None` the rest of the frame is
    /// discarded and the returned frame carries no fields.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached between
    /// frames and `Err(FrameError::IncompleteFrame)` when it is reached inside
    /// one.
    pub fn read_frame<'s, F>(&mut self, resolve: F) -> Result<RawFrame>
    where
        F: FnOnce(&[u8]) -> Option<&'s [FieldWidth]>,
    {
        self.in_frame = false;
        let (command, mut terminator) = self.read_delimited()?;

        let Some(widths) = resolve(&command[..]) else {
            if terminator == Terminator::Field {
                let discarded = self.discard_line()?;
                debug!(discarded, "skipped frame with unresolved command");
            }
            return Ok(RawFrame {
                command,
                fields: None,
            });
        };

        let mut fields = Vec::with_capacity(widths.len());
        for (index, width) in widths.iter().enumerate() {
            if terminator == Terminator::Line {
                return Err(FrameError::MissingFields {
                    expected: widths.len(),
                    found: index,
                });
            }
            let (field, next) = match *width {
                FieldWidth::Delimited => self.read_delimited()?,
                FieldWidth::Fixed(n) => self.read_fixed(n)?,
            };
            trace!(index, len = field.len(), ?width, "read field");
            fields.push(field);
            terminator = next;
        }

        if terminator == Terminator::Field {
            let discarded = self.discard_line()?;
            warn!(discarded, "discarded trailing fields");
        }

        Ok(RawFrame {
            command,
            fields: Some(fields),
        })
    }

    /// Discard bytes up to and including the next unescaped line separator.
    ///
    /// Returns the number of bytes discarded, separator excluded.
    pub fn skip_frame(&mut self) -> Result<usize> {
        self.in_frame = false;
        self.discard_line()
    }

    /// Read one raw line, still escaped, up to and including the next
    /// unescaped line separator.
    pub fn read_line(&mut self) -> Result<Bytes> {
        self.in_frame = false;
        let separators = self.config.separators;
        let mut line = BytesMut::new();
        let mut escaped = false;
        loop {
            let byte = self.read_byte()?;
            if line.len() >= self.config.max_line_size {
                return Err(FrameError::LineTooLarge {
                    max: self.config.max_line_size,
                });
            }
            line.put_u8(byte);
            if escaped {
                escaped = false;
            } else if byte == separators.escape {
                escaped = true;
            } else if byte == separators.line {
                return Ok(line.freeze());
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn read_delimited(&mut self) -> Result<(Bytes, Terminator)> {
        let separators = self.config.separators;
        let mut field = BytesMut::new();
        let mut escaped = false;
        loop {
            let byte = self.read_byte()?;
            if escaped {
                escaped = false;
            } else if byte == separators.escape {
                escaped = true;
                continue;
            } else if byte == separators.field {
                return Ok((field.freeze(), Terminator::Field));
            } else if byte == separators.line {
                return Ok((field.freeze(), Terminator::Line));
            }
            self.push_field_byte(&mut field, byte)?;
        }
    }

    fn read_fixed(&mut self, width: usize) -> Result<(Bytes, Terminator)> {
        if width > self.config.max_field_size {
            return Err(FrameError::FieldTooLarge {
                max: self.config.max_field_size,
            });
        }

        let separators = self.config.separators;
        let mut field = BytesMut::with_capacity(width);
        let mut escaped = false;
        while field.len() < width {
            let byte = self.read_byte()?;
            if !escaped && byte == separators.escape {
                escaped = true;
                continue;
            }
            escaped = false;
            field.put_u8(byte);
        }

        let terminator = match self.read_byte()? {
            byte if byte == separators.field => Terminator::Field,
            byte if byte == separators.line => Terminator::Line,
            found => return Err(FrameError::MissingDelimiter { found }),
        };
        Ok((field.freeze(), terminator))
    }

    fn discard_line(&mut self) -> Result<usize> {
        let separators = self.config.separators;
        let mut discarded = 0usize;
        let mut escaped = false;
        loop {
            let byte = self.read_byte()?;
            if escaped {
                escaped = false;
            } else if byte == separators.escape {
                escaped = true;
            } else if byte == separators.line {
                return Ok(discarded);
            }
            discarded += 1;
        }
    }

    fn push_field_byte(&self, field: &mut BytesMut, byte: u8) -> Result<()> {
        if field.len() >= self.config.max_field_size {
            return Err(FrameError::FieldTooLarge {
                max: self.config.max_field_size,
            });
        }
        field.put_u8(byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) if self.in_frame => return Err(FrameError::IncompleteFrame),
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(_) => {
                    self.in_frame = true;
                    return Ok(byte[0]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}
