//! Built-in parameter types and their wire codecs.
//!
//! Text types are self-delimiting decimal or UTF-8 strings. Binary types are
//! fixed-width little-endian encodings whose raw bytes travel escaped.

use std::fmt;
use std::str::FromStr;

use cmdmsg_frame::FieldWidth;

use crate::error::CodecError;

/// How a parameter type is represented inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// Self-delimiting text.
    Text,
    /// Fixed-width raw bytes.
    Binary,
}

/// A registered parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    Int16,
    Int32,
    Float,
    Double,
    Char,
    String,
    EscapedString,
    FloatSci,
    DoubleSci,
    ByteBool,
    ByteInt16,
    ByteInt32,
    ByteFloat,
    ByteDouble,
}

impl ParamType {
    /// Every registered type, text types first.
    pub const ALL: [ParamType; 15] = [
        ParamType::Bool,
        ParamType::Int16,
        ParamType::Int32,
        ParamType::Float,
        ParamType::Double,
        ParamType::Char,
        ParamType::String,
        ParamType::EscapedString,
        ParamType::FloatSci,
        ParamType::DoubleSci,
        ParamType::ByteBool,
        ParamType::ByteInt16,
        ParamType::ByteInt32,
        ParamType::ByteFloat,
        ParamType::ByteDouble,
    ];

    /// Canonical type name.
    pub fn name(self) -> &'static str {
        match self {
            ParamType::Bool => "bool",
            ParamType::Int16 => "int16",
            ParamType::Int32 => "int32",
            ParamType::Float => "float",
            ParamType::Double => "double",
            ParamType::Char => "char",
            ParamType::String => "string",
            ParamType::EscapedString => "escaped_string",
            ParamType::FloatSci => "float_sci",
            ParamType::DoubleSci => "double_sci",
            ParamType::ByteBool => "byte_bool",
            ParamType::ByteInt16 => "byte_int16",
            ParamType::ByteInt32 => "byte_int32",
            ParamType::ByteFloat => "byte_float",
            ParamType::ByteDouble => "byte_double",
        }
    }

    /// Short names accepted in command lists.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ParamType::Bool => &["b"],
            ParamType::Int16 => &["i", "i16", "int"],
            ParamType::Int32 => &["i32"],
            ParamType::Float => &["f"],
            ParamType::Double => &["d"],
            ParamType::Char => &["c"],
            ParamType::String => &["s", "str"],
            ParamType::EscapedString => &["es"],
            ParamType::FloatSci => &["fs", "floatsci"],
            ParamType::DoubleSci => &["ds", "doublesci"],
            ParamType::ByteBool => &["bbool", "bb"],
            ParamType::ByteInt16 => &["bint16", "bi", "bi16"],
            ParamType::ByteInt32 => &["bint32", "bi32"],
            ParamType::ByteFloat => &["bfloat", "bf"],
            ParamType::ByteDouble => &["bdouble", "bd"],
        }
    }

    /// Look a type up by canonical name or alias.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name() == name || ty.aliases().contains(&name))
    }

    /// Whether the type travels as text or as fixed-width bytes.
    pub fn wire_kind(self) -> WireKind {
        match self.width() {
            Some(_) => WireKind::Binary,
            None => WireKind::Text,
        }
    }

    /// Logical (pre-escape) byte width of binary types.
    pub fn width(self) -> Option<usize> {
        match self {
            ParamType::ByteBool => Some(1),
            ParamType::ByteInt16 => Some(2),
            ParamType::ByteInt32 | ParamType::ByteFloat => Some(4),
            ParamType::ByteDouble => Some(8),
            _ => None,
        }
    }

    /// How the tokenizer finds the end of a field of this type.
    pub fn field_width(self) -> FieldWidth {
        match self.width() {
            Some(n) => FieldWidth::Fixed(n),
            None => FieldWidth::Delimited,
        }
    }

    /// True when the encoded form may contain reserved bytes, so escaping is
    /// load-bearing rather than a formality.
    pub fn requires_escape(self) -> bool {
        self.wire_kind() == WireKind::Binary || self == ParamType::EscapedString
    }

    /// Encode a value into its unescaped wire form.
    ///
    /// Numeric values convert to the declared type when the result is
    /// representable: an `Int32` fits an int16 parameter if it is in range,
    /// and a finite `Double` fits a float parameter if it is within `f32`
    /// range.
    pub fn encode(self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let wire = match self {
            ParamType::Bool => {
                if self.bool_arg(value)? {
                    b"1".to_vec()
                } else {
                    b"0".to_vec()
                }
            }
            ParamType::Int16 => self.int16_arg(value)?.to_string().into_bytes(),
            ParamType::Int32 => self.int32_arg(value)?.to_string().into_bytes(),
            ParamType::Float => self.float_arg(value)?.to_string().into_bytes(),
            ParamType::Double => self.double_arg(value)?.to_string().into_bytes(),
            ParamType::FloatSci => format_sci(f64::from(self.float_arg(value)?)).into_bytes(),
            ParamType::DoubleSci => format_sci(self.double_arg(value)?).into_bytes(),
            ParamType::Char => {
                let ch = value.as_char().ok_or_else(|| self.mismatch(value))?;
                ch.to_string().into_bytes()
            }
            ParamType::String | ParamType::EscapedString => value
                .as_str()
                .ok_or_else(|| self.mismatch(value))?
                .as_bytes()
                .to_vec(),
            ParamType::ByteBool => vec![u8::from(self.bool_arg(value)?)],
            ParamType::ByteInt16 => self.int16_arg(value)?.to_le_bytes().to_vec(),
            ParamType::ByteInt32 => self.int32_arg(value)?.to_le_bytes().to_vec(),
            ParamType::ByteFloat => self.float_arg(value)?.to_le_bytes().to_vec(),
            ParamType::ByteDouble => self.double_arg(value)?.to_le_bytes().to_vec(),
        };
        Ok(wire)
    }

    /// Decode an unescaped wire form into a value.
    pub fn decode(self, wire: &[u8]) -> Result<Value, CodecError> {
        let value = match self {
            ParamType::Bool => Value::Bool(parse_text::<i64>(self, wire)? != 0),
            ParamType::Int16 => Value::Int16(parse_text(self, wire)?),
            ParamType::Int32 => Value::Int32(parse_text(self, wire)?),
            ParamType::Float | ParamType::FloatSci => Value::Float(parse_text(self, wire)?),
            ParamType::Double | ParamType::DoubleSci => Value::Double(parse_text(self, wire)?),
            ParamType::Char => {
                let text = utf8(self, wire)?;
                let ch = text.chars().next().ok_or(CodecError::Empty { ty: self })?;
                Value::Char(ch)
            }
            ParamType::String | ParamType::EscapedString => {
                Value::String(utf8(self, wire)?.to_owned())
            }
            ParamType::ByteBool => Value::Bool(fixed::<1>(self, wire)?[0] != 0),
            ParamType::ByteInt16 => Value::Int16(i16::from_le_bytes(fixed(self, wire)?)),
            ParamType::ByteInt32 => Value::Int32(i32::from_le_bytes(fixed(self, wire)?)),
            ParamType::ByteFloat => Value::Float(f32::from_le_bytes(fixed(self, wire)?)),
            ParamType::ByteDouble => Value::Double(f64::from_le_bytes(fixed(self, wire)?)),
        };
        Ok(value)
    }

    fn mismatch(self, value: &Value) -> CodecError {
        CodecError::TypeMismatch {
            expected: self,
            found: value.kind(),
        }
    }

    fn out_of_range(self, value: &Value) -> CodecError {
        CodecError::OutOfRange {
            ty: self,
            value: value.to_string(),
        }
    }

    fn bool_arg(self, value: &Value) -> Result<bool, CodecError> {
        value.as_bool().ok_or_else(|| self.mismatch(value))
    }

    fn int16_arg(self, value: &Value) -> Result<i16, CodecError> {
        match value {
            Value::Int16(v) => Ok(*v),
            Value::Int32(v) => i16::try_from(*v).map_err(|_| self.out_of_range(value)),
            _ => Err(self.mismatch(value)),
        }
    }

    fn int32_arg(self, value: &Value) -> Result<i32, CodecError> {
        value.as_i32().ok_or_else(|| self.mismatch(value))
    }

    fn float_arg(self, value: &Value) -> Result<f32, CodecError> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Double(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
                Err(self.out_of_range(value))
            }
            // Non-finite doubles keep their meaning as f32.
            Value::Double(v) => Ok(*v as f32),
            Value::Int16(v) => Ok(f32::from(*v)),
            Value::Int32(v) => Ok(*v as f32),
            _ => Err(self.mismatch(value)),
        }
    }

    fn double_arg(self, value: &Value) -> Result<f64, CodecError> {
        match value {
            Value::Int16(v) => Ok(f64::from(*v)),
            Value::Int32(v) => Ok(f64::from(*v)),
            _ => value.as_f64().ok_or_else(|| self.mismatch(value)),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown parameter type '{s}'"))
    }
}

/// A value carried by one field of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::String(_) => "string",
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// 16-bit integer view.
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Value::Int16(v) => Some(*v),
            _ => None,
        }
    }

    /// 32-bit integer view; 16-bit integers widen losslessly.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            Value::Int16(v) => Some(i32::from(*v)),
            _ => None,
        }
    }

    /// Single-precision float view.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Double view; single-precision floats widen losslessly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Character view.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(v) => Some(*v),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Exponential notation with two fraction digits and a signed exponent
/// without leading zeros, e.g. `1.23E+3`, `-4.50E-12`.
fn format_sci(v: f64) -> String {
    if v.is_nan() {
        return "NAN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INF" } else { "-INF" }.to_string();
    }

    let formatted = format!("{v:.2E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => match exponent.strip_prefix('-') {
            Some(digits) => format!("{mantissa}E-{digits}"),
            None => format!("{mantissa}E+{exponent}"),
        },
        None => formatted,
    }
}

fn utf8(ty: ParamType, wire: &[u8]) -> Result<&str, CodecError> {
    std::str::from_utf8(wire).map_err(|source| CodecError::InvalidUtf8 { ty, source })
}

fn parse_text<T: FromStr>(ty: ParamType, wire: &[u8]) -> Result<T, CodecError> {
    let text = utf8(ty, wire)?.trim();
    text.parse().map_err(|_| CodecError::Parse {
        ty,
        text: text.to_string(),
    })
}

fn fixed<const N: usize>(ty: ParamType, wire: &[u8]) -> Result<[u8; N], CodecError> {
    <[u8; N]>::try_from(wire).map_err(|_| CodecError::WidthMismatch {
        ty,
        expected: N,
        actual: wire.len(),
    })
}
