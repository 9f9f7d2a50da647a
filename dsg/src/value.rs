use num_traits::NumCast;
use paste::paste;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::kind::ScalarKind;

/// A single scalar tagged with its kind.
///
/// Used both for attribute values and for observation values.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(u8),
    Text(String),
}

macro_rules! Scalar {
    ($type:ty, $variant:ident) => {
        paste! {
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Value::$variant(value)
                }
            }

            impl Value {
                pub fn [<as_ $variant:lower>](&self) -> Option<$type> {
                    match self {
                        Value::$variant(value) => Some(*value),
                        _ => None,
                    }
                }
            }
        }
    };
}

Scalar!(i8, I8);
Scalar!(i16, I16);
Scalar!(i32, I32);
Scalar!(i64, I64);
Scalar!(f32, F32);
Scalar!(f64, F64);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl Value {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::I8(_) => ScalarKind::I8,
            Value::I16(_) => ScalarKind::I16,
            Value::I32(_) => ScalarKind::I32,
            Value::I64(_) => ScalarKind::I64,
            Value::F32(_) => ScalarKind::F32,
            Value::F64(_) => ScalarKind::F64,
            Value::Char(_) => ScalarKind::Char,
            Value::Text(_) => ScalarKind::String,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Append the native byte order representation of this value to `buffer`.
    ///
    /// Strings are stored out of line by the container format and cannot be packed.
    ///
    pub fn write_ne(&self, buffer: &mut Vec<u8>) -> Result<()> {
        match self {
            Value::I8(v) => buffer.extend_from_slice(&v.to_ne_bytes()),
            Value::I16(v) => buffer.extend_from_slice(&v.to_ne_bytes()),
            Value::I32(v) => buffer.extend_from_slice(&v.to_ne_bytes()),
            Value::I64(v) => buffer.extend_from_slice(&v.to_ne_bytes()),
            Value::F32(v) => buffer.extend_from_slice(&v.to_ne_bytes()),
            Value::F64(v) => buffer.extend_from_slice(&v.to_ne_bytes()),
            Value::Char(c) => buffer.push(*c),
            Value::Text(_) => {
                return Err(Error::UnsupportedType(String::from(
                    "string values cannot be packed into a record",
                )));
            }
        }

        Ok(())
    }

    /// Decode a value of `kind` from the start of a native byte order buffer.
    ///
    /// Returns `None` if the buffer is too short or `kind` is stored out of line.
    ///
    pub fn read_ne(kind: ScalarKind, buffer: &[u8]) -> Option<Value> {
        let bytes = buffer.get(..kind.size())?;
        let value = match kind {
            ScalarKind::I8 => Value::I8(i8::from_ne_bytes(bytes.try_into().ok()?)),
            ScalarKind::I16 => Value::I16(i16::from_ne_bytes(bytes.try_into().ok()?)),
            ScalarKind::I32 => Value::I32(i32::from_ne_bytes(bytes.try_into().ok()?)),
            ScalarKind::I64 => Value::I64(i64::from_ne_bytes(bytes.try_into().ok()?)),
            ScalarKind::F32 => Value::F32(f32::from_ne_bytes(bytes.try_into().ok()?)),
            ScalarKind::F64 => Value::F64(f64::from_ne_bytes(bytes.try_into().ok()?)),
            ScalarKind::Char => Value::Char(bytes[0]),
            ScalarKind::String => return None,
        };

        Some(value)
    }

    /// Convert to another kind the way the container format converts on write.
    ///
    /// Numeric kinds convert among themselves and fail when the value is out of range for the
    /// target kind. Text never converts to or from numbers.
    ///
    pub fn cast(&self, kind: ScalarKind) -> Option<Value> {
        match (self, kind) {
            (Value::Char(c), ScalarKind::Char) => Some(Value::Char(*c)),
            (Value::Text(text), ScalarKind::String) => Some(Value::Text(text.clone())),
            (_, ScalarKind::I8) => self.convert().map(Value::I8),
            (_, ScalarKind::I16) => self.convert().map(Value::I16),
            (_, ScalarKind::I32) => self.convert().map(Value::I32),
            (_, ScalarKind::I64) => self.convert().map(Value::I64),
            (_, ScalarKind::F32) => self.convert().map(Value::F32),
            (_, ScalarKind::F64) => self.convert().map(Value::F64),
            _ => None,
        }
    }

    /// This value as a double, if it is numeric
    pub fn to_f64(&self) -> Option<f64> {
        self.convert()
    }

    fn convert<T: NumCast>(&self) -> Option<T> {
        match self {
            Value::I8(v) => T::from(*v),
            Value::I16(v) => T::from(*v),
            Value::I32(v) => T::from(*v),
            Value::I64(v) => T::from(*v),
            Value::F32(v) => T::from(*v),
            Value::F64(v) => T::from(*v),
            Value::Char(_) | Value::Text(_) => None,
        }
    }
}
