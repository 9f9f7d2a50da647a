//! The closed set of scalar kinds a station time series can carry, with their on-disk type codes
//! and byte widths.
//!
use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::driver::{
    XType, NC_BYTE, NC_CHAR, NC_DOUBLE, NC_FLOAT, NC_INT, NC_INT64, NC_SHORT, NC_STRING,
};
use crate::errors::{Error, Result};
use crate::value::Value;

pub const NC_FILL_BYTE: i8 = -127;
pub const NC_FILL_CHAR: u8 = 0;
pub const NC_FILL_SHORT: i16 = -32767;
pub const NC_FILL_INT: i32 = -2147483647;
pub const NC_FILL_INT64: i64 = -9223372036854775806;
pub const NC_FILL_FLOAT: f32 = 9.969_21e36;
pub const NC_FILL_DOUBLE: f64 = 9.969_209_968_386_869e36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    String,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 8] = [
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Char,
        ScalarKind::String,
    ];

    /// The on-disk type code for this kind
    pub const fn xtype(self) -> XType {
        match self {
            Self::I8 => NC_BYTE,
            Self::I16 => NC_SHORT,
            Self::I32 => NC_INT,
            Self::I64 => NC_INT64,
            Self::F32 => NC_FLOAT,
            Self::F64 => NC_DOUBLE,
            Self::Char => NC_CHAR,
            Self::String => NC_STRING,
        }
    }

    /// Width in bytes of one value of this kind inside a record.
    ///
    /// Strings are stored out of line, so a record only holds a pointer to them.
    ///
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::Char => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::String => size_of::<*const u8>(),
        }
    }

    /// Look up the kind for an atomic on-disk type code.
    pub fn from_xtype(xtype: XType) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.xtype() == xtype)
            .ok_or_else(|| Error::UnsupportedType(format!("type code {}", xtype.0)))
    }

    /// Name of the type as written in CDL
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "byte",
            Self::I16 => "short",
            Self::I32 => "int",
            Self::I64 => "int64",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Char => "char",
            Self::String => "string",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Char | Self::String)
    }

    /// The value the container format reads back for a cell that was never written.
    pub fn fill_value(self) -> Value {
        match self {
            Self::I8 => Value::I8(NC_FILL_BYTE),
            Self::I16 => Value::I16(NC_FILL_SHORT),
            Self::I32 => Value::I32(NC_FILL_INT),
            Self::I64 => Value::I64(NC_FILL_INT64),
            Self::F32 => Value::F32(NC_FILL_FLOAT),
            Self::F64 => Value::F64(NC_FILL_DOUBLE),
            Self::Char => Value::Char(NC_FILL_CHAR),
            Self::String => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = Error;

    /// Accepts both the CDL type names and the Rust primitive names.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "byte" | "i8" => Ok(Self::I8),
            "short" | "i16" => Ok(Self::I16),
            "int" | "i32" => Ok(Self::I32),
            "int64" | "i64" => Ok(Self::I64),
            "float" | "f32" => Ok(Self::F32),
            "double" | "f64" => Ok(Self::F64),
            "char" => Ok(Self::Char),
            "string" => Ok(Self::String),
            _ => Err(Error::UnsupportedType(s.to_string())),
        }
    }
}
