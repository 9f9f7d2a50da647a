//! The writer driver: the narrow interface through which every header entry and every data
//! value reaches a container file.
//!
//! The operations follow the C API of the container format library one to one, so that a
//! concrete backend is a thin shim. Every operation reports failure with a `Status` carrying the
//! library's numeric error code; callers convert it to an `Error` with `StatusExt::status`.
//!
use std::fmt;
use std::path::Path;

use crate::errors::{Error, Result, StatusExt};
use crate::value::Value;
use crate::variable::Attributes;

/// Creation flag selecting the enhanced (HDF5 based) file format.
pub const NC_NETCDF4: i32 = 0x1000;

/// Overwrite an existing file at the target path.
pub const NC_CLOBBER: i32 = 0x0000;

/// Dimension length requesting an unlimited dimension.
pub const NC_UNLIMITED: usize = 0;

/// Attribute scope for attributes attached to the file rather than to a variable.
pub const NC_GLOBAL: VarId = VarId(-1);

pub const NC_BYTE: XType = XType(1);
pub const NC_CHAR: XType = XType(2);
pub const NC_SHORT: XType = XType(3);
pub const NC_INT: XType = XType(4);
pub const NC_FLOAT: XType = XType(5);
pub const NC_DOUBLE: XType = XType(6);
pub const NC_INT64: XType = XType(10);
pub const NC_STRING: XType = XType(12);

/// Type ids handed out by `def_compound` start here.
pub const NC_FIRSTUSERTYPEID: XType = XType(32);

/// Handle of an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NcId(pub i32);

/// Id of a dimension within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimId(pub i32);

/// Id of a variable within a file, or `NC_GLOBAL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub i32);

/// On-disk type code. Atomic types use the fixed codes above, compound types get an id from
/// `def_compound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XType(pub i32);

impl XType {
    pub fn is_user_defined(&self) -> bool {
        self.0 >= NC_FIRSTUSERTYPEID.0
    }
}

/// Physical storage layout of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Chunked,
    Contiguous,
}

/// Status code returned by a failed driver operation.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const NOERR: Status = Status(0);
    pub const EBADID: Status = Status(-33);
    pub const EEXIST: Status = Status(-35);
    pub const EINVAL: Status = Status(-36);
    pub const EPERM: Status = Status(-37);
    pub const ENOTINDEFINE: Status = Status(-38);
    pub const EINDEFINE: Status = Status(-39);
    pub const EINVALCOORDS: Status = Status(-40);
    pub const ENAMEINUSE: Status = Status(-42);
    pub const ENOTATT: Status = Status(-43);
    pub const EBADTYPE: Status = Status(-45);
    pub const EBADDIM: Status = Status(-46);
    pub const ENOTVAR: Status = Status(-49);
    pub const ECHAR: Status = Status(-56);
    pub const EEDGE: Status = Status(-57);
    pub const EBADNAME: Status = Status(-59);
    pub const ERANGE: Status = Status(-60);
    pub const EIO: Status = Status(-68);
    pub const ENOTNC4: Status = Status(-111);

    /// The library's description of this status
    pub fn message(&self) -> &'static str {
        match *self {
            Self::NOERR => "No error",
            Self::EBADID => "Not a valid ID",
            Self::EEXIST => "File exists && NC_NOCLOBBER",
            Self::EINVAL => "Invalid argument",
            Self::EPERM => "Write to read only",
            Self::ENOTINDEFINE => "Operation not allowed in data mode",
            Self::EINDEFINE => "Operation not allowed in define mode",
            Self::EINVALCOORDS => "Index exceeds dimension bound",
            Self::ENAMEINUSE => "String match to name in use",
            Self::ENOTATT => "Attribute not found",
            Self::EBADTYPE => "Not a valid data type or _FillValue type mismatch",
            Self::EBADDIM => "Invalid dimension ID or name",
            Self::ENOTVAR => "Variable not found",
            Self::ECHAR => "Attempt to convert between text & numbers",
            Self::EEDGE => "Start+count exceeds dimension bound",
            Self::EBADNAME => "Name contains illegal characters",
            Self::ERANGE => "Numeric conversion not representable",
            Self::EIO => "I/O failure",
            Self::ENOTNC4 => "Attempting netcdf-4 operation on netcdf-3 file",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message(), self.0)
    }
}

pub type DriverResult<T> = std::result::Result<T, Status>;

/// A backend capable of producing a container file.
///
/// A driver is driven by exactly one writer at a time and is never shared between threads.
///
pub trait Driver {
    /// Create a new file at `path` and return its handle. The file starts in define mode.
    fn create(&mut self, path: &Path, flags: i32) -> DriverResult<NcId>;

    /// Define a dimension. A `len` of `NC_UNLIMITED` defines an unlimited dimension.
    fn def_dim(&mut self, ncid: NcId, name: &str, len: usize) -> DriverResult<DimId>;

    /// Define a variable of type `xtype` over `dims`, outermost dimension first.
    fn def_var(&mut self, ncid: NcId, name: &str, xtype: XType, dims: &[DimId])
        -> DriverResult<VarId>;

    /// Define an empty compound type `size` bytes wide.
    fn def_compound(&mut self, ncid: NcId, size: usize, name: &str) -> DriverResult<XType>;

    /// Add a member to a compound type defined with `def_compound`.
    fn insert_compound(
        &mut self,
        ncid: NcId,
        xtype: XType,
        name: &str,
        offset: usize,
        field_type: XType,
    ) -> DriverResult<()>;

    /// Set the storage layout of a variable.
    fn def_var_chunking(
        &mut self,
        ncid: NcId,
        varid: VarId,
        storage: Storage,
        chunk_sizes: &[usize],
    ) -> DriverResult<()>;

    fn put_att_text(&mut self, ncid: NcId, varid: VarId, name: &str, value: &str)
        -> DriverResult<()>;

    fn put_att_byte(&mut self, ncid: NcId, varid: VarId, name: &str, value: i8)
        -> DriverResult<()>;

    fn put_att_short(&mut self, ncid: NcId, varid: VarId, name: &str, value: i16)
        -> DriverResult<()>;

    fn put_att_int(&mut self, ncid: NcId, varid: VarId, name: &str, value: i32)
        -> DriverResult<()>;

    fn put_att_longlong(&mut self, ncid: NcId, varid: VarId, name: &str, value: i64)
        -> DriverResult<()>;

    fn put_att_float(&mut self, ncid: NcId, varid: VarId, name: &str, value: f32)
        -> DriverResult<()>;

    fn put_att_double(&mut self, ncid: NcId, varid: VarId, name: &str, value: f64)
        -> DriverResult<()>;

    /// Write a single compound valued attribute. `fields` holds one value per member of `xtype`,
    /// in member order.
    fn put_att_compound(
        &mut self,
        ncid: NcId,
        varid: VarId,
        name: &str,
        xtype: XType,
        fields: &[Value],
    ) -> DriverResult<()>;

    fn put_var1_byte(&mut self, ncid: NcId, varid: VarId, index: &[usize], value: i8)
        -> DriverResult<()>;

    fn put_var1_short(&mut self, ncid: NcId, varid: VarId, index: &[usize], value: i16)
        -> DriverResult<()>;

    fn put_var1_int(&mut self, ncid: NcId, varid: VarId, index: &[usize], value: i32)
        -> DriverResult<()>;

    fn put_var1_longlong(&mut self, ncid: NcId, varid: VarId, index: &[usize], value: i64)
        -> DriverResult<()>;

    fn put_var1_float(&mut self, ncid: NcId, varid: VarId, index: &[usize], value: f32)
        -> DriverResult<()>;

    fn put_var1_double(&mut self, ncid: NcId, varid: VarId, index: &[usize], value: f64)
        -> DriverResult<()>;

    /// Write a run of characters into a `char` variable.
    fn put_vara_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        text: &[u8],
    ) -> DriverResult<()>;

    /// Write a raw, native byte order buffer. Used for compound records.
    fn put_vara(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        buffer: &[u8],
    ) -> DriverResult<()>;

    /// Leave define mode.
    fn enddef(&mut self, ncid: NcId) -> DriverResult<()>;

    /// Flush pending state without releasing the handle.
    fn sync(&mut self, ncid: NcId) -> DriverResult<()>;

    /// Flush and release the handle.
    fn close(&mut self, ncid: NcId) -> DriverResult<()>;
}

/// Attach an attribute, choosing the emission primitive from the value's kind.
///
pub(crate) fn put_att_value<D>(
    driver: &mut D,
    ncid: NcId,
    varid: VarId,
    name: &str,
    value: &Value,
) -> Result<()>
where
    D: Driver + ?Sized,
{
    let result = match value {
        Value::I8(v) => driver.put_att_byte(ncid, varid, name, *v),
        Value::I16(v) => driver.put_att_short(ncid, varid, name, *v),
        Value::I32(v) => driver.put_att_int(ncid, varid, name, *v),
        Value::I64(v) => driver.put_att_longlong(ncid, varid, name, *v),
        Value::F32(v) => driver.put_att_float(ncid, varid, name, *v),
        Value::F64(v) => driver.put_att_double(ncid, varid, name, *v),
        Value::Char(c) => driver.put_att_text(ncid, varid, name, &char::from(*c).to_string()),
        Value::Text(text) => driver.put_att_text(ncid, varid, name, text),
    };

    result.status("nc_put_att")
}

/// Attach every attribute in `attributes`, in declaration order.
///
pub(crate) fn put_attributes<D>(
    driver: &mut D,
    ncid: NcId,
    varid: VarId,
    attributes: &Attributes,
) -> Result<()>
where
    D: Driver + ?Sized,
{
    for (name, value) in attributes {
        put_att_value(driver, ncid, varid, name, value)?;
    }

    Ok(())
}

/// Write one scalar at `index`, choosing the emission primitive from the value's kind.
///
/// String values have no single cell representation and fail with `UnsupportedType`.
///
pub(crate) fn put_var1_value<D>(
    driver: &mut D,
    ncid: NcId,
    varid: VarId,
    index: &[usize],
    value: &Value,
) -> Result<()>
where
    D: Driver + ?Sized,
{
    let result = match value {
        Value::I8(v) => driver.put_var1_byte(ncid, varid, index, *v),
        Value::I16(v) => driver.put_var1_short(ncid, varid, index, *v),
        Value::I32(v) => driver.put_var1_int(ncid, varid, index, *v),
        Value::I64(v) => driver.put_var1_longlong(ncid, varid, index, *v),
        Value::F32(v) => driver.put_var1_float(ncid, varid, index, *v),
        Value::F64(v) => driver.put_var1_double(ncid, varid, index, *v),
        Value::Char(c) => {
            let count = vec![1; index.len()];
            driver.put_vara_text(ncid, varid, index, &count, &[*c])
        }
        Value::Text(_) => {
            return Err(Error::UnsupportedType(String::from(
                "string observation values cannot be written",
            )))
        }
    };

    result.status("nc_put_var1")
}
