//! A concrete implementation of the `dsg::Driver` interface on top of the netCDF C library.
//!
//! Every driver operation is a direct call of the matching `nc_*` function. A nonzero return
//! code becomes a `Status` carrying the same code. libnetcdf is not thread safe, so every call
//! is made while holding a process wide lock.
//!
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::ptr;

use netcdf_sys::{
    nc_close, nc_create, nc_def_compound, nc_def_dim, nc_def_var, nc_def_var_chunking, nc_enddef,
    nc_insert_compound, nc_inq_type, nc_inq_varndims, nc_inq_vartype, nc_put_att,
    nc_put_att_double, nc_put_att_float, nc_put_att_int, nc_put_att_longlong, nc_put_att_schar,
    nc_put_att_short, nc_put_att_text, nc_put_var1_double, nc_put_var1_float, nc_put_var1_int,
    nc_put_var1_longlong, nc_put_var1_schar, nc_put_var1_short, nc_put_vara, nc_put_vara_text,
    nc_sync, nc_type, NC_CHUNKED, NC_CONTIGUOUS, NC_NOERR,
};
use parking_lot::{const_mutex, Mutex};
use paste::paste;
use tracing::{debug, trace};

use dsg::driver::{NC_BYTE, NC_DOUBLE, NC_FLOAT, NC_INT, NC_INT64, NC_SHORT, NC_STRING};
use dsg::{DimId, Driver, DriverResult, NcId, Status, Storage, Value, VarId, XType};

static LIBNETCDF: Mutex<()> = const_mutex(());

/// Run one library call under the global lock and convert its return code.
fn checked<F>(call: F) -> DriverResult<()>
where
    F: FnOnce() -> c_int,
{
    let code = {
        let _guard = LIBNETCDF.lock();
        call()
    };

    if code == NC_NOERR {
        Ok(())
    } else {
        Err(Status(code))
    }
}

fn c_name(name: &str) -> DriverResult<CString> {
    CString::new(name).map_err(|_| Status::EBADNAME)
}

/// Layout of a compound type, recorded as it is defined.
#[derive(Debug, Default)]
struct Compound {
    size: usize,
    members: Vec<(usize, XType)>,
}

#[derive(Debug, Default)]
pub struct NetcdfDriver {
    compounds: HashMap<(NcId, XType), Compound>,
}

impl NetcdfDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `EINVAL` unless `varid` has exactly `len` dimensions.
    fn check_rank(&self, ncid: NcId, varid: VarId, len: usize) -> DriverResult<()> {
        let mut ndims: c_int = 0;
        checked(|| unsafe { nc_inq_varndims(ncid.0, varid.0, &mut ndims) })?;
        if usize::try_from(ndims).ok() != Some(len) {
            return Err(Status::EINVAL);
        }

        Ok(())
    }

    /// Width in bytes of one element of `varid`.
    fn element_size(&self, ncid: NcId, varid: VarId) -> DriverResult<usize> {
        let mut xtype: nc_type = 0;
        checked(|| unsafe { nc_inq_vartype(ncid.0, varid.0, &mut xtype) })?;

        let mut size: usize = 0;
        checked(|| unsafe { nc_inq_type(ncid.0, xtype, ptr::null_mut(), &mut size) })?;

        Ok(size)
    }

    /// Pack one instance of a compound type. String members are written as pointers into
    /// `strings`, which must outlive every use of the returned buffer.
    fn pack_compound(
        &self,
        ncid: NcId,
        xtype: XType,
        fields: &[Value],
        strings: &mut Vec<CString>,
    ) -> DriverResult<Vec<u8>> {
        let compound = self.compounds.get(&(ncid, xtype)).ok_or(Status::EBADTYPE)?;
        if fields.len() != compound.members.len() {
            return Err(Status::EINVAL);
        }

        let mut buffer = vec![0_u8; compound.size];
        for (value, &(offset, field_type)) in fields.iter().zip(&compound.members) {
            let bytes = match value {
                Value::Text(text) => {
                    if field_type != NC_STRING {
                        return Err(Status::ECHAR);
                    }
                    let text = c_name(text)?;
                    let bytes = (text.as_ptr() as usize).to_ne_bytes().to_vec();
                    strings.push(text);
                    bytes
                }
                value => {
                    if value.kind().xtype() != field_type {
                        return Err(Status::EBADTYPE);
                    }
                    let mut bytes = Vec::with_capacity(value.kind().size());
                    value.write_ne(&mut bytes).map_err(|_| Status::EBADTYPE)?;
                    bytes
                }
            };

            buffer
                .get_mut(offset..offset + bytes.len())
                .ok_or(Status::EINVAL)?
                .copy_from_slice(&bytes);
        }

        Ok(buffer)
    }
}

macro_rules! PutScalar {
    ($($suffix:ident: $type:ty => $c_suffix:ident, $xtype:ident),*) => {
        paste! {
            $(
                fn [<put_att_ $suffix>](
                    &mut self,
                    ncid: NcId,
                    varid: VarId,
                    name: &str,
                    value: $type,
                ) -> DriverResult<()> {
                    let name = c_name(name)?;
                    checked(|| unsafe {
                        [<nc_put_att_ $c_suffix>](ncid.0, varid.0, name.as_ptr(), $xtype.0, 1, &value)
                    })
                }

                fn [<put_var1_ $suffix>](
                    &mut self,
                    ncid: NcId,
                    varid: VarId,
                    index: &[usize],
                    value: $type,
                ) -> DriverResult<()> {
                    self.check_rank(ncid, varid, index.len())?;
                    checked(|| unsafe {
                        [<nc_put_var1_ $c_suffix>](ncid.0, varid.0, index.as_ptr(), &value)
                    })
                }
            )*
        }
    };
}

impl Driver for NetcdfDriver {
    fn create(&mut self, path: &Path, flags: i32) -> DriverResult<NcId> {
        let c_path = path.to_str().ok_or(Status::EINVAL).and_then(c_name)?;
        let mut ncid: c_int = 0;
        checked(|| unsafe { nc_create(c_path.as_ptr(), flags, &mut ncid) })?;
        debug!("created {} as ncid {}", path.display(), ncid);

        Ok(NcId(ncid))
    }

    fn def_dim(&mut self, ncid: NcId, name: &str, len: usize) -> DriverResult<DimId> {
        let name = c_name(name)?;
        let mut dimid: c_int = 0;
        checked(|| unsafe { nc_def_dim(ncid.0, name.as_ptr(), len, &mut dimid) })?;

        Ok(DimId(dimid))
    }

    fn def_var(
        &mut self,
        ncid: NcId,
        name: &str,
        xtype: XType,
        dims: &[DimId],
    ) -> DriverResult<VarId> {
        let name = c_name(name)?;
        let dimids: Vec<c_int> = dims.iter().map(|dim| dim.0).collect();
        let ndims = c_int::try_from(dimids.len()).map_err(|_| Status::EINVAL)?;
        let mut varid: c_int = 0;
        checked(|| unsafe {
            nc_def_var(
                ncid.0,
                name.as_ptr(),
                xtype.0,
                ndims,
                dimids.as_ptr(),
                &mut varid,
            )
        })?;

        Ok(VarId(varid))
    }

    fn def_compound(&mut self, ncid: NcId, size: usize, name: &str) -> DriverResult<XType> {
        let compound_name = c_name(name)?;
        let mut xtype: nc_type = 0;
        checked(|| unsafe {
            nc_def_compound(ncid.0, size, compound_name.as_ptr(), &mut xtype)
        })?;
        trace!("defined compound {} as type {}", name, xtype);

        let xtype = XType(xtype);
        self.compounds.insert(
            (ncid, xtype),
            Compound {
                size,
                members: Vec::new(),
            },
        );

        Ok(xtype)
    }

    fn insert_compound(
        &mut self,
        ncid: NcId,
        xtype: XType,
        name: &str,
        offset: usize,
        field_type: XType,
    ) -> DriverResult<()> {
        let name = c_name(name)?;
        checked(|| unsafe {
            nc_insert_compound(ncid.0, xtype.0, name.as_ptr(), offset, field_type.0)
        })?;

        if let Some(compound) = self.compounds.get_mut(&(ncid, xtype)) {
            compound.members.push((offset, field_type));
        }

        Ok(())
    }

    fn def_var_chunking(
        &mut self,
        ncid: NcId,
        varid: VarId,
        storage: Storage,
        chunk_sizes: &[usize],
    ) -> DriverResult<()> {
        match storage {
            Storage::Contiguous => checked(|| unsafe {
                nc_def_var_chunking(ncid.0, varid.0, NC_CONTIGUOUS, ptr::null())
            }),
            Storage::Chunked => {
                self.check_rank(ncid, varid, chunk_sizes.len())?;
                checked(|| unsafe {
                    nc_def_var_chunking(ncid.0, varid.0, NC_CHUNKED, chunk_sizes.as_ptr())
                })
            }
        }
    }

    fn put_att_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        name: &str,
        value: &str,
    ) -> DriverResult<()> {
        let name = c_name(name)?;
        checked(|| unsafe {
            nc_put_att_text(
                ncid.0,
                varid.0,
                name.as_ptr(),
                value.len(),
                value.as_ptr().cast::<c_char>(),
            )
        })
    }

    PutScalar!(
        byte: i8 => schar, NC_BYTE,
        short: i16 => short, NC_SHORT,
        int: i32 => int, NC_INT,
        longlong: i64 => longlong, NC_INT64,
        float: f32 => float, NC_FLOAT,
        double: f64 => double, NC_DOUBLE
    );

    fn put_att_compound(
        &mut self,
        ncid: NcId,
        varid: VarId,
        name: &str,
        xtype: XType,
        fields: &[Value],
    ) -> DriverResult<()> {
        let name = c_name(name)?;
        let mut strings = Vec::new();
        let buffer = self.pack_compound(ncid, xtype, fields, &mut strings)?;

        checked(|| unsafe {
            nc_put_att(
                ncid.0,
                varid.0,
                name.as_ptr(),
                xtype.0,
                1,
                buffer.as_ptr().cast::<c_void>(),
            )
        })
    }

    fn put_vara_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        text: &[u8],
    ) -> DriverResult<()> {
        if start.len() != count.len() || text.len() != count.iter().product::<usize>() {
            return Err(Status::EINVAL);
        }
        self.check_rank(ncid, varid, start.len())?;

        checked(|| unsafe {
            nc_put_vara_text(
                ncid.0,
                varid.0,
                start.as_ptr(),
                count.as_ptr(),
                text.as_ptr().cast::<c_char>(),
            )
        })
    }

    fn put_vara(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        buffer: &[u8],
    ) -> DriverResult<()> {
        if start.len() != count.len() {
            return Err(Status::EINVAL);
        }
        self.check_rank(ncid, varid, start.len())?;
        let size = self.element_size(ncid, varid)?;
        if buffer.len() != size * count.iter().product::<usize>() {
            return Err(Status::EINVAL);
        }

        checked(|| unsafe {
            nc_put_vara(
                ncid.0,
                varid.0,
                start.as_ptr(),
                count.as_ptr(),
                buffer.as_ptr().cast::<c_void>(),
            )
        })
    }

    fn enddef(&mut self, ncid: NcId) -> DriverResult<()> {
        checked(|| unsafe { nc_enddef(ncid.0) })
    }

    fn sync(&mut self, ncid: NcId) -> DriverResult<()> {
        checked(|| unsafe { nc_sync(ncid.0) })
    }

    fn close(&mut self, ncid: NcId) -> DriverResult<()> {
        self.compounds.retain(|(id, _), _| *id != ncid);
        checked(|| unsafe { nc_close(ncid.0) })?;
        debug!("closed ncid {}", ncid.0);

        Ok(())
    }
}
