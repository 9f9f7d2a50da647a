//! A concrete implementation of the `dsg::Driver` interface that writes CDL text.
//!
//! The file is built up in memory and rendered to its target path, in the notation printed by
//! `ncdump`, every time it is synced or closed. `ncgen` turns the result into a binary file.
//!
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use paste::paste;
use tracing::{debug, error};

use dsg::{
    DimId, Driver, DriverResult, MemoryDriver, MemoryStore, NcId, Status, Storage, Value, VarId,
    XType,
};

mod cdl;

pub use cdl::render;

#[derive(Debug)]
pub struct CdlDriver {
    inner: MemoryDriver,
    store: MemoryStore,
    paths: HashMap<NcId, PathBuf>,
}

impl CdlDriver {
    pub fn new() -> Self {
        let inner = MemoryDriver::new();
        let store = inner.store();

        Self {
            inner,
            store,
            paths: HashMap::new(),
        }
    }

    /// Render the last committed state of `ncid` to its path.
    fn flush(&self, ncid: NcId) -> DriverResult<()> {
        let path = self.paths.get(&ncid).ok_or(Status::EBADID)?;
        let dataset = self.store.get(path).ok_or(Status::EIO)?;
        let text = render(&dataset).map_err(|_| {
            error!("unable to render {}", path.display());
            Status::EIO
        })?;

        fs::write(path, text).map_err(|err| {
            error!("unable to write {}: {}", path.display(), err);
            Status::EIO
        })?;

        debug!("rendered {}", path.display());

        Ok(())
    }
}

impl Default for CdlDriver {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! PutScalar {
    ($($suffix:ident: $type:ty),*) => {
        paste! {
            $(
                fn [<put_att_ $suffix>](
                    &mut self,
                    ncid: NcId,
                    varid: VarId,
                    name: &str,
                    value: $type,
                ) -> DriverResult<()> {
                    self.inner.[<put_att_ $suffix>](ncid, varid, name, value)
                }

                fn [<put_var1_ $suffix>](
                    &mut self,
                    ncid: NcId,
                    varid: VarId,
                    index: &[usize],
                    value: $type,
                ) -> DriverResult<()> {
                    self.inner.[<put_var1_ $suffix>](ncid, varid, index, value)
                }
            )*
        }
    };
}

impl Driver for CdlDriver {
    fn create(&mut self, path: &Path, flags: i32) -> DriverResult<NcId> {
        let ncid = self.inner.create(path, flags)?;
        self.paths.insert(ncid, path.to_path_buf());

        Ok(ncid)
    }

    fn def_dim(&mut self, ncid: NcId, name: &str, len: usize) -> DriverResult<DimId> {
        self.inner.def_dim(ncid, name, len)
    }

    fn def_var(
        &mut self,
        ncid: NcId,
        name: &str,
        xtype: XType,
        dims: &[DimId],
    ) -> DriverResult<VarId> {
        self.inner.def_var(ncid, name, xtype, dims)
    }

    fn def_compound(&mut self, ncid: NcId, size: usize, name: &str) -> DriverResult<XType> {
        self.inner.def_compound(ncid, size, name)
    }

    fn insert_compound(
        &mut self,
        ncid: NcId,
        xtype: XType,
        name: &str,
        offset: usize,
        field_type: XType,
    ) -> DriverResult<()> {
        self.inner
            .insert_compound(ncid, xtype, name, offset, field_type)
    }

    fn def_var_chunking(
        &mut self,
        ncid: NcId,
        varid: VarId,
        storage: Storage,
        chunk_sizes: &[usize],
    ) -> DriverResult<()> {
        self.inner
            .def_var_chunking(ncid, varid, storage, chunk_sizes)
    }

    fn put_att_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        name: &str,
        value: &str,
    ) -> DriverResult<()> {
        self.inner.put_att_text(ncid, varid, name, value)
    }

    PutScalar!(byte: i8, short: i16, int: i32, longlong: i64, float: f32, double: f64);

    fn put_att_compound(
        &mut self,
        ncid: NcId,
        varid: VarId,
        name: &str,
        xtype: XType,
        fields: &[Value],
    ) -> DriverResult<()> {
        self.inner.put_att_compound(ncid, varid, name, xtype, fields)
    }

    fn put_vara_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        text: &[u8],
    ) -> DriverResult<()> {
        self.inner.put_vara_text(ncid, varid, start, count, text)
    }

    fn put_vara(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        buffer: &[u8],
    ) -> DriverResult<()> {
        self.inner.put_vara(ncid, varid, start, count, buffer)
    }

    fn enddef(&mut self, ncid: NcId) -> DriverResult<()> {
        self.inner.enddef(ncid)
    }

    fn sync(&mut self, ncid: NcId) -> DriverResult<()> {
        self.inner.sync(ncid)?;
        self.flush(ncid)
    }

    fn close(&mut self, ncid: NcId) -> DriverResult<()> {
        self.inner.close(ncid)?;
        let result = self.flush(ncid);
        self.paths.remove(&ncid);

        result
    }
}
