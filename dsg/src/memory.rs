//! A writer driver that keeps files in RAM.
//!
//! `MemoryDriver` models the define/data discipline and the checks of the container format
//! library closely enough that a writer which works against it will work against the real thing:
//! names are unique per namespace, header changes are only allowed in define mode, data writes only
//! in data mode, fixed dimensions are bounds checked, unlimited dimensions grow, and numeric values
//! are converted to the variable's type with range checking.
//!
//! Every `sync` and `close` commits a snapshot of the file to a `MemoryStore`, which outlives the
//! driver and can be cloned and inspected while a writer still owns the driver.
//!
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{ArrayD, Dimension as _, IxDyn};
use parking_lot::Mutex;
use paste::paste;
use tracing::debug;

use crate::driver::{
    DimId, Driver, DriverResult, NcId, Status, Storage, VarId, XType, NC_FIRSTUSERTYPEID,
    NC_GLOBAL, NC_NETCDF4, NC_UNLIMITED,
};
use crate::kind::ScalarKind;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,

    /// Current length. For an unlimited dimension, the highest index written plus one.
    pub len: usize,
    pub unlimited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub offset: usize,
    pub kind: ScalarKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundType {
    pub name: String,
    pub size: usize,
    pub members: Vec<Member>,
}

impl CompoundType {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Decode one native byte order record. String members are stored out of line and read back
    /// as their fill value.
    fn decode(&self, record: &[u8]) -> DriverResult<Vec<Value>> {
        self.members
            .iter()
            .map(|member| match member.kind {
                ScalarKind::String => Ok(ScalarKind::String.fill_value()),
                kind => record
                    .get(member.offset..)
                    .and_then(|bytes| Value::read_ne(kind, bytes))
                    .ok_or(Status::EINVAL),
            })
            .collect()
    }
}

/// A resolved type code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeRef<'a> {
    Atomic(ScalarKind),
    Compound(&'a CompoundType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Scalar(Value),

    /// One value of a compound type, one field per member
    Compound { xtype: XType, fields: Vec<Value> },
}

impl Attribute {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attribute::Scalar(value) => Some(value),
            Attribute::Compound { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_text)
    }

    pub fn fields(&self) -> Option<&[Value]> {
        match self {
            Attribute::Scalar(_) => None,
            Attribute::Compound { fields, .. } => Some(fields),
        }
    }
}

/// A written element of a variable
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Scalar(Value),
    Record(Vec<Value>),
}

impl Cell {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Cell::Scalar(value) => Some(value),
            Cell::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&[Value]> {
        match self {
            Cell::Scalar(_) => None,
            Cell::Record(fields) => Some(fields),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredVariable {
    name: String,
    xtype: XType,
    dims: Vec<DimId>,
    attributes: Vec<(String, Attribute)>,
    storage: Storage,
    chunk_sizes: Vec<usize>,
    cells: BTreeMap<Vec<usize>, Cell>,
}

impl StoredVariable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn xtype(&self) -> XType {
        self.xtype
    }

    pub fn dims(&self) -> &[DimId] {
        &self.dims
    }

    pub fn attributes(&self) -> &[(String, Attribute)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find(&self.attributes, name)
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn chunk_sizes(&self) -> &[usize] {
        &self.chunk_sizes
    }

    pub fn cell(&self, index: &[usize]) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Number of cells that have been written at least once
    pub fn cells_written(&self) -> usize {
        self.cells.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Define,
    Data,
}

/// The complete contents of one file.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    path: PathBuf,
    flags: i32,
    phase: Phase,
    dimensions: Vec<Dimension>,
    types: Vec<CompoundType>,
    variables: Vec<StoredVariable>,
    global_attributes: Vec<(String, Attribute)>,
}

fn find<'a>(attributes: &'a [(String, Attribute)], name: &str) -> Option<&'a Attribute> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, attribute)| attribute)
}

fn check_name(name: &str) -> DriverResult<()> {
    let first = name.chars().next().ok_or(Status::EBADNAME)?;
    if !(first.is_alphanumeric() || first == '_') || name.contains('/') {
        return Err(Status::EBADNAME);
    }

    Ok(())
}

/// Convert `value` to `kind` the way the library converts on write
fn convert(value: &Value, kind: ScalarKind) -> DriverResult<Value> {
    if value.kind().is_numeric() != kind.is_numeric() {
        return Err(Status::ECHAR);
    }

    value.cast(kind).ok_or(if kind.is_numeric() {
        Status::ERANGE
    } else {
        Status::ECHAR
    })
}

/// Every index of the hyperslab at `start` with shape `count`, in row major order
fn positions<'a>(start: &'a [usize], count: &[usize]) -> impl Iterator<Item = Vec<usize>> + 'a {
    ndarray::indices(IxDyn(count))
        .into_iter()
        .map(move |offset| {
            offset
                .slice()
                .iter()
                .zip(start)
                .map(|(offset, start)| offset + start)
                .collect()
        })
}

impl Dataset {
    fn new(path: &Path, flags: i32) -> Self {
        Self {
            path: path.to_path_buf(),
            flags,
            phase: Phase::Define,
            dimensions: vec![],
            types: vec![],
            variables: vec![],
            global_attributes: vec![],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_netcdf4(&self) -> bool {
        self.flags & NC_NETCDF4 != 0
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    pub fn dimension_by_id(&self, dimid: DimId) -> Option<&Dimension> {
        usize::try_from(dimid.0)
            .ok()
            .and_then(|i| self.dimensions.get(i))
    }

    pub fn types(&self) -> &[CompoundType] {
        &self.types
    }

    pub fn compound_type(&self, name: &str) -> Option<&CompoundType> {
        self.types.iter().find(|compound| compound.name == name)
    }

    /// Look up an atomic or user defined type code
    pub fn resolve(&self, xtype: XType) -> Option<TypeRef<'_>> {
        if xtype.is_user_defined() {
            let i = usize::try_from(xtype.0 - NC_FIRSTUSERTYPEID.0).ok()?;
            self.types.get(i).map(TypeRef::Compound)
        } else {
            ScalarKind::from_xtype(xtype).ok().map(TypeRef::Atomic)
        }
    }

    pub fn variables(&self) -> &[StoredVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&StoredVariable> {
        self.variables.iter().find(|var| var.name == name)
    }

    pub fn global_attributes(&self) -> &[(String, Attribute)] {
        &self.global_attributes
    }

    pub fn global_attribute(&self, name: &str) -> Option<&Attribute> {
        find(&self.global_attributes, name)
    }

    pub fn attribute(&self, var: &str, name: &str) -> Option<&Attribute> {
        self.variable(var)?.attribute(name)
    }

    /// Names of the dimensions of `var`, outermost first
    pub fn dim_names(&self, var: &StoredVariable) -> Vec<&str> {
        var.dims
            .iter()
            .filter_map(|dim| self.dimension_by_id(*dim))
            .map(|dim| dim.name.as_str())
            .collect()
    }

    /// Current shape of `var`
    pub fn shape(&self, var: &StoredVariable) -> Vec<usize> {
        var.dims
            .iter()
            .filter_map(|dim| self.dimension_by_id(*dim))
            .map(|dim| dim.len)
            .collect()
    }

    pub fn value(&self, var: &str, index: &[usize]) -> Option<&Value> {
        self.variable(var)?.cell(index)?.as_value()
    }

    /// The compound record at position `i` of a one dimensional compound variable
    pub fn record(&self, var: &str, i: usize) -> Option<&[Value]> {
        self.variable(var)?.cell(&[i])?.as_record()
    }

    /// Every cell of `var` as a dense array. Unwritten cells are `None`.
    pub fn cells(&self, var: &str) -> Option<ArrayD<Option<Cell>>> {
        let var = self.variable(var)?;
        let shape = self.shape(var);

        Some(ArrayD::from_shape_fn(IxDyn(&shape), |index| {
            var.cells.get(index.slice()).cloned()
        }))
    }

    /// Every scalar cell of `var` as a dense array. Unwritten cells are `None`.
    pub fn array(&self, var: &str) -> Option<ArrayD<Option<Value>>> {
        let cells = self.cells(var)?;
        Some(cells.map(|cell| cell.as_ref().and_then(Cell::as_value).cloned()))
    }

    /// Row `row` of a two dimensional `char` variable, up to the first unwritten or NUL
    /// character.
    pub fn text(&self, var: &str, row: usize) -> Option<String> {
        let var = self.variable(var)?;
        let shape = self.shape(var);
        if shape.len() != 2 || row >= shape[0] {
            return None;
        }

        let bytes: Vec<u8> = (0..shape[1])
            .map_while(|col| match var.cells.get(&[row, col][..]) {
                Some(Cell::Scalar(Value::Char(c))) if *c != 0 => Some(*c),
                _ => None,
            })
            .collect();

        String::from_utf8(bytes).ok()
    }

    fn in_define(&self) -> DriverResult<()> {
        match self.phase {
            Phase::Define => Ok(()),
            Phase::Data => Err(Status::ENOTINDEFINE),
        }
    }

    fn in_data(&self) -> DriverResult<()> {
        match self.phase {
            Phase::Data => Ok(()),
            Phase::Define => Err(Status::EINDEFINE),
        }
    }

    fn var_index(&self, varid: VarId) -> DriverResult<usize> {
        usize::try_from(varid.0)
            .ok()
            .filter(|i| *i < self.variables.len())
            .ok_or(Status::ENOTVAR)
    }

    fn type_index(&self, xtype: XType) -> DriverResult<usize> {
        match self.resolve(xtype) {
            Some(TypeRef::Compound(_)) => Ok((xtype.0 - NC_FIRSTUSERTYPEID.0) as usize),
            _ => Err(Status::EBADTYPE),
        }
    }

    fn atomic_kind(&self, var: usize) -> DriverResult<ScalarKind> {
        match self.resolve(self.variables[var].xtype) {
            Some(TypeRef::Atomic(kind)) => Ok(kind),
            _ => Err(Status::EBADTYPE),
        }
    }

    fn def_dim(&mut self, name: &str, len: usize) -> DriverResult<DimId> {
        self.in_define()?;
        check_name(name)?;
        if self.dimension(name).is_some() {
            return Err(Status::ENAMEINUSE);
        }

        self.dimensions.push(Dimension {
            name: name.to_string(),
            len,
            unlimited: len == NC_UNLIMITED,
        });

        Ok(DimId(self.dimensions.len() as i32 - 1))
    }

    fn def_var(&mut self, name: &str, xtype: XType, dims: &[DimId]) -> DriverResult<VarId> {
        self.in_define()?;
        check_name(name)?;
        if self.variable(name).is_some() {
            return Err(Status::ENAMEINUSE);
        }
        if self.resolve(xtype).is_none() {
            return Err(Status::EBADTYPE);
        }
        if dims.iter().any(|dim| self.dimension_by_id(*dim).is_none()) {
            return Err(Status::EBADDIM);
        }

        self.variables.push(StoredVariable {
            name: name.to_string(),
            xtype,
            dims: dims.to_vec(),
            attributes: vec![],
            storage: Storage::Contiguous,
            chunk_sizes: vec![],
            cells: BTreeMap::new(),
        });

        Ok(VarId(self.variables.len() as i32 - 1))
    }

    fn def_compound(&mut self, size: usize, name: &str) -> DriverResult<XType> {
        self.in_define()?;
        if !self.is_netcdf4() {
            return Err(Status::ENOTNC4);
        }
        check_name(name)?;
        if self.compound_type(name).is_some() {
            return Err(Status::ENAMEINUSE);
        }
        if size == 0 {
            return Err(Status::EINVAL);
        }

        self.types.push(CompoundType {
            name: name.to_string(),
            size,
            members: vec![],
        });

        Ok(XType(NC_FIRSTUSERTYPEID.0 + self.types.len() as i32 - 1))
    }

    fn insert_compound(
        &mut self,
        xtype: XType,
        name: &str,
        offset: usize,
        field_type: XType,
    ) -> DriverResult<()> {
        self.in_define()?;
        let i = self.type_index(xtype)?;
        check_name(name)?;
        let kind = match self.resolve(field_type) {
            Some(TypeRef::Atomic(kind)) => kind,
            _ => return Err(Status::EBADTYPE),
        };

        let compound = &mut self.types[i];
        if compound.member(name).is_some() {
            return Err(Status::ENAMEINUSE);
        }
        if offset + kind.size() > compound.size {
            return Err(Status::EINVAL);
        }

        compound.members.push(Member {
            name: name.to_string(),
            offset,
            kind,
        });

        Ok(())
    }

    fn def_var_chunking(
        &mut self,
        varid: VarId,
        storage: Storage,
        chunk_sizes: &[usize],
    ) -> DriverResult<()> {
        self.in_define()?;
        let i = self.var_index(varid)?;
        let var = &mut self.variables[i];
        match storage {
            Storage::Chunked => {
                if chunk_sizes.len() != var.dims.len() || chunk_sizes.contains(&0) {
                    return Err(Status::EINVAL);
                }
                var.chunk_sizes = chunk_sizes.to_vec();
            }
            Storage::Contiguous => var.chunk_sizes.clear(),
        }
        var.storage = storage;

        Ok(())
    }

    fn put_att(&mut self, varid: VarId, name: &str, attribute: Attribute) -> DriverResult<()> {
        self.in_define()?;
        check_name(name)?;
        let attributes = if varid == NC_GLOBAL {
            &mut self.global_attributes
        } else {
            let i = self.var_index(varid)?;
            &mut self.variables[i].attributes
        };

        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = attribute,
            None => attributes.push((name.to_string(), attribute)),
        }

        Ok(())
    }

    fn put_att_compound(
        &mut self,
        varid: VarId,
        name: &str,
        xtype: XType,
        fields: &[Value],
    ) -> DriverResult<()> {
        let compound = &self.types[self.type_index(xtype)?];
        if fields.len() != compound.members.len() {
            return Err(Status::EINVAL);
        }
        let fields = compound
            .members
            .iter()
            .zip(fields)
            .map(|(member, field)| convert(field, member.kind))
            .collect::<DriverResult<Vec<Value>>>()?;

        self.put_att(varid, name, Attribute::Compound { xtype, fields })
    }

    /// Check a hyperslab against the variable's dimensions, growing unlimited dimensions to
    /// cover it. Nothing changes if the check fails.
    fn reserve(&mut self, var: usize, start: &[usize], count: &[usize]) -> DriverResult<()> {
        let dims = &self.variables[var].dims;
        if start.len() != dims.len() || count.len() != dims.len() {
            return Err(Status::EINVALCOORDS);
        }

        let mut grown = vec![];
        for ((dim, &start), &count) in dims.iter().zip(start).zip(count) {
            let i = dim.0 as usize;
            let dimension = &self.dimensions[i];
            if dimension.unlimited {
                if count > 0 {
                    grown.push((i, start + count));
                }
                continue;
            }
            if start > dimension.len || (start == dimension.len && count > 0) {
                return Err(Status::EINVALCOORDS);
            }
            if start + count > dimension.len {
                return Err(Status::EEDGE);
            }
        }

        for (i, end) in grown {
            let dimension = &mut self.dimensions[i];
            dimension.len = dimension.len.max(end);
        }

        Ok(())
    }

    fn put_var1(&mut self, varid: VarId, index: &[usize], value: Value) -> DriverResult<()> {
        self.in_data()?;
        let var = self.var_index(varid)?;
        let value = convert(&value, self.atomic_kind(var)?)?;
        self.reserve(var, index, &vec![1; index.len()])?;
        self.variables[var]
            .cells
            .insert(index.to_vec(), Cell::Scalar(value));

        Ok(())
    }

    fn put_vara_text(
        &mut self,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        text: &[u8],
    ) -> DriverResult<()> {
        self.in_data()?;
        let var = self.var_index(varid)?;
        if self.atomic_kind(var)? != ScalarKind::Char {
            return Err(Status::ECHAR);
        }
        if text.len() != count.iter().product::<usize>() {
            return Err(Status::EINVAL);
        }
        self.reserve(var, start, count)?;

        let cells = &mut self.variables[var].cells;
        for (index, c) in positions(start, count).zip(text) {
            cells.insert(index, Cell::Scalar(Value::Char(*c)));
        }

        Ok(())
    }

    fn put_vara(
        &mut self,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        buffer: &[u8],
    ) -> DriverResult<()> {
        self.in_data()?;
        let var = self.var_index(varid)?;
        let n: usize = count.iter().product();

        let decoded = match self.resolve(self.variables[var].xtype) {
            Some(TypeRef::Compound(compound)) => {
                if buffer.len() != compound.size * n {
                    return Err(Status::EINVAL);
                }
                buffer
                    .chunks(compound.size)
                    .map(|record| compound.decode(record).map(Cell::Record))
                    .collect::<DriverResult<Vec<Cell>>>()?
            }
            Some(TypeRef::Atomic(ScalarKind::String)) | None => return Err(Status::EBADTYPE),
            Some(TypeRef::Atomic(kind)) => {
                if buffer.len() != kind.size() * n {
                    return Err(Status::EINVAL);
                }
                buffer
                    .chunks(kind.size())
                    .map(|bytes| {
                        Value::read_ne(kind, bytes)
                            .map(Cell::Scalar)
                            .ok_or(Status::EINVAL)
                    })
                    .collect::<DriverResult<Vec<Cell>>>()?
            }
        };
        self.reserve(var, start, count)?;

        let cells = &mut self.variables[var].cells;
        for (index, cell) in positions(start, count).zip(decoded) {
            cells.insert(index, cell);
        }

        Ok(())
    }
}

/// Snapshots of every file synced or closed by the drivers sharing this store, by path.
///
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    datasets: Arc<Mutex<HashMap<PathBuf, Dataset>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last snapshot committed for `path`
    pub fn get(&self, path: &Path) -> Option<Dataset> {
        self.datasets.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.datasets.lock().keys().cloned().collect();
        paths.sort();

        paths
    }

    fn commit(&self, dataset: &Dataset) {
        self.datasets
            .lock()
            .insert(dataset.path.clone(), dataset.clone());
    }
}

/// A `Driver` that keeps open files in RAM and commits them to a `MemoryStore`.
///
#[derive(Debug, Default)]
pub struct MemoryDriver {
    store: MemoryStore,
    open: HashMap<NcId, Dataset>,
    last_ncid: i32,
    failures: HashMap<&'static str, Status>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver that commits to an existing store
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }

    /// Make every later call of `op` (for example `"nc_put_vara"`) fail with `status`.
    pub fn fail_on(&mut self, op: &'static str, status: Status) {
        self.failures.insert(op, status);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// The current, uncommitted state of an open file
    pub fn dataset(&self, ncid: NcId) -> Option<&Dataset> {
        self.open.get(&ncid)
    }

    fn check(&self, op: &'static str) -> DriverResult<()> {
        match self.failures.get(op) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    fn dataset_mut(&mut self, op: &'static str, ncid: NcId) -> DriverResult<&mut Dataset> {
        self.check(op)?;
        self.open.get_mut(&ncid).ok_or(Status::EBADID)
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
                    self.dataset_mut("nc_put_att", ncid)?
                        .put_att(varid, name, Attribute::Scalar(Value::from(value)))
                }

                fn [<put_var1_ $suffix>](
                    &mut self,
                    ncid: NcId,
                    varid: VarId,
                    index: &[usize],
                    value: $type,
                ) -> DriverResult<()> {
                    self.dataset_mut("nc_put_var1", ncid)?
                        .put_var1(varid, index, Value::from(value))
                }
            )*
        }
    };
}

impl Driver for MemoryDriver {
    fn create(&mut self, path: &Path, flags: i32) -> DriverResult<NcId> {
        self.check("nc_create")?;
        self.last_ncid += 1;
        let ncid = NcId(self.last_ncid << 16);
        self.open.insert(ncid, Dataset::new(path, flags));

        debug!("memory driver opened {} as {}", path.display(), ncid.0);

        Ok(ncid)
    }

    fn def_dim(&mut self, ncid: NcId, name: &str, len: usize) -> DriverResult<DimId> {
        self.dataset_mut("nc_def_dim", ncid)?.def_dim(name, len)
    }

    fn def_var(
        &mut self,
        ncid: NcId,
        name: &str,
        xtype: XType,
        dims: &[DimId],
    ) -> DriverResult<VarId> {
        self.dataset_mut("nc_def_var", ncid)?
            .def_var(name, xtype, dims)
    }

    fn def_compound(&mut self, ncid: NcId, size: usize, name: &str) -> DriverResult<XType> {
        self.dataset_mut("nc_def_compound", ncid)?
            .def_compound(size, name)
    }

    fn insert_compound(
        &mut self,
        ncid: NcId,
        xtype: XType,
        name: &str,
        offset: usize,
        field_type: XType,
    ) -> DriverResult<()> {
        self.dataset_mut("nc_insert_compound", ncid)?
            .insert_compound(xtype, name, offset, field_type)
    }

    fn def_var_chunking(
        &mut self,
        ncid: NcId,
        varid: VarId,
        storage: Storage,
        chunk_sizes: &[usize],
    ) -> DriverResult<()> {
        self.dataset_mut("nc_def_var_chunking", ncid)?
            .def_var_chunking(varid, storage, chunk_sizes)
    }

    fn put_att_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        name: &str,
        value: &str,
    ) -> DriverResult<()> {
        self.dataset_mut("nc_put_att", ncid)?
            .put_att(varid, name, Attribute::Scalar(Value::from(value)))
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
        self.dataset_mut("nc_put_att", ncid)?
            .put_att_compound(varid, name, xtype, fields)
    }

    fn put_vara_text(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        text: &[u8],
    ) -> DriverResult<()> {
        self.dataset_mut("nc_put_vara_text", ncid)?
            .put_vara_text(varid, start, count, text)
    }

    fn put_vara(
        &mut self,
        ncid: NcId,
        varid: VarId,
        start: &[usize],
        count: &[usize],
        buffer: &[u8],
    ) -> DriverResult<()> {
        self.dataset_mut("nc_put_vara", ncid)?
            .put_vara(varid, start, count, buffer)
    }

    fn enddef(&mut self, ncid: NcId) -> DriverResult<()> {
        let dataset = self.dataset_mut("nc_enddef", ncid)?;
        dataset.in_define()?;
        dataset.phase = Phase::Data;

        Ok(())
    }

    fn sync(&mut self, ncid: NcId) -> DriverResult<()> {
        self.check("nc_sync")?;
        let dataset = self.open.get(&ncid).ok_or(Status::EBADID)?;
        self.store.commit(dataset);

        Ok(())
    }

    fn close(&mut self, ncid: NcId) -> DriverResult<()> {
        self.check("nc_close")?;
        let mut dataset = self.open.remove(&ncid).ok_or(Status::EBADID)?;
        dataset.phase = Phase::Data;
        self.store.commit(&dataset);

        debug!("memory driver closed {}", dataset.path.display());

        Ok(())
    }
}
