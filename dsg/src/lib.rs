pub mod conventions;
pub mod driver;
mod errors;
mod kind;
pub mod memory;
mod observation;
mod schema;
mod station;
mod value;
mod variable;
mod writer;

#[cfg(test)]
mod testing;

pub use driver::{DimId, Driver, DriverResult, NcId, Status, Storage, VarId, XType};

pub use errors::Error;
pub use errors::Result;

pub use kind::ScalarKind;
pub use kind::{
    NC_FILL_BYTE, NC_FILL_CHAR, NC_FILL_DOUBLE, NC_FILL_FLOAT, NC_FILL_INT, NC_FILL_INT64,
    NC_FILL_SHORT,
};

pub use memory::{Dataset, MemoryDriver, MemoryStore};

pub use observation::Observation;

pub use schema::{AttributeBucket, RecordType};

pub use station::Station;

pub use value::Value;

pub use variable::{Attributes, Category, Variable};

pub use writer::Mode;
pub use writer::MultiDimensionalWriter;
pub use writer::RaggedWriter;
pub use writer::{GlobalAttributes, MultiDimensionalOptions, RaggedOptions, TimeAxis};
