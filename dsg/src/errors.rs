use std::io;
use std::path::PathBuf;
use std::result;

use crate::driver::{DriverResult, Status};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The writer driver returned a non-zero status.
    #[error("{op} failed: {status}")]
    Driver { op: &'static str, status: Status },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("invalid station at position {position}: {reason}")]
    InvalidStation { position: usize, reason: String },

    #[error("no {0} supplied")]
    Empty(&'static str),

    #[error("variable '{0}' is already part of the schema")]
    DuplicateVariable(String),

    #[error("variable name '{0}' is reserved for a coordinate variable")]
    ReservedName(String),

    #[error("{} is already open for writing", .0.display())]
    PathInUse(PathBuf),

    #[error("writer is closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Turn a driver status into a crate error, naming the driver operation that produced it.
///
pub(crate) trait StatusExt<T> {
    fn status(self, op: &'static str) -> Result<T>;
}

impl<T> StatusExt<T> for DriverResult<T> {
    fn status(self, op: &'static str) -> Result<T> {
        self.map_err(|status| Error::Driver { op, status })
    }
}
