//! Writers for the two station time series layouts.
//!
//! Both writers go through the same life cycle: the header is written in define mode by the
//! constructor, station coordinates (and, for the multidimensional layout, the time axis) are
//! written on entering data mode, then observations are streamed with `put` until `close`.
//!
mod handle;
mod multidim;
mod options;
mod ragged;


pub use multidim::MultiDimensionalWriter;
pub use options::{GlobalAttributes, MultiDimensionalOptions, RaggedOptions, TimeAxis};
pub use ragged::RaggedWriter;

/// Life cycle state of an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Define,
    Data,
    Closed,
}
