use std::path::Path;

use tracing::{debug, trace, warn};

use crate::conventions::{
    write_global_attributes, OBSERVATION_DIM, STATION_DIM, STATION_ID_LEN_DIM,
};
use crate::driver::{Driver, VarId, NC_UNLIMITED};
use crate::errors::{Error, Result, StatusExt};
use crate::observation::Observation;
use crate::schema::RecordType;
use crate::station::{self, Station};

use super::handle::Handle;
use super::options::RaggedOptions;
use super::Mode;

/// Writes a station time series as one compound record per observation, appended along an
/// unlimited `observation` dimension.
///
pub struct RaggedWriter<D: Driver> {
    handle: Handle<D>,
    record: RecordType,
    record_var: VarId,
    n_stations: usize,
    counter: usize,
}

impl<D: Driver> RaggedWriter<D> {
    /// Create the file at `path` and write its complete header and station coordinates.
    ///
    pub fn create<P: AsRef<Path>>(
        driver: D,
        path: P,
        mut record: RecordType,
        stations: &[Station],
        options: &RaggedOptions,
    ) -> Result<Self> {
        station::validate(stations)?;

        let mut handle = Handle::create(driver, path.as_ref())?;
        let ncid = handle.ncid();
        let driver = handle.driver_mut();

        let station_dim = driver
            .def_dim(ncid, STATION_DIM, stations.len())
            .status("nc_def_dim")?;
        let id_len_dim = driver
            .def_dim(ncid, STATION_ID_LEN_DIM, station::max_id_len(stations))
            .status("nc_def_dim")?;
        let obs_dim = driver
            .def_dim(ncid, OBSERVATION_DIM, NC_UNLIMITED)
            .status("nc_def_dim")?;

        let compound_type = record.write_compound(driver, ncid)?;
        let station_vars = record.write_station_variables(driver, ncid, station_dim, id_len_dim)?;
        let record_var =
            record.write_record_variable(driver, ncid, obs_dim, compound_type, options.chunking)?;

        write_global_attributes(driver, ncid, &options.global_attributes)?;

        handle.enddef()?;
        station_vars.populate(handle.driver_mut(), ncid, stations)?;

        debug!(
            "ragged header written with {} statistics",
            record.statistics().count()
        );

        Ok(Self {
            handle,
            record,
            record_var,
            n_stations: stations.len(),
            counter: 0,
        })
    }

    /// Append one observation as the next record.
    ///
    /// Returns `Ok(false)` without writing anything if the writer is closed, the station index
    /// is negative or past the last station, or the values do not fit the schema. The time
    /// offset is stored as given, negative or not. Fails with `UnsupportedType` if any value is
    /// a string.
    ///
    pub fn put(&mut self, obs: &Observation) -> Result<bool> {
        if self.handle.mode() == Mode::Closed {
            warn!("rejected observation: writer is closed");
            return Ok(false);
        }
        if obs.has_text() {
            return Err(Error::UnsupportedType(String::from(
                "string observation values cannot be written",
            )));
        }

        match usize::try_from(obs.station_index) {
            Ok(station) if station < self.n_stations => {}
            _ => {
                warn!(
                    "rejected observation: bad station index {}",
                    obs.station_index
                );
                return Ok(false);
            }
        }
        if !self.record.is_observation_valid(obs) {
            warn!(
                "rejected observation at ({}, {}): does not match schema",
                obs.station_index, obs.time_offset
            );
            return Ok(false);
        }

        let buffer = self.record.pack(obs)?;
        let ncid = self.handle.ncid();
        self.handle
            .driver_mut()
            .put_vara(ncid, self.record_var, &[self.counter], &[1], &buffer)
            .status("nc_put_vara")?;

        trace!("wrote record {}", self.counter);
        self.counter += 1;

        Ok(true)
    }

    /// Number of records written so far. This is also the position of the next record.
    pub fn observations_written(&self) -> usize {
        self.counter
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record
    }

    pub fn sync(&mut self) -> Result<()> {
        self.handle.sync()
    }

    /// Close the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }

    pub fn mode(&self) -> Mode {
        self.handle.mode()
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }
}
