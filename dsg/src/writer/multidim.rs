use std::path::Path;

use tracing::{debug, trace, warn};

use crate::conventions::{
    write_global_attributes, COORDINATES, MULTIDIM_COORDINATES, STATION_DIM, STATION_ID_LEN_DIM,
    TIME_DIM,
};
use crate::driver::{put_attributes, put_var1_value, Driver, VarId, NC_UNLIMITED};
use crate::errors::{Error, Result, StatusExt};
use crate::observation::Observation;
use crate::station::{self, Station, StationVariables};
use crate::variable::{Category, Variable};

use super::handle::Handle;
use super::options::{MultiDimensionalOptions, TimeAxis};
use super::Mode;

/// Writes a station time series as one `(station, time)` grid per statistic.
///
pub struct MultiDimensionalWriter<D: Driver> {
    handle: Handle<D>,
    statistics: Vec<Variable>,
    data_vars: Vec<VarId>,
}

impl<D: Driver> MultiDimensionalWriter<D> {
    /// Create the file at `path` and write its complete header and coordinates.
    ///
    /// # Arguments
    ///
    /// * `driver` - The driver used to produce the file. The writer owns it until dropped.
    /// * `path` - Target path. No other writer in this process may have it open.
    /// * `stations` - The fixed station list, in index order.
    /// * `time_axis` - Time units and the offsets of every time step.
    /// * `variables` - The statistic variables. Each becomes its own `(station, time)` variable.
    /// * `options` - Global attributes and the unlimited station hook.
    ///
    pub fn create<P: AsRef<Path>>(
        driver: D,
        path: P,
        stations: &[Station],
        time_axis: &TimeAxis,
        variables: &[Variable],
        options: &MultiDimensionalOptions,
    ) -> Result<Self> {
        station::validate(stations)?;
        if time_axis.is_empty() {
            return Err(Error::Empty("time offsets"));
        }
        for (i, variable) in variables.iter().enumerate() {
            if variable.category() != Category::Statistic {
                return Err(Error::ReservedName(variable.name().to_string()));
            }
            if variables[..i].iter().any(|v| v.name() == variable.name()) {
                return Err(Error::DuplicateVariable(variable.name().to_string()));
            }
        }

        let mut handle = Handle::create(driver, path.as_ref())?;
        let ncid = handle.ncid();
        let driver = handle.driver_mut();

        let station_len = if options.unlimited_station {
            NC_UNLIMITED
        } else {
            stations.len()
        };
        let station_dim = driver
            .def_dim(ncid, STATION_DIM, station_len)
            .status("nc_def_dim")?;
        let id_len_dim = driver
            .def_dim(ncid, STATION_ID_LEN_DIM, station::max_id_len(stations))
            .status("nc_def_dim")?;
        let time_dim = driver
            .def_dim(ncid, TIME_DIM, time_axis.len())
            .status("nc_def_dim")?;

        let coordinates = [
            Variable::station_id(),
            Variable::latitude(),
            Variable::longitude(),
        ];
        let station_vars =
            StationVariables::define(driver, ncid, &coordinates, station_dim, id_len_dim)?;

        let time = Variable::time(&time_axis.units);
        let time_var = driver
            .def_var(ncid, time.name(), time.kind().xtype(), &[time_dim])
            .status("nc_def_var")?;
        put_attributes(driver, ncid, time_var, time.attributes())?;

        write_global_attributes(driver, ncid, &options.global_attributes)?;

        let mut data_vars = Vec::with_capacity(variables.len());
        for variable in variables {
            let varid = driver
                .def_var(
                    ncid,
                    variable.name(),
                    variable.kind().xtype(),
                    &[station_dim, time_dim],
                )
                .status("nc_def_var")?;
            driver
                .put_att_text(ncid, varid, COORDINATES, MULTIDIM_COORDINATES)
                .status("nc_put_att")?;
            put_attributes(driver, ncid, varid, variable.attributes())?;
            data_vars.push(varid);
        }

        handle.enddef()?;

        let driver = handle.driver_mut();
        station_vars.populate(driver, ncid, stations)?;
        for (i, offset) in time_axis.offsets.iter().enumerate() {
            driver
                .put_var1_int(ncid, time_var, &[i], *offset)
                .status("nc_put_var1")?;
        }

        debug!(
            "wrote {} time steps for {} statistics",
            time_axis.len(),
            variables.len()
        );

        Ok(Self {
            handle,
            statistics: variables.to_vec(),
            data_vars,
        })
    }

    /// Write one observation into every statistic grid at `(station_index, time_offset)`.
    ///
    /// Returns `Ok(false)` without writing anything if the writer is closed, either index is
    /// negative, or the values do not fit the statistics. Missing values leave their cell
    /// unwritten. Fails with `UnsupportedType` if any value is a string, and with a driver
    /// error if an index is beyond its dimension.
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

        let (station, time) = match obs.indices() {
            Some(indices) => indices,
            None => {
                warn!(
                    "rejected observation: negative index ({}, {})",
                    obs.station_index, obs.time_offset
                );
                return Ok(false);
            }
        };
        if !obs.matches(&self.statistics) {
            warn!("rejected observation at ({station}, {time}): does not match schema");
            return Ok(false);
        }

        let ncid = self.handle.ncid();
        let driver = self.handle.driver_mut();
        for (varid, value) in self.data_vars.iter().zip(&obs.values) {
            if let Some(value) = value {
                put_var1_value(driver, ncid, *varid, &[station, time], value)?;
            }
        }

        trace!("wrote observation at ({station}, {time})");

        Ok(true)
    }

    /// Flush pending writes without closing. Fails with `Closed` after `close`.
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

    pub fn statistics(&self) -> &[Variable] {
        &self.statistics
    }
}
