use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{put_attributes, put_var1_value, DimId, Driver, NcId, VarId, NC_CHAR};
use crate::errors::{Error, Result, StatusExt};
use crate::value::Value;
use crate::variable::{Category, Variable};

/// A fixed measurement site.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub latitude: f32,
    pub longitude: f32,
    pub id: String,

    /// Declared position of the station in the station list, if any. A negative index counts as
    /// undeclared.
    #[serde(default)]
    pub index: Option<i32>,
}

impl Station {
    pub fn new<S: Into<String>>(latitude: f32, longitude: f32, id: S) -> Self {
        Self {
            latitude,
            longitude,
            id: id.into(),
            index: None,
        }
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = Some(index);
        self
    }
}

/// Check a station list before any header is written.
///
/// The list must not be empty, every id must be non-empty, and a declared index must equal the
/// station's position in the list.
///
pub fn validate(stations: &[Station]) -> Result<()> {
    if stations.is_empty() {
        return Err(Error::Empty("stations"));
    }

    for (position, station) in stations.iter().enumerate() {
        if station.id.is_empty() {
            return Err(Error::InvalidStation {
                position,
                reason: String::from("station id is empty"),
            });
        }

        if let Some(index) = station.index {
            if index >= 0 && index as usize != position {
                return Err(Error::InvalidStation {
                    position,
                    reason: format!("declared index {index} does not match position"),
                });
            }
        }
    }

    Ok(())
}

/// Length in bytes of the longest station id. This is the length of the `station_id_len`
/// dimension.
pub fn max_id_len(stations: &[Station]) -> usize {
    stations
        .iter()
        .map(|station| station.id.len())
        .max()
        .unwrap_or(0)
}

/// Ids of the per-station coordinate variables of an open file.
///
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StationVariables {
    station_id: Option<VarId>,
    lat: Option<VarId>,
    lon: Option<VarId>,
}

impl StationVariables {
    /// Define a variable for every `station_id`, `lat` or `lon` descriptor in `descriptors`, in
    /// declaration order, with all of its attributes.
    ///
    /// `station_id` is always a character matrix over `(station, station_id_len)`. `lat` and
    /// `lon` keep their declared kind over `(station,)`.
    ///
    pub(crate) fn define<'a, D, I>(
        driver: &mut D,
        ncid: NcId,
        descriptors: I,
        station_dim: DimId,
        id_len_dim: DimId,
    ) -> Result<Self>
    where
        D: Driver + ?Sized,
        I: IntoIterator<Item = &'a Variable>,
    {
        let mut vars = StationVariables::default();
        for descriptor in descriptors {
            let varid = match descriptor.category() {
                Category::StationId => {
                    let varid = driver
                        .def_var(
                            ncid,
                            descriptor.name(),
                            NC_CHAR,
                            &[station_dim, id_len_dim],
                        )
                        .status("nc_def_var")?;
                    vars.station_id = Some(varid);
                    varid
                }
                Category::LatLon => {
                    let varid = driver
                        .def_var(
                            ncid,
                            descriptor.name(),
                            descriptor.kind().xtype(),
                            &[station_dim],
                        )
                        .status("nc_def_var")?;
                    if descriptor.name() == "lat" {
                        vars.lat = Some(varid);
                    } else {
                        vars.lon = Some(varid);
                    }
                    varid
                }
                Category::Time | Category::Statistic => continue,
            };

            put_attributes(driver, ncid, varid, descriptor.attributes())?;
        }

        Ok(vars)
    }

    /// Write one slot per station, in station order. Must be called in data mode.
    ///
    pub(crate) fn populate<D>(&self, driver: &mut D, ncid: NcId, stations: &[Station]) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        for (i, station) in stations.iter().enumerate() {
            if let Some(varid) = self.station_id {
                let id = station.id.as_bytes();
                driver
                    .put_vara_text(ncid, varid, &[i, 0], &[1, id.len()], id)
                    .status("nc_put_vara_text")?;
            }
            if let Some(varid) = self.lon {
                put_var1_value(driver, ncid, varid, &[i], &Value::F32(station.longitude))?;
            }
            if let Some(varid) = self.lat {
                put_var1_value(driver, ncid, varid, &[i], &Value::F32(station.latitude))?;
            }
        }

        debug!("populated {} stations", stations.len());

        Ok(())
    }
}
