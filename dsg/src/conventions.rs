//! Names fixed by the CF-1.6 discrete sampling geometry conventions for station time series.
//!
use crate::driver::{Driver, NcId, NC_GLOBAL};
use crate::errors::{Result, StatusExt};
use crate::writer::GlobalAttributes;

pub const STATION_DIM: &str = "station";
pub const STATION_ID_LEN_DIM: &str = "station_id_len";
pub const OBSERVATION_DIM: &str = "observation";
pub const TIME_DIM: &str = "time";

pub const RECORD_VAR: &str = "record";
pub const RECORD_TYPE: &str = "record_type";

/// Name of the compound member holding the station index in the ragged layout.
pub const STATION_INDEX_MEMBER: &str = "index";

pub const CONVENTIONS: &str = "Conventions";
pub const CF_VERSION: &str = "CF-1.6";
pub const FEATURE_TYPE: &str = "CF:featureType";
pub const TIME_SERIES: &str = "timeSeries";
pub const RAGGED_PARENT_INDEX: &str = "CF:ragged_parent_index";
pub const RAGGED_PARENT_INDEX_TYPE: &str = "record_ragged_parent_index_type";

pub const COORDINATES: &str = "coordinates";

/// `coordinates` of every data variable in the multidimensional layout
pub const MULTIDIM_COORDINATES: &str = "time lat lon";

/// `coordinates` of the record variable in the ragged layout
pub const RAGGED_COORDINATES: &str = "record.time lon lat";

/// Write `Conventions` and `CF:featureType`, then every caller supplied global attribute in
/// insertion order.
///
pub(crate) fn write_global_attributes<D>(
    driver: &mut D,
    ncid: NcId,
    attributes: &GlobalAttributes,
) -> Result<()>
where
    D: Driver + ?Sized,
{
    driver
        .put_att_text(ncid, NC_GLOBAL, CONVENTIONS, CF_VERSION)
        .status("nc_put_att")?;
    driver
        .put_att_text(ncid, NC_GLOBAL, FEATURE_TYPE, TIME_SERIES)
        .status("nc_put_att")?;

    for (name, value) in attributes.iter() {
        driver
            .put_att_text(ncid, NC_GLOBAL, name, value)
            .status("nc_put_att")?;
    }

    Ok(())
}
