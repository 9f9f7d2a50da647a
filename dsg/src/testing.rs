use std::path::PathBuf;

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::conventions::{
    CONVENTIONS, COORDINATES, FEATURE_TYPE, RAGGED_PARENT_INDEX, STATION_INDEX_MEMBER,
};
use crate::errors::Result;
use crate::kind::ScalarKind;
use crate::memory::{Attribute, Dataset, StoredVariable, TypeRef};
use crate::station::Station;
use crate::variable::{Attributes, Variable};

/// Send `tracing` output to the test harness. Filter with `RUST_LOG`.
pub(crate) fn setup_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh directory and a target path inside it. The directory is removed when the returned
/// `TempDir` is dropped.
pub(crate) fn target(name: &str) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);

    Ok((dir, path))
}

pub(crate) fn stations() -> Vec<Station> {
    vec![
        Station::new(40.0, -89.3, "station_test1"),
        Station::new(-34.0, 44.6, "station_test2"),
    ]
}

/// A statistic measured in days
pub(crate) fn statistic(name: &str, kind: ScalarKind) -> Variable {
    Variable::new(name, kind, Attributes::new().with("units", "days"))
}

/// Feature types a CF discrete sampling geometry reader can report
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FeatureType {
    Station,
    Unknown(String),
}

/// Classify a file the way a CF-aware reader does for station time series.
///
/// A file is a station file if it declares the CF conventions and the `timeSeries` feature type,
/// has an instance variable with `cf_role = timeseries_id` whose outer dimension is the instance
/// dimension, has latitude and longitude over that dimension, and either stores its data as
/// `(instance, time)` grids or as ragged records whose parent index points at the instance
/// dimension.
///
pub(crate) fn classify(dataset: &Dataset) -> FeatureType {
    match check_station(dataset) {
        Ok(()) => FeatureType::Station,
        Err(reason) => FeatureType::Unknown(reason),
    }
}

fn text<'a>(attribute: Option<&'a Attribute>) -> Option<&'a str> {
    attribute.and_then(Attribute::as_text)
}

fn with_standard_name<'a>(dataset: &'a Dataset, name: &str) -> Option<&'a StoredVariable> {
    dataset
        .variables()
        .iter()
        .find(|var| text(var.attribute("standard_name")) == Some(name))
}

fn check_station(dataset: &Dataset) -> std::result::Result<(), String> {
    let conventions = text(dataset.global_attribute(CONVENTIONS)).ok_or("no Conventions")?;
    if !conventions.starts_with("CF-1.") {
        return Err(format!("unexpected conventions {conventions}"));
    }

    let feature_type = text(dataset.global_attribute(FEATURE_TYPE)).ok_or("no featureType")?;
    if !feature_type.eq_ignore_ascii_case("timeSeries") {
        return Err(format!("unexpected feature type {feature_type}"));
    }

    let id_var = dataset
        .variables()
        .iter()
        .find(|var| text(var.attribute("cf_role")) == Some("timeseries_id"))
        .ok_or("no timeseries_id variable")?;
    let instance_dim = *dataset
        .dim_names(id_var)
        .first()
        .ok_or("scalar timeseries_id variable")?;

    for name in ["latitude", "longitude"] {
        let var = with_standard_name(dataset, name).ok_or(format!("no {name} variable"))?;
        if dataset.dim_names(var) != vec![instance_dim] {
            return Err(format!("{name} is not over {instance_dim}"));
        }
    }

    let ragged = dataset
        .variables()
        .iter()
        .find(|var| var.attribute(RAGGED_PARENT_INDEX).is_some());

    match ragged {
        Some(record) => check_ragged(dataset, record, instance_dim),
        None => check_multidimensional(dataset, instance_dim),
    }
}

fn check_ragged(
    dataset: &Dataset,
    record: &StoredVariable,
    instance_dim: &str,
) -> std::result::Result<(), String> {
    let parent = record
        .attribute(RAGGED_PARENT_INDEX)
        .and_then(Attribute::fields)
        .and_then(|fields| fields.first())
        .and_then(|field| field.as_text())
        .ok_or("malformed ragged parent index")?;
    if parent != instance_dim {
        return Err(format!("parent index points at {parent}"));
    }

    let dims = dataset.dim_names(record);
    if dims.len() != 1 {
        return Err(String::from("record variable is not one dimensional"));
    }

    let compound = match dataset.resolve(record.xtype()) {
        Some(TypeRef::Compound(compound)) => compound,
        _ => return Err(String::from("record variable is not a compound")),
    };
    for member in ["time", STATION_INDEX_MEMBER] {
        if compound.member(member).is_none() {
            return Err(format!("record has no {member} member"));
        }
    }

    if text(record.attribute(COORDINATES)).is_none() {
        return Err(String::from("record variable has no coordinates"));
    }

    Ok(())
}

fn check_multidimensional(
    dataset: &Dataset,
    instance_dim: &str,
) -> std::result::Result<(), String> {
    let time = with_standard_name(dataset, "time").ok_or("no time variable")?;
    let time_dims = dataset.dim_names(time);
    let time_dim = match time_dims.as_slice() {
        [dim] => *dim,
        _ => return Err(String::from("time is not one dimensional")),
    };

    let data_vars = dataset
        .variables()
        .iter()
        .filter(|var| dataset.dim_names(var) == vec![instance_dim, time_dim])
        .count();
    if data_vars == 0 {
        return Err(String::from("no data variables"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, NC_CHAR, NC_FLOAT, NC_GLOBAL, NC_INT, NC_NETCDF4};
    use crate::memory::MemoryDriver;

    #[test]
    fn test_classify_rejects_plain_grid() -> std::result::Result<(), crate::driver::Status> {
        let mut driver = MemoryDriver::new();
        let ncid = driver.create(std::path::Path::new("/memory/grid.nc"), NC_NETCDF4)?;
        let x = driver.def_dim(ncid, "x", 2)?;
        driver.def_var(ncid, "v", NC_FLOAT, &[x])?;
        driver.put_att_text(ncid, NC_GLOBAL, "Conventions", "CF-1.6")?;

        let dataset = driver.dataset(ncid).unwrap();
        assert_eq!(
            classify(dataset),
            FeatureType::Unknown(String::from("no featureType"))
        );

        driver.put_att_text(ncid, NC_GLOBAL, "CF:featureType", "timeSeries")?;
        let len = driver.def_dim(ncid, "len", 4)?;
        let id = driver.def_var(ncid, "id", NC_CHAR, &[x, len])?;
        driver.put_att_text(ncid, id, "cf_role", "timeseries_id")?;
        let lat = driver.def_var(ncid, "lat", NC_FLOAT, &[x])?;
        driver.put_att_text(ncid, lat, "standard_name", "latitude")?;
        let lon = driver.def_var(ncid, "lon", NC_FLOAT, &[x])?;
        driver.put_att_text(ncid, lon, "standard_name", "longitude")?;

        let dataset = driver.dataset(ncid).unwrap();
        assert_eq!(
            classify(dataset),
            FeatureType::Unknown(String::from("no time variable"))
        );

        let t = driver.def_dim(ncid, "t", 3)?;
        let time = driver.def_var(ncid, "time", NC_INT, &[t])?;
        driver.put_att_text(ncid, time, "standard_name", "time")?;
        driver.def_var(ncid, "temperature", NC_FLOAT, &[x, t])?;

        assert_eq!(classify(driver.dataset(ncid).unwrap()), FeatureType::Station);

        Ok(())
    }
}
