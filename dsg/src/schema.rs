//! The record schema of the ragged layout.
//!
//! A `RecordType` is an ordered list of variable descriptors. Every descriptor except `lat` and
//! `lon` becomes a member of one compound record type, packed in declaration order, so that a
//! single observation is one record. Per-variable attributes of the statistics cannot be attached
//! to compound members, so they are inverted: each attribute name becomes one compound valued
//! attribute on the record variable, with one member per variable that set it.
//!
use tracing::debug;

use crate::conventions::{
    COORDINATES, RAGGED_COORDINATES, RAGGED_PARENT_INDEX, RAGGED_PARENT_INDEX_TYPE, RECORD_TYPE,
    RECORD_VAR, STATION_DIM, STATION_INDEX_MEMBER,
};
use crate::driver::{DimId, Driver, NcId, Storage, VarId, XType, NC_STRING};
use crate::errors::{Error, Result, StatusExt};
use crate::kind::ScalarKind;
use crate::observation::Observation;
use crate::station::StationVariables;
use crate::value::Value;
use crate::variable::{Category, Variable};

/// Every value one attribute name takes across the statistics that set it.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBucket {
    kind: ScalarKind,
    homogeneous: bool,
    variables: Vec<String>,
    values: Vec<Value>,
}

impl AttributeBucket {
    fn new(variable: &str, value: &Value) -> Self {
        Self {
            kind: value.kind(),
            homogeneous: true,
            variables: vec![variable.to_string()],
            values: vec![value.clone()],
        }
    }

    fn push(&mut self, variable: &str, value: &Value) {
        if value.kind() != self.kind {
            self.homogeneous = false;
        }
        self.variables.push(variable.to_string());
        self.values.push(value.clone());
    }

    /// The kind of the first value. Only meaningful if the bucket is homogeneous.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Ordered variable descriptors forming one compound record.
///
#[derive(Debug, Clone)]
pub struct RecordType {
    variables: Vec<Variable>,
    compound_size: usize,
    inverted: Vec<(String, AttributeBucket)>,
    record_var: Option<VarId>,
}

impl RecordType {
    /// Create a schema holding the four coordinate descriptors. `time` and `station_id` are
    /// always the first two compound members.
    ///
    pub fn new(time_units: &str) -> Self {
        let mut record = Self {
            variables: vec![],
            compound_size: 0,
            inverted: vec![],
            record_var: None,
        };

        for variable in [
            Variable::time(time_units),
            Variable::station_id(),
            Variable::latitude(),
            Variable::longitude(),
        ] {
            record.push(variable);
        }

        record
    }

    /// Append a descriptor.
    ///
    /// Fails with `DuplicateVariable` if a descriptor of the same name is already present, and
    /// with `ReservedName` for `index`, the member name of the station index.
    ///
    pub fn add(&mut self, variable: Variable) -> Result<()> {
        if variable.name() == STATION_INDEX_MEMBER {
            return Err(Error::ReservedName(variable.name().to_string()));
        }
        if self.variable(variable.name()).is_some() {
            return Err(Error::DuplicateVariable(variable.name().to_string()));
        }
        self.push(variable);

        Ok(())
    }

    /// Chainable form of `add`
    pub fn with(mut self, variable: Variable) -> Result<Self> {
        self.add(variable)?;
        Ok(self)
    }

    fn push(&mut self, variable: Variable) {
        let category = variable.category();
        if category != Category::LatLon {
            self.compound_size += variable.kind().size();
        }

        if category != Category::LatLon && category != Category::StationId {
            for (name, value) in variable.attributes() {
                match self.inverted.iter_mut().find(|(key, _)| key == name) {
                    Some((_, bucket)) => bucket.push(variable.name(), value),
                    None => self
                        .inverted
                        .push((name.to_string(), AttributeBucket::new(variable.name(), value))),
                }
            }
        }

        self.variables.push(variable);
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.name() == name)
    }

    /// The statistic descriptors in declaration order. Observation values line up with these.
    pub fn statistics(&self) -> impl Iterator<Item = &Variable> {
        self.variables
            .iter()
            .filter(|variable| variable.category() == Category::Statistic)
    }

    /// The compound record members in packing order
    pub fn members(&self) -> impl Iterator<Item = &Variable> {
        self.variables
            .iter()
            .filter(|variable| variable.category() != Category::LatLon)
    }

    /// Width in bytes of one packed record
    pub fn compound_size(&self) -> usize {
        self.compound_size
    }

    /// Attribute name to the variables and values that set it, in first-seen order.
    pub fn inverted_attributes(&self) -> &[(String, AttributeBucket)] {
        &self.inverted
    }

    /// Id of the record variable, once `write_record_variable` has run.
    pub fn record_var(&self) -> Option<VarId> {
        self.record_var
    }

    /// Define the compound record type and insert each member at its offset.
    ///
    /// `station_id` is stored under the member name `index`, since a record carries the
    /// position of its station rather than the station's id. Its kind must be `i32`.
    ///
    pub fn write_compound<D>(&self, driver: &mut D, ncid: NcId) -> Result<XType>
    where
        D: Driver + ?Sized,
    {
        let xtype = driver
            .def_compound(ncid, self.compound_size, RECORD_TYPE)
            .status("nc_def_compound")?;

        let mut offset = 0;
        for member in self.members() {
            let name = match member.category() {
                Category::StationId => {
                    if member.kind() != ScalarKind::I32 {
                        return Err(Error::UnsupportedType(format!(
                            "station index must be int, not {}",
                            member.kind()
                        )));
                    }
                    STATION_INDEX_MEMBER
                }
                _ => member.name(),
            };

            driver
                .insert_compound(ncid, xtype, name, offset, member.kind().xtype())
                .status("nc_insert_compound")?;
            offset += member.kind().size();
        }

        debug!("defined {} of {} bytes", RECORD_TYPE, self.compound_size);

        Ok(xtype)
    }

    /// Define the `station_id`, `lat` and `lon` variables over the station dimension.
    ///
    pub(crate) fn write_station_variables<D>(
        &self,
        driver: &mut D,
        ncid: NcId,
        station_dim: DimId,
        id_len_dim: DimId,
    ) -> Result<StationVariables>
    where
        D: Driver + ?Sized,
    {
        StationVariables::define(driver, ncid, &self.variables, station_dim, id_len_dim)
    }

    /// Define the record variable over the observation dimension and attach its attributes.
    ///
    /// Fails with `UnsupportedType` before anything is defined if any inverted attribute mixes
    /// value kinds.
    ///
    pub fn write_record_variable<D>(
        &mut self,
        driver: &mut D,
        ncid: NcId,
        obs_dim: DimId,
        compound_type: XType,
        chunking: bool,
    ) -> Result<VarId>
    where
        D: Driver + ?Sized,
    {
        if let Some((name, _)) = self
            .inverted
            .iter()
            .find(|(_, bucket)| !bucket.is_homogeneous())
        {
            return Err(Error::UnsupportedType(format!(
                "attribute '{name}' mixes value kinds across variables"
            )));
        }

        let varid = driver
            .def_var(ncid, RECORD_VAR, compound_type, &[obs_dim])
            .status("nc_def_var")?;
        driver
            .put_att_text(ncid, varid, COORDINATES, RAGGED_COORDINATES)
            .status("nc_put_att")?;

        for (name, bucket) in &self.inverted {
            let width = bucket.kind.size();
            let xtype = driver
                .def_compound(
                    ncid,
                    width * bucket.variables.len(),
                    &format!("{RECORD_VAR}_{name}_type"),
                )
                .status("nc_def_compound")?;
            for (i, variable) in bucket.variables.iter().enumerate() {
                driver
                    .insert_compound(ncid, xtype, variable, i * width, bucket.kind.xtype())
                    .status("nc_insert_compound")?;
            }
            driver
                .put_att_compound(ncid, varid, name, xtype, &bucket.values)
                .status("nc_put_att")?;
        }

        let xtype = driver
            .def_compound(ncid, ScalarKind::String.size(), RAGGED_PARENT_INDEX_TYPE)
            .status("nc_def_compound")?;
        driver
            .insert_compound(ncid, xtype, STATION_INDEX_MEMBER, 0, NC_STRING)
            .status("nc_insert_compound")?;
        driver
            .put_att_compound(
                ncid,
                varid,
                RAGGED_PARENT_INDEX,
                xtype,
                &[Value::from(STATION_DIM)],
            )
            .status("nc_put_att")?;

        if chunking {
            driver
                .def_var_chunking(ncid, varid, Storage::Chunked, &[1])
                .status("nc_def_var_chunking")?;
        }

        self.record_var = Some(varid);

        Ok(varid)
    }

    /// Whether `obs` has one slot per statistic, each of the declared kind or missing.
    pub fn is_observation_valid(&self, obs: &Observation) -> bool {
        obs.matches(self.statistics())
    }

    /// Pack `obs` into one native byte order record of `compound_size` bytes: the time offset,
    /// the station index, then each statistic. Missing values are packed as the statistic's
    /// fill value.
    ///
    pub fn pack(&self, obs: &Observation) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.compound_size);
        Value::I32(obs.time_offset).write_ne(&mut buffer)?;
        Value::I32(obs.station_index).write_ne(&mut buffer)?;

        for (statistic, value) in self.statistics().zip(&obs.values) {
            match value {
                Some(value) => value.write_ne(&mut buffer)?,
                None if statistic.kind() == ScalarKind::String => {
                    // Fill for an out of line string is a null pointer
                    buffer.resize(buffer.len() + ScalarKind::String.size(), 0);
                }
                None => statistic.kind().fill_value().write_ne(&mut buffer)?,
            }
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Attributes;

    fn days() -> Attributes {
        Attributes::new().with("units", "days")
    }

    #[test]
    fn test_new_record_type() {
        let record = RecordType::new("days since 2011-01-01");
        let names: Vec<&str> = record.variables().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["time", "station_id", "lat", "lon"]);

        // time and station index are members, lat and lon are not
        assert_eq!(record.compound_size(), 8);
        let members: Vec<&str> = record.members().map(|v| v.name()).collect();
        assert_eq!(members, vec!["time", "station_id"]);

        // Only the time attributes are inverted
        let attributes: Vec<&str> = record
            .inverted_attributes()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(attributes, vec!["units", "standard_name"]);
        assert_eq!(record.record_var(), None);
    }

    #[test]
    fn test_compound_size() -> Result<()> {
        let mut record = RecordType::new("days");
        record.add(Variable::new("mean", ScalarKind::F32, days()))?;
        record.add(Variable::new("min", ScalarKind::I32, days()))?;
        record.add(Variable::new("count", ScalarKind::I16, Attributes::new()))?;
        record.add(Variable::new("total", ScalarKind::F64, Attributes::new()))?;
        record.add(Variable::new("flag", ScalarKind::Char, Attributes::new()))?;

        let expected: usize = record.members().map(|v| v.kind().size()).sum();
        assert_eq!(expected, 4 + 4 + 4 + 4 + 2 + 8 + 1);
        assert_eq!(record.compound_size(), expected);

        let statistics: Vec<&str> = record.statistics().map(|v| v.name()).collect();
        assert_eq!(statistics, vec!["mean", "min", "count", "total", "flag"]);

        Ok(())
    }

    #[test]
    fn test_duplicate_variable() -> Result<()> {
        let mut record = RecordType::new("days").with(Variable::new("mean", ScalarKind::F32, days()))?;
        assert!(matches!(
            record.add(Variable::new("mean", ScalarKind::F64, days())),
            Err(Error::DuplicateVariable(name)) if name == "mean"
        ));
        assert!(matches!(
            record.add(Variable::latitude()),
            Err(Error::DuplicateVariable(name)) if name == "lat"
        ));
        assert_eq!(record.statistics().count(), 1);

        Ok(())
    }

    #[test]
    fn test_attribute_inversion() -> Result<()> {
        let record = RecordType::new("days")
            .with(Variable::new(
                "mean",
                ScalarKind::F32,
                Attributes::new().with("units", "K").with("valid_min", 0.0_f32),
            ))?
            .with(Variable::new("max", ScalarKind::F32, Attributes::new().with("units", "C")))?;

        let inverted = record.inverted_attributes();
        assert_eq!(inverted.len(), 3);

        let (name, units) = &inverted[0];
        assert_eq!(name, "units");
        assert_eq!(units.variables(), &["time", "mean", "max"]);
        assert_eq!(
            units.values(),
            &[Value::from("days"), Value::from("K"), Value::from("C")]
        );
        assert_eq!(units.kind(), ScalarKind::String);
        assert!(units.is_homogeneous());

        let (name, standard_name) = &inverted[1];
        assert_eq!(name, "standard_name");
        assert_eq!(standard_name.variables(), &["time"]);

        let (name, valid_min) = &inverted[2];
        assert_eq!(name, "valid_min");
        assert_eq!(valid_min.variables(), &["mean"]);
        assert_eq!(valid_min.kind(), ScalarKind::F32);

        Ok(())
    }

    #[test]
    fn test_mixed_kind_bucket() -> Result<()> {
        let record = RecordType::new("days")
            .with(Variable::new(
                "mean",
                ScalarKind::F32,
                Attributes::new().with("valid_min", 0.0_f32),
            ))?
            .with(Variable::new(
                "count",
                ScalarKind::I32,
                Attributes::new().with("valid_min", 0_i32),
            ))?;

        let (_, bucket) = &record.inverted_attributes()[2];
        assert!(!bucket.is_homogeneous());

        Ok(())
    }

    #[test]
    fn test_is_observation_valid() -> Result<()> {
        let record = RecordType::new("days")
            .with(Variable::new("mean", ScalarKind::F32, days()))?
            .with(Variable::new("min", ScalarKind::I32, days()))?;

        assert!(record.is_observation_valid(&Observation::with_missing(
            0,
            0,
            vec![Some(Value::F32(1.0)), Some(Value::I32(1))]
        )));
        assert!(record.is_observation_valid(&Observation::with_missing(
            0,
            0,
            vec![None, Some(Value::I32(1))]
        )));
        assert!(!record.is_observation_valid(&Observation::new(0, 0, [1_i32, 1])));
        assert!(!record.is_observation_valid(&Observation::new(0, 0, [1.0_f32])));

        Ok(())
    }

    #[test]
    fn test_text_does_not_fit_char() -> Result<()> {
        let record = RecordType::new("days")
            .with(Variable::new("flag", ScalarKind::Char, Attributes::new()))?;

        assert!(record.is_observation_valid(&Observation::with_missing(
            0,
            0,
            vec![Some(Value::Char(b'y'))]
        )));
        assert!(!record.is_observation_valid(&Observation::new(0, 0, ["y"])));

        Ok(())
    }

    #[test]
    fn test_index_is_reserved() {
        let mut record = RecordType::new("days");
        assert!(matches!(
            record.add(Variable::new("index", ScalarKind::I32, days())),
            Err(Error::ReservedName(name)) if name == "index"
        ));
        assert_eq!(record.statistics().count(), 0);
        assert_eq!(record.compound_size(), 8);
    }

    #[test]
    fn test_pack() -> Result<()> {
        let record = RecordType::new("days")
            .with(Variable::new("mean", ScalarKind::F32, days()))?
            .with(Variable::new("count", ScalarKind::I16, days()))?
            .with(Variable::new("flag", ScalarKind::Char, days()))?;

        let obs = Observation::with_missing(
            7,
            1,
            vec![Some(Value::F32(2.5)), None, Some(Value::Char(b'y'))],
        );
        let buffer = record.pack(&obs)?;
        assert_eq!(buffer.len(), record.compound_size());

        let mut offset = 0;
        let mut fields = vec![];
        for member in record.members() {
            fields.push(Value::read_ne(member.kind(), &buffer[offset..]).unwrap());
            offset += member.kind().size();
        }
        assert_eq!(
            fields,
            vec![
                Value::I32(7),
                Value::I32(1),
                Value::F32(2.5),
                Value::I16(crate::kind::NC_FILL_SHORT),
                Value::Char(b'y'),
            ]
        );

        Ok(())
    }

    #[test]
    fn test_pack_rejects_text() -> Result<()> {
        let record = RecordType::new("days").with(Variable::new("mean", ScalarKind::F32, days()))?;
        let obs = Observation::new(0, 0, ["hot"]);
        assert!(matches!(record.pack(&obs), Err(Error::UnsupportedType(_))));

        Ok(())
    }
}
