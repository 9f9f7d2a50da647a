use serde::{Deserialize, Serialize};

use crate::kind::ScalarKind;
use crate::value::Value;

/// The role a variable plays in a station time series.
///
/// Derived from the variable's name, never supplied by the caller.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Time,
    StationId,
    LatLon,
    Statistic,
}

impl Category {
    pub fn of(name: &str) -> Self {
        match name {
            "time" => Category::Time,
            "station_id" => Category::StationId,
            "lat" | "lon" => Category::LatLon,
            _ => Category::Statistic,
        }
    }
}

/// An insertion ordered attribute map.
///
/// Setting a name that is already present replaces its value without moving it.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set an attribute and return `self`, for building attribute maps inline.
    pub fn with<V: Into<Value>>(mut self, name: &str, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<V: Into<Value>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<S, V> FromIterator<(S, V)> for Attributes
where
    S: AsRef<str>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name.as_ref(), value);
        }

        attributes
    }
}

/// A named schema entry: one variable of the station time series.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VariableDef", into = "VariableDef")]
pub struct Variable {
    name: String,
    kind: ScalarKind,
    category: Category,
    attributes: Attributes,
}

/// Serialized form of `Variable`. The category is recomputed from the name on load.
#[derive(Serialize, Deserialize)]
struct VariableDef {
    name: String,
    kind: ScalarKind,
    #[serde(default)]
    attributes: Attributes,
}

impl From<VariableDef> for Variable {
    fn from(def: VariableDef) -> Self {
        Variable::new(def.name, def.kind, def.attributes)
    }
}

impl From<Variable> for VariableDef {
    fn from(variable: Variable) -> Self {
        VariableDef {
            name: variable.name,
            kind: variable.kind,
            attributes: variable.attributes,
        }
    }
}

impl Variable {
    /// Create a new variable descriptor.
    ///
    /// # Arguments
    ///
    /// * `name` - The variable name. `time`, `station_id`, `lat` and `lon` name the coordinate
    ///   variables of the series, every other name is a statistic.
    /// * `kind` - The scalar kind stored in the variable.
    /// * `attributes` - Per-variable attributes, written in the given order.
    ///
    pub fn new<S: Into<String>>(name: S, kind: ScalarKind, attributes: Attributes) -> Self {
        let name = name.into();
        let category = Category::of(&name);

        Self {
            name,
            kind,
            category,
            attributes,
        }
    }

    /// The time coordinate, stored as integer offsets in `units`.
    pub fn time(units: &str) -> Self {
        let attributes = Attributes::new()
            .with("units", units)
            .with("standard_name", "time");

        Self::new("time", ScalarKind::I32, attributes)
    }

    /// The station identifier. Its kind is the kind of the compact station index carried by
    /// records in the ragged layout.
    pub fn station_id() -> Self {
        let attributes = Attributes::new()
            .with("standard_name", "station_id")
            .with("cf_role", "timeseries_id");

        Self::new("station_id", ScalarKind::I32, attributes)
    }

    pub fn latitude() -> Self {
        // Unit labels for lat and lon are swapped relative to CF. Files already in circulation
        // carry these labels, so they are kept as is.
        let attributes = Attributes::new()
            .with("standard_name", "latitude")
            .with("units", "degrees_east");

        Self::new("lat", ScalarKind::F32, attributes)
    }

    pub fn longitude() -> Self {
        let attributes = Attributes::new()
            .with("standard_name", "longitude")
            .with("units", "degrees_north");

        Self::new("lon", ScalarKind::F32, attributes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Whether an observation value of this runtime kind may be stored in this variable. The
    /// kinds must be equal.
    pub fn accepts(&self, value: &Value) -> bool {
        self.kind == value.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_is_derived_from_name() {
        assert_eq!(Category::of("time"), Category::Time);
        assert_eq!(Category::of("station_id"), Category::StationId);
        assert_eq!(Category::of("lat"), Category::LatLon);
        assert_eq!(Category::of("lon"), Category::LatLon);
        assert_eq!(Category::of("latitude"), Category::Statistic);
        assert_eq!(Category::of("mean"), Category::Statistic);

        let var = Variable::new("lon", ScalarKind::F64, Attributes::new());
        assert_eq!(var.category(), Category::LatLon);
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut attributes = Attributes::new()
            .with("units", "days")
            .with("standard_name", "mean")
            .with("valid_min", 0_i16);
        attributes.insert("units", "hours");

        let names: Vec<&str> = attributes.names().collect();
        assert_eq!(names, vec!["units", "standard_name", "valid_min"]);
        assert_eq!(attributes.get("units"), Some(&Value::from("hours")));
        assert_eq!(attributes.get("valid_min"), Some(&Value::I16(0)));
        assert_eq!(attributes.get("missing"), None);
        assert_eq!(attributes.len(), 3);
    }

    #[test]
    fn test_attributes_from_iter() {
        let attributes: Attributes = vec![("a", 1_i32), ("b", 2), ("a", 3)].into_iter().collect();
        let pairs: Vec<(&str, &Value)> = attributes.iter().collect();
        assert_eq!(pairs, vec![("a", &Value::I32(3)), ("b", &Value::I32(2))]);
    }

    #[test]
    fn test_time_variable() {
        let var = Variable::time("days since 2011-01-01 00:00:00Z");
        assert_eq!(var.category(), Category::Time);
        assert_eq!(var.kind(), ScalarKind::I32);

        let attributes: Vec<(&str, &Value)> = var.attributes().iter().collect();
        assert_eq!(
            attributes,
            vec![
                ("units", &Value::from("days since 2011-01-01 00:00:00Z")),
                ("standard_name", &Value::from("time")),
            ]
        );
    }

    #[test]
    fn test_station_id_variable() {
        let var = Variable::station_id();
        assert_eq!(var.category(), Category::StationId);
        assert_eq!(var.kind(), ScalarKind::I32);
        assert_eq!(
            var.attributes().get("cf_role"),
            Some(&Value::from("timeseries_id"))
        );
    }

    #[test]
    fn test_lat_lon_units_are_swapped() {
        // Known defect carried over for compatibility: lat is labeled degrees_east and lon is
        // labeled degrees_north.
        let lat = Variable::latitude();
        assert_eq!(lat.category(), Category::LatLon);
        assert_eq!(lat.attributes().get("units"), Some(&Value::from("degrees_east")));

        let lon = Variable::longitude();
        assert_eq!(lon.category(), Category::LatLon);
        assert_eq!(lon.attributes().get("units"), Some(&Value::from("degrees_north")));
    }

    #[test]
    fn test_accepts() {
        let var = Variable::new("mean", ScalarKind::F32, Attributes::new());
        assert!(var.accepts(&Value::F32(1.0)));
        assert!(!var.accepts(&Value::F64(1.0)));
        assert!(!var.accepts(&Value::I32(1)));

        let var = Variable::new("flag", ScalarKind::Char, Attributes::new());
        assert!(var.accepts(&Value::Char(b'y')));
        assert!(!var.accepts(&Value::from("y")));

        let var = Variable::new("note", ScalarKind::String, Attributes::new());
        assert!(var.accepts(&Value::from("y")));
        assert!(!var.accepts(&Value::Char(b'y')));
    }

    #[test]
    fn test_serde_recomputes_category() {
        let json = r#"{
            "name": "station_id",
            "kind": "i32",
            "attributes": [["cf_role", {"kind": "text", "value": "timeseries_id"}]]
        }"#;
        let var: Variable = serde_json::from_str(json).unwrap();
        assert_eq!(var.category(), Category::StationId);
        assert_eq!(
            var.attributes().get("cf_role"),
            Some(&Value::from("timeseries_id"))
        );

        let round_trip: Variable =
            serde_json::from_str(&serde_json::to_string(&var).unwrap()).unwrap();
        assert_eq!(round_trip, var);
    }
}
