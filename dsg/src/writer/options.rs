use serde::{Deserialize, Serialize};

/// Text attributes attached to the file as a whole, kept in insertion order.
///
/// Setting a name that is already present replaces its value in place.
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalAttributes(Vec<(String, String)>);

impl GlobalAttributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with<V: Into<String>>(mut self, name: &str, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<V: Into<String>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for GlobalAttributes
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attributes = GlobalAttributes::new();
        for (name, value) in iter {
            attributes.insert(name.as_ref(), value);
        }

        attributes
    }
}

/// The time coordinate of a multidimensional file: a units string and the offsets, in those
/// units, of every time step.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAxis {
    pub units: String,
    pub offsets: Vec<i32>,
}

impl TimeAxis {
    pub fn new<S: Into<String>>(units: S, offsets: Vec<i32>) -> Self {
        Self {
            units: units.into(),
            offsets,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDimensionalOptions {
    #[serde(default)]
    pub global_attributes: GlobalAttributes,

    /// Define the `station` dimension as unlimited, so that stations can be appended later.
    #[serde(default)]
    pub unlimited_station: bool,
}

impl MultiDimensionalOptions {
    pub fn global_attributes(mut self, attributes: GlobalAttributes) -> Self {
        self.global_attributes = attributes;
        self
    }

    pub fn unlimited_station(mut self, unlimited: bool) -> Self {
        self.unlimited_station = unlimited;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaggedOptions {
    #[serde(default)]
    pub global_attributes: GlobalAttributes,

    /// Store the record variable in chunks of one record
    #[serde(default)]
    pub chunking: bool,
}

impl RaggedOptions {
    pub fn global_attributes(mut self, attributes: GlobalAttributes) -> Self {
        self.global_attributes = attributes;
        self
    }

    pub fn chunking(mut self, chunking: bool) -> Self {
        self.chunking = chunking;
        self
    }
}
