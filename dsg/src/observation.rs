use serde::{Deserialize, Serialize};

use crate::value::Value;
use crate::variable::Variable;

/// One measurement event at one station and one time.
///
/// `values` holds one slot per statistic variable, in declaration order. A `None` slot is a
/// missing value.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time_offset: i32,
    pub station_index: i32,
    pub values: Vec<Option<Value>>,
}

impl Observation {
    pub fn new<I, V>(time_offset: i32, station_index: i32, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            time_offset,
            station_index,
            values: values.into_iter().map(|value| Some(value.into())).collect(),
        }
    }

    /// Create an observation in which some slots may be missing.
    pub fn with_missing(time_offset: i32, station_index: i32, values: Vec<Option<Value>>) -> Self {
        Self {
            time_offset,
            station_index,
            values,
        }
    }

    /// Whether this observation fits `statistics`: one slot per statistic, and every present
    /// value of a kind the statistic accepts. Missing slots match any statistic.
    ///
    pub fn matches<'a, I>(&self, statistics: I) -> bool
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        let mut values = self.values.iter();
        for statistic in statistics {
            match values.next() {
                None => return false,
                Some(None) => continue,
                Some(Some(value)) => {
                    if !statistic.accepts(value) {
                        return false;
                    }
                }
            }
        }

        values.next().is_none()
    }

    /// Whether any present value is a string
    pub fn has_text(&self) -> bool {
        self.values
            .iter()
            .flatten()
            .any(|value| matches!(value, Value::Text(_)))
    }

    /// `(station_index, time_offset)` as array indices, or `None` if either is negative.
    pub(crate) fn indices(&self) -> Option<(usize, usize)> {
        let station = usize::try_from(self.station_index).ok()?;
        let time = usize::try_from(self.time_offset).ok()?;

        Some((station, time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ScalarKind;
    use crate::variable::Attributes;

    fn statistics() -> Vec<Variable> {
        vec![
            Variable::new("mean", ScalarKind::F32, Attributes::new()),
            Variable::new("count", ScalarKind::I32, Attributes::new()),
        ]
    }

    #[test]
    fn test_matches() {
        let statistics = statistics();
        let obs = Observation::with_missing(
            0,
            0,
            vec![Some(Value::F32(1.5)), Some(Value::I32(3))],
        );
        assert!(obs.matches(&statistics));

        // Wrong kind in second slot
        let obs = Observation::new(0, 0, [1.5_f32, 3.0]);
        assert!(!obs.matches(&statistics));

        // Too few and too many slots
        let obs = Observation::new(0, 0, [1.5_f32]);
        assert!(!obs.matches(&statistics));
        let obs = Observation::with_missing(
            0,
            0,
            vec![Some(Value::F32(1.5)), Some(Value::I32(3)), None],
        );
        assert!(!obs.matches(&statistics));
    }

    #[test]
    fn test_missing_slots_consume_a_position() {
        let statistics = statistics();
        let obs = Observation::with_missing(0, 0, vec![None, Some(Value::I32(3))]);
        assert!(obs.matches(&statistics));

        let obs = Observation::with_missing(0, 0, vec![None, Some(Value::F32(3.0))]);
        assert!(!obs.matches(&statistics));

        let obs = Observation::with_missing(0, 0, vec![None]);
        assert!(!obs.matches(&statistics));
    }

    #[test]
    fn test_has_text() {
        assert!(!Observation::new(0, 0, [1_i32, 2]).has_text());
        assert!(Observation::with_missing(0, 0, vec![None, Some(Value::from("x"))]).has_text());
    }

    #[test]
    fn test_indices() {
        assert_eq!(Observation::new(3, 1, [1_i32]).indices(), Some((1, 3)));
        assert_eq!(Observation::new(-1, 1, [1_i32]).indices(), None);
        assert_eq!(Observation::new(0, -2, [1_i32]).indices(), None);
    }
}
