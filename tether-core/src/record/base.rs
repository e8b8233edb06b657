//! Key-value records written at every step and at the end of an episode.
use crate::error::TetherError;
use chrono::prelude::{DateTime, Local};
use std::collections::HashMap;

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, e.g., a reward.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array of floating-point values, e.g., a flattened observation.
    Array1(Vec<f32>),

    /// A text value, e.g., the outcome of an episode.
    String(String),
}

/// A container for storing key-value pairs of various data types.
///
/// ```rust
/// use tether_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("reward", 1.5);
/// record.insert("outcome", RecordValue::String("terminated".to_string()));
///
/// assert_eq!(record.get_scalar("reward").unwrap(), 1.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, TetherError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(TetherError::RecordValueTypeError("Scalar".to_string())),
            None => Err(TetherError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, TetherError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(TetherError::RecordValueTypeError("Array1".to_string())),
            None => Err(TetherError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, TetherError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(TetherError::RecordValueTypeError("String".to_string())),
            None => Err(TetherError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let record = Record::from_slice(&[
            ("reward", RecordValue::Scalar(2.0)),
            ("obs", RecordValue::Array1(vec![1.0, 2.0])),
            ("outcome", RecordValue::String("truncated".to_string())),
        ]);

        assert_eq!(record.get_scalar("reward").unwrap(), 2.0);
        assert_eq!(record.get_array1("obs").unwrap(), vec![1.0, 2.0]);
        assert_eq!(record.get_string("outcome").unwrap(), "truncated");
        assert_eq!(
            record.get_scalar("obs"),
            Err(TetherError::RecordValueTypeError("Scalar".to_string()))
        );
        assert_eq!(
            record.get_scalar("missing"),
            Err(TetherError::RecordKeyError("missing".to_string()))
        );
    }
}
