//! Per-member metadata and its positional aggregation.
//!
//! Each member dataset reports a flat mapping of scalar descriptive fields
//! (time, redshift, box size, code name, ...). A series aggregates those
//! mappings by member position; the aggregate is what the metadata cache
//! persists and what nearest-match selection searches.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar metadata value.
///
/// Integers and floats are *numeric* and take part in nearest-match
/// selection; strings and booleans are *categorical* and must match exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    /// Whether this value takes part in numeric nearest-match selection.
    pub fn is_numeric(&self) -> bool {
        matches!(self, MetadataValue::Integer(_) | MetadataValue::Float(_))
    }

    /// Numeric view of the value, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(v) => Some(*v as f64),
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(v) => write!(f, "{}", v),
            MetadataValue::Integer(v) => write!(f, "{}", v),
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Integer(v as i64)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Text(v)
    }
}

/// Metadata of a single member: field name to scalar.
pub type MemberMetadata = BTreeMap<String, MetadataValue>;

/// Aggregated metadata of a series, keyed by member position.
///
/// Keys are always exactly `0..len()`. Serialized as a JSON object keyed by
/// the stringified position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesMetadata {
    entries: BTreeMap<usize, MemberMetadata>,
}

impl SeriesMetadata {
    /// Build from per-member entries in member order.
    pub fn from_members(members: impl IntoIterator<Item = MemberMetadata>) -> Self {
        Self {
            entries: members.into_iter().enumerate().collect(),
        }
    }

    /// Build from an explicitly keyed map.
    ///
    /// Returns `None` unless the keys are exactly `0..N-1`.
    pub fn from_entries(entries: BTreeMap<usize, MemberMetadata>) -> Option<Self> {
        let metadata = Self { entries };
        metadata.is_contiguous().then_some(metadata)
    }

    /// Whether the positional keys are exactly `0..len()`.
    pub fn is_contiguous(&self) -> bool {
        self.entries.keys().enumerate().all(|(i, k)| i == *k)
    }

    /// Number of members described.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no members are described.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata of the member at `index`.
    pub fn get(&self, index: usize) -> Option<&MemberMetadata> {
        self.entries.get(&index)
    }

    /// Iterate `(position, metadata)` in member order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &MemberMetadata)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Values of `field` across all members, `None` where a member lacks it.
    pub fn field_values(&self, field: &str) -> Vec<Option<&MetadataValue>> {
        self.entries.values().map(|m| m.get(field)).collect()
    }

    /// Sorted union of field names present on any member.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .values()
            .flat_map(|m| m.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(pairs: &[(&str, MetadataValue)]) -> MemberMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_members_assigns_positions() {
        let md = SeriesMetadata::from_members(vec![
            member(&[("redshift", 2.0_f64.into())]),
            member(&[("redshift", 1.0_f64.into())]),
        ]);

        assert_eq!(md.len(), 2);
        assert!(md.is_contiguous());
        assert_eq!(md.get(1).unwrap()["redshift"], MetadataValue::Float(1.0));
    }

    #[test]
    fn test_from_entries_rejects_gaps() {
        let mut entries = BTreeMap::new();
        entries.insert(0, MemberMetadata::new());
        entries.insert(2, MemberMetadata::new());

        assert!(SeriesMetadata::from_entries(entries).is_none());
    }

    #[test]
    fn test_json_keys_are_stringified_positions() {
        let md = SeriesMetadata::from_members(vec![
            member(&[("time", 0.25_f64.into()), ("code", "arepo".into())]),
            member(&[("snapnum", 7_i64.into()), ("cosmological", true.into())]),
        ]);

        let json = serde_json::to_string(&md).unwrap();
        assert!(json.starts_with("{\"0\":"));
        assert!(json.contains("\"1\":"));

        let back: SeriesMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, md);
        assert_eq!(back.get(1).unwrap()["snapnum"], MetadataValue::Integer(7));
        assert_eq!(back.get(0).unwrap()["time"], MetadataValue::Float(0.25));
    }

    #[test]
    fn test_untagged_float_with_integral_value_stays_float() {
        let value: MetadataValue = serde_json::from_str("1.0").unwrap();
        assert_eq!(value, MetadataValue::Float(1.0));

        let value: MetadataValue = serde_json::from_str("1").unwrap();
        assert_eq!(value, MetadataValue::Integer(1));
    }

    #[test]
    fn test_numeric_classification() {
        assert!(MetadataValue::from(3_i64).is_numeric());
        assert!(MetadataValue::from(0.5_f64).is_numeric());
        assert!(!MetadataValue::from("z").is_numeric());
        assert!(!MetadataValue::from(false).is_numeric());
        assert_eq!(MetadataValue::from(3_i64).as_f64(), Some(3.0));
        assert_eq!(MetadataValue::from("z").as_str(), Some("z"));
    }

    #[test]
    fn test_field_names_union() {
        let md = SeriesMetadata::from_members(vec![
            member(&[("a", 1_i64.into())]),
            member(&[("b", 1_i64.into()), ("a", 2_i64.into())]),
        ]);

        assert_eq!(md.field_names(), vec!["a", "b"]);
        assert_eq!(md.field_values("b"), vec![None, Some(&MetadataValue::Integer(1))]);
    }
}
