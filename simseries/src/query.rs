//! Nearest-match member selection over aggregated metadata.
//!
//! A [`Query`] names fields and desired values. Categorical values (text,
//! booleans) must match exactly; numeric values select the member whose
//! field is closest to the target. When several numeric fields are given,
//! they must all prefer the same member.

use crate::error::{Result, SeriesError};
use crate::metadata::{MetadataValue, SeriesMetadata};

/// Desired value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Select the member closest to this value.
    Numeric(f64),

    /// Keep only members whose field equals this value.
    Categorical(MetadataValue),
}

impl Criterion {
    fn accepts(&self, observed: &MetadataValue) -> bool {
        match self {
            Criterion::Numeric(_) => observed.is_numeric(),
            Criterion::Categorical(expected) => expected == observed,
        }
    }
}

impl From<MetadataValue> for Criterion {
    fn from(value: MetadataValue) -> Self {
        match value.as_f64() {
            Some(v) => Criterion::Numeric(v),
            None => Criterion::Categorical(value),
        }
    }
}

impl From<f64> for Criterion {
    fn from(v: f64) -> Self {
        Criterion::Numeric(v)
    }
}

impl From<i64> for Criterion {
    fn from(v: i64) -> Self {
        Criterion::Numeric(v as f64)
    }
}

impl From<i32> for Criterion {
    fn from(v: i32) -> Self {
        Criterion::Numeric(v as f64)
    }
}

impl From<&str> for Criterion {
    fn from(v: &str) -> Self {
        Criterion::Categorical(MetadataValue::from(v))
    }
}

impl From<String> for Criterion {
    fn from(v: String) -> Self {
        Criterion::Categorical(MetadataValue::Text(v))
    }
}

impl From<bool> for Criterion {
    fn from(v: bool) -> Self {
        Criterion::Categorical(MetadataValue::Bool(v))
    }
}

/// A selection request.
///
/// Criteria keep insertion order; a field given twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    criteria: Vec<(String, Criterion)>,
    tolerance: Option<f64>,
}

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Criterion>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.criteria.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.criteria.push((field, value)),
        }
        self
    }

    /// Reject matches whose relative deviation from a numeric target
    /// exceeds `rel_tol`.
    ///
    /// Without a tolerance the closest member is always accepted.
    pub fn with_tolerance(mut self, rel_tol: f64) -> Self {
        self.tolerance = Some(rel_tol);
        self
    }

    /// The configured relative tolerance.
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Criteria in insertion order.
    pub fn criteria(&self) -> &[(String, Criterion)] {
        &self.criteria
    }

    /// Whether no criteria were given.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    fn field_names(&self) -> Vec<String> {
        self.criteria.iter().map(|(f, _)| f.clone()).collect()
    }
}

/// Select the member best matching `query`.
///
/// 1. A member is a candidate if it has every requested field, each
///    categorical value matches exactly and each numeric field holds a
///    number.
/// 2. For each numeric field the candidate with the smallest absolute
///    difference to the target is chosen; equidistant candidates resolve to
///    the lowest member index.
/// 3. All numeric fields must choose the same member. With no numeric
///    criteria the first candidate is selected.
///
/// # Errors
///
/// - [`SeriesError::InvalidQuery`] if the query has no criteria
/// - [`SeriesError::NonFiniteTarget`] if a numeric target is NaN or infinite
/// - [`SeriesError::NoMatch`] if no member is a candidate
/// - [`SeriesError::AmbiguousSelection`] if numeric fields disagree
/// - [`SeriesError::OutOfTolerance`] if a tolerance is set and exceeded
pub fn select_index(metadata: &SeriesMetadata, query: &Query) -> Result<usize> {
    if query.is_empty() {
        return Err(SeriesError::InvalidQuery);
    }

    for (field, criterion) in &query.criteria {
        if let Criterion::Numeric(target) = criterion {
            if !target.is_finite() {
                return Err(SeriesError::NonFiniteTarget {
                    field: field.clone(),
                    value: *target,
                });
            }
        }
    }

    let candidates: Vec<usize> = metadata
        .iter()
        .filter(|(_, member)| {
            query.criteria.iter().all(|(field, criterion)| {
                member
                    .get(field)
                    .is_some_and(|observed| criterion.accepts(observed))
            })
        })
        .map(|(index, _)| index)
        .collect();

    if candidates.is_empty() {
        return Err(SeriesError::NoMatch {
            fields: query.field_names(),
        });
    }

    let numeric: Vec<(&str, f64)> = query
        .criteria
        .iter()
        .filter_map(|(field, criterion)| match criterion {
            Criterion::Numeric(target) => Some((field.as_str(), *target)),
            Criterion::Categorical(_) => None,
        })
        .collect();

    if numeric.is_empty() {
        return Ok(candidates[0]);
    }

    let mut preferred = Vec::with_capacity(numeric.len());
    for (field, target) in &numeric {
        let values = observed_values(metadata, &candidates, field);
        preferred.push(candidates[closest(&values, *target)]);
    }

    let selected = preferred[0];
    if preferred.iter().any(|&p| p != selected) {
        return Err(SeriesError::AmbiguousSelection {
            fields: numeric.iter().map(|(f, _)| f.to_string()).collect(),
            preferred,
        });
    }

    if let Some(tolerance) = query.tolerance {
        check_tolerance(metadata, selected, &numeric, tolerance)?;
    }

    tracing::debug!(
        index = selected,
        candidates = candidates.len(),
        "Selected series member"
    );
    Ok(selected)
}

/// Values of `field` for the given candidates, in candidate order.
fn observed_values(metadata: &SeriesMetadata, candidates: &[usize], field: &str) -> Vec<f64> {
    candidates
        .iter()
        .map(|&index| {
            metadata
                .get(index)
                .and_then(|m| m.get(field))
                .and_then(MetadataValue::as_f64)
                .unwrap_or(f64::NAN)
        })
        .collect()
}

/// Position of the value closest to `target`; the first one wins ties.
///
/// `values` is never empty here. NaN distances never win.
fn closest(values: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, value) in values.iter().enumerate() {
        let distance = (value - target).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

fn check_tolerance(
    metadata: &SeriesMetadata,
    selected: usize,
    numeric: &[(&str, f64)],
    tolerance: f64,
) -> Result<()> {
    for (field, target) in numeric {
        let observed = metadata
            .get(selected)
            .and_then(|m| m.get(*field))
            .and_then(MetadataValue::as_f64)
            .unwrap_or(f64::NAN);

        let relative = (observed - target).abs() / target.abs().max(f64::EPSILON);
        if relative.is_nan() || relative > tolerance {
            return Err(SeriesError::OutOfTolerance {
                field: field.to_string(),
                requested: *target,
                observed,
                tolerance,
            });
        }
    }
    Ok(())
}
