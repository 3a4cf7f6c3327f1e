//! Feature Vector and Matrix

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_window::SeriesKey;
use std::collections::BTreeMap;

/// Named numeric outputs for one window.
///
/// Every stored value is finite: NaN and ±∞ are replaced with 0.0 on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature, sanitising non-finite values to zero
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Merge another partial vector into this one
    pub fn extend(&mut self, other: FeatureVector) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Values laid out in `columns` order; absent columns read as 0.0
    pub fn reindex(&self, columns: &[String]) -> Vec<f64> {
        columns
            .iter()
            .map(|c| self.values.get(c).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

/// Window identity attached to each matrix row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMeta {
    pub key: SeriesKey,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Batch feature matrix with stable, named columns.
///
/// Columns are the sorted union of every row's feature names; a row missing
/// a column reads 0.0 there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    meta: Vec<RowMeta>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn from_vectors(vectors: Vec<(RowMeta, FeatureVector)>) -> Self {
        let mut names: Vec<String> = vectors
            .iter()
            .flat_map(|(_, v)| v.names().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();

        let mut meta = Vec::with_capacity(vectors.len());
        let mut rows = Vec::with_capacity(vectors.len());
        for (row_meta, vector) in vectors {
            rows.push(vector.reindex(&names));
            meta.push(row_meta);
        }

        Self {
            columns: names,
            meta,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn meta(&self) -> &[RowMeta] {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// One column's values across every row
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Rows `range`, keeping column names
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self {
            columns: self.columns.clone(),
            meta: self.meta[range.clone()].to_vec(),
            rows: self.rows[range].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RowMeta {
        RowMeta {
            key: SeriesKey::new("a", "x"),
            window_start: DateTime::<Utc>::UNIX_EPOCH,
            window_end: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_non_finite_sanitised() {
        let mut v = FeatureVector::new();
        v.insert("nan", f64::NAN);
        v.insert("inf", f64::NEG_INFINITY);
        v.insert("ok", 2.5);
        assert_eq!(v.get("nan"), Some(0.0));
        assert_eq!(v.get("inf"), Some(0.0));
        assert_eq!(v.get("ok"), Some(2.5));
    }

    #[test]
    fn test_reindex_fills_missing() {
        let mut v = FeatureVector::new();
        v.insert("b", 2.0);
        v.insert("a", 1.0);
        let columns = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(v.reindex(&columns), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_matrix_union_of_columns() {
        let mut first = FeatureVector::new();
        first.insert("rms", 1.0);
        let mut second = FeatureVector::new();
        second.insert("mean", 3.0);
        second.insert("rms", 2.0);

        let matrix = FeatureMatrix::from_vectors(vec![(meta(), first), (meta(), second)]);
        assert_eq!(matrix.columns(), &["mean".to_string(), "rms".to_string()]);
        assert_eq!(matrix.rows()[0], vec![0.0, 1.0]);
        assert_eq!(matrix.column("rms"), Some(vec![1.0, 2.0]));
        assert_eq!(matrix.slice(1..2).len(), 1);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut v = FeatureVector::new();
        v.insert("rms", 1.5);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"rms":1.5}"#);
    }
}
