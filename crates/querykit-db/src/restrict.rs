//! Allow-list restriction of records to a required column set.
//!
//! Repositories use [`restrict`] to build insert/update value sets from an
//! arbitrary input record, keeping exactly the writable columns and nothing
//! else. A column that is missing from the record is an error; there is no
//! best-effort extraction.

use std::collections::BTreeMap;

use querykit_common::{Error, Result};
use serde::Serialize;

use crate::value::{Params, Value};

/// An arbitrary column → value record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a record from any value that serializes to a JSON object.
    ///
    /// Fields serialized as `null` are present with [`Value::Null`]; fields
    /// skipped by serde are absent.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_value(value)
            .map_err(|e| Error::Validation(format!("record serialization failed: {e}")))?;
        match json {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(Error::Validation(format!(
                "record must serialize to an object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// The result of [`restrict`]: exactly the requested columns, in request
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestrictedRecord(Vec<(String, Value)>);

impl RestrictedRecord {
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl IntoIterator for RestrictedRecord {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Column names become parameter names.
impl From<RestrictedRecord> for Params {
    fn from(record: RestrictedRecord) -> Self {
        record.into_iter().collect()
    }
}

/// Copy exactly `columns` out of `record`.
///
/// Fails with [`Error::MissingColumn`] naming the first absent column; no
/// partial result is returned. A column listed twice appears once, at its
/// first position.
pub fn restrict(record: &Record, columns: &[&str]) -> Result<RestrictedRecord> {
    let mut out: Vec<(String, Value)> = Vec::with_capacity(columns.len());
    for &column in columns {
        if out.iter().any(|(c, _)| c == column) {
            continue;
        }
        let value = record
            .get(column)
            .ok_or_else(|| Error::missing_column(column))?;
        out.push((column.to_string(), value.clone()));
    }
    Ok(RestrictedRecord(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn keeps_exactly_requested_columns() {
        let record = Record::new()
            .with("id", "x")
            .with("name", "Ada")
            .with("age", 36)
            .with("created_at", "now");

        let restricted = restrict(&record, &["age", "name"]).unwrap();
        let columns: Vec<_> = restricted.columns().collect();
        assert_eq!(columns, ["age", "name"]);
        assert_eq!(restricted.get("name"), Some(&Value::Text("Ada".into())));
        assert_eq!(restricted.get("age"), Some(&Value::Integer(36)));
        assert!(restricted.get("id").is_none());
    }

    #[test]
    fn deterministic_across_calls() {
        let record = Record::new().with("a", 1).with("b", 2).with("c", 3);
        let first = restrict(&record, &["c", "a"]).unwrap();
        let second = restrict(&record, &["c", "a"]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_column_named() {
        let record = Record::new().with("a", 1);
        assert_matches!(
            restrict(&record, &["a", "b"]),
            Err(Error::MissingColumn { column }) if column == "b"
        );
    }

    #[test]
    fn null_counts_as_present() {
        let record = Record::new().with("email", Value::Null);
        let restricted = restrict(&record, &["email"]).unwrap();
        assert_eq!(restricted.get("email"), Some(&Value::Null));
    }

    #[test]
    fn empty_column_list() {
        let record = Record::new().with("a", 1);
        assert!(restrict(&record, &[]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_columns_collapse() {
        let record = Record::new().with("a", 1).with("b", 2);
        let restricted = restrict(&record, &["b", "a", "b"]).unwrap();
        assert_eq!(restricted.columns().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn from_serialize_struct() {
        #[derive(Serialize)]
        struct Input {
            name: String,
            email: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            nickname: Option<String>,
        }

        let record = Record::from_serialize(&Input {
            name: "Ada".into(),
            email: None,
            nickname: None,
        })
        .unwrap();

        assert_eq!(record.get("email"), Some(&Value::Null));
        assert!(record.get("nickname").is_none());
        assert_matches!(
            restrict(&record, &["name", "nickname"]),
            Err(Error::MissingColumn { column }) if column == "nickname"
        );
    }

    #[test]
    fn from_serialize_rejects_non_objects() {
        assert_matches!(Record::from_serialize(&42), Err(Error::Validation(_)));
    }

    #[test]
    fn into_params() {
        let record = Record::new().with("name", "Ada").with("age", 36);
        let params: Params = restrict(&record, &["name"]).unwrap().into();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("name"), Some(&Value::Text("Ada".into())));
    }
}
