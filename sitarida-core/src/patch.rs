//! Column-level write sets.
//!
//! A [`Patch`] is what an INSERT or a partial UPDATE writes: an ordered map
//! from column name to [`SqlValue`]. Fields missing from the request never
//! reach the patch, so an UPDATE only touches what the caller sent.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::model::Aksi;
use crate::value::SqlValue;

/// Audit column holding the acting user.
pub const COL_USERNAME: &str = "username";
/// Audit column holding the action kind.
pub const COL_AKSI: &str = "aksi";
/// Audit column holding the write timestamp.
pub const COL_DATECREATE: &str = "datecreate";

/// Ordered set of column assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    columns: IndexMap<&'static str, SqlValue>,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `column`, replacing any earlier assignment.
    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.columns.insert(column, value.into());
        self
    }

    /// Assigns only when a value is present.
    pub fn set_opt<T: Into<SqlValue>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.columns.insert(column, v.into());
        }
        self
    }

    /// Stamps the audit columns (`username`, `aksi`, `datecreate`).
    pub fn audit(&mut self, username: Option<String>, aksi: Aksi, now: NaiveDateTime) -> &mut Self {
        self.set_opt(COL_USERNAME, username);
        self.set(COL_AKSI, aksi.as_str());
        self.set(COL_DATECREATE, now);
        self
    }

    /// Removes a column assignment, returning it.
    pub fn remove(&mut self, column: &str) -> Option<SqlValue> {
        self.columns.shift_remove(column)
    }

    /// Looks up the value assigned to `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// `true` when `column` is assigned.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// `true` when at least one of `business_keys` is assigned.
    #[must_use]
    pub fn has_any(&self, business_keys: &[&str]) -> bool {
        business_keys.iter().any(|k| self.columns.contains_key(k))
    }

    /// `true` when nothing is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of assigned columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Iterates assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (*k, v))
    }

    /// JSON echo of the assignments, reported back as `applied`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .columns
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}
