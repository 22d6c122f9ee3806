//! Typed column descriptors and change sets.
//!
//! Each entity exposes a closed enum of the columns callers may edit. A
//! [`ChangeSet`] pairs those columns with [`FieldValue`]s and is what the
//! generic CRUD engine receives; an absent column means "leave unchanged",
//! `FieldValue::Null` means "clear".

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Runtime value bound to a column, filter or sort parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            FieldValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            FieldValue::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        FieldValue::Decimal(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => FieldValue::Null,
        }
    }
}

/// A column of a specific entity table.
pub trait Column: Copy + Eq + fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;
}

/// Ordered set of column edits for one entity type. Setting the same
/// column twice keeps the last value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet<C: Column> {
    changes: Vec<(C, FieldValue)>,
}

impl<C: Column> Default for ChangeSet<C> {
    fn default() -> Self {
        Self { changes: Vec::new() }
    }
}

impl<C: Column> ChangeSet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: C, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    pub fn insert(&mut self, column: C, value: FieldValue) {
        match self.changes.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.changes.push((column, value)),
        }
    }

    pub fn get(&self, column: C) -> Option<&FieldValue> {
        self.changes.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: C) -> bool {
        self.get(column).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.changes.iter().map(|(c, v)| (c.name(), v))
    }

    pub fn entries(&self) -> impl Iterator<Item = (C, &FieldValue)> + '_ {
        self.changes.iter().map(|(c, v)| (*c, v))
    }
}
