//! A typed index key/child-value, compared for B-tree ordering (spec.md
//! §3, §4.8). Grounded on go-rdb's `query.Constant`, narrowed to the two
//! field types the record layer supports.

use std::cmp::Ordering;
use std::fmt;

use crate::record::schema::FieldType;

/// One typed value stored in a B-tree slot's `data_value` field, or read
/// back out of an `Integer`/`String` record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Int(i32),
    Str(String),
}

impl DataValue {
    /// The sentinel minimum value for `field_type` — 0 for Integer, "" for
    /// String (spec.md §4.8.4) — used to seed directory slot 0 of a fresh
    /// root so every search key lands at or right of it.
    pub fn min_value(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Integer => DataValue::Int(0),
            FieldType::String => DataValue::Str(String::new()),
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            DataValue::Int(v) => *v,
            DataValue::Str(_) => panic!("DataValue is a string, not an int"),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataValue::Str(v) => v,
            DataValue::Int(_) => panic!("DataValue is an int, not a string"),
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DataValue::Int(a), DataValue::Int(b)) => a.cmp(b),
            (DataValue::Str(a), DataValue::Str(b)) => a.cmp(b),
            _ => panic!("cannot compare DataValue of different types"),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Int(v) => write!(f, "{}", v),
            DataValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Str(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Str(v)
    }
}
