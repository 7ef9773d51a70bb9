//! Scalar query results

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// First column of the first row of a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl ScalarValue {
    /// Empty result sets and NULLs both read as zero.
    pub fn zero() -> Self {
        ScalarValue::Integer(0)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            ScalarValue::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Decimal(v) => write!(f, "{}", v.normalize()),
            ScalarValue::Text(v) => write!(f, "{}", v),
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::Uuid(v) => write!(f, "{}", v),
            ScalarValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            ScalarValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            ScalarValue::TimestampTz(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S %Z")),
        }
    }
}
