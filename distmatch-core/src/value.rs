use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical scalar form of a cell.
///
/// The derived ordering is the global sort order used for ranking: nulls first, then every
/// number in numeric order, then every string in byte-lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RawValue {
    Null,
    Number(OrderedFloat<f64>),
    Text(String),
}

impl RawValue {
    /// Coerces text into a number when it parses as a finite float, otherwise keeps it as text.
    /// `"1"`, `"1.0"` and `1` all end up as the same value.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Self::number(f),
            _ => RawValue::Text(s.to_owned()),
        }
    }

    pub fn number(f: f64) -> Self {
        if f.is_nan() {
            RawValue::Null
        } else if f.is_infinite() {
            RawValue::Text(f.to_string())
        } else if f == 0.0 {
            RawValue::Number(OrderedFloat(0.0)) // fold -0.0
        } else {
            RawValue::Number(OrderedFloat(f))
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Number(n) if n.0.fract() == 0.0 && n.0.abs() < 1e15 => {
                write!(f, "{}", n.0 as i64)
            }
            RawValue::Number(n) => write!(f, "{}", n.0),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::number(v as f64)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::number(f64::from(v))
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::parse(v)
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        match v.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => RawValue::number(f),
            _ => RawValue::Text(v),
        }
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}
