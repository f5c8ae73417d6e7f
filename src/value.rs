//! Scalar values - the only attribute values a record may hold
//!
//! Every column of a mirrored table maps to one [`Scalar`]. When a value is
//! written it is tagged with a [`SqlType`]: integers as `INTEGER`, floats as
//! `FLOAT`, everything else as `TEXT`.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

/// SQL type tag used when binding a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Integer,
    Float,
    Text,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "integer",
            SqlType::Float => "float",
            SqlType::Text => "text",
        }
    }

    /// Map a declared SQLite column type to a tag, using SQLite's affinity rules
    pub fn from_declared(decl: &str) -> Self {
        let decl = decl.to_ascii_uppercase();
        if decl.contains("INT") {
            SqlType::Integer
        } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
            SqlType::Float
        } else {
            SqlType::Text
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Scalar {
    /// The tag this value is bound with
    pub fn sql_type(&self) -> SqlType {
        match self {
            Scalar::Integer(_) => SqlType::Integer,
            Scalar::Float(_) => SqlType::Float,
            Scalar::Null | Scalar::Text(_) => SqlType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats, as SQLite does for REAL columns
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Parse user input into a value of the given type
    pub fn parse_as(input: &str, sql_type: SqlType) -> Option<Self> {
        match sql_type {
            SqlType::Integer => input.parse().ok().map(Scalar::Integer),
            SqlType::Float => input.parse().ok().map(Scalar::Float),
            SqlType::Text => Some(Scalar::Text(input.to_string())),
        }
    }
}

/// String form used for keys: null renders as the empty string
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Null => ToSqlOutput::from(rusqlite::types::Null),
            Scalar::Integer(i) => ToSqlOutput::from(*i),
            Scalar::Float(f) => ToSqlOutput::from(*f),
            Scalar::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl FromSql for Scalar {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Scalar::Null),
            ValueRef::Integer(i) => Ok(Scalar::Integer(i)),
            ValueRef::Real(f) => Ok(Scalar::Float(f)),
            ValueRef::Text(t) => std::str::from_utf8(t)
                .map(|s| Scalar::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}
