//! SQL scalar types and runtime values.

use std::fmt;
use std::sync::Arc;

/// The scalar types a row expression can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlType {
    Boolean,
    Bigint,
    Double,
    Varchar,
    /// Milliseconds since the Unix epoch, UTC.
    Timestamp,
}

impl SqlType {
    /// The lowercase SQL name of this type.
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Boolean => "boolean",
            SqlType::Bigint => "bigint",
            SqlType::Double => "double",
            SqlType::Varchar => "varchar",
            SqlType::Timestamp => "timestamp",
        }
    }

    /// Format a list of types as a comma separated signature fragment.
    pub fn list(types: &[SqlType]) -> String {
        types
            .iter()
            .map(SqlType::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-null scalar value.
///
/// Nullness is carried outside the value, either as `Option<Value>` ([`Datum`])
/// or as the separate null flag the generated code keeps on the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Bigint(i64),
    Double(f64),
    Varchar(Arc<str>),
    Timestamp(i64),
}

/// A possibly-null value, as seen by functions that receive null flags and by
/// callers reading an evaluation result.
pub type Datum = Option<Value>;

impl Value {
    /// Create a varchar value.
    pub fn varchar(value: impl Into<Arc<str>>) -> Self {
        Value::Varchar(value.into())
    }

    /// The SQL type of this value.
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Boolean(_) => SqlType::Boolean,
            Value::Bigint(_) => SqlType::Bigint,
            Value::Double(_) => SqlType::Double,
            Value::Varchar(_) => SqlType::Varchar,
            Value::Timestamp(_) => SqlType::Timestamp,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<i64> {
        match self {
            Value::Bigint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Bigint(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Varchar(v) => write!(f, "'{}'", v),
            Value::Timestamp(v) => write!(f, "timestamp({})", v),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Bigint(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.into())
    }
}
