//! Core value types for sprocket

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConvertError;
use crate::record::{DbType, FieldSpec};

/// A scalar database value.
///
/// `Value::Null` is the database-null marker: the sentinel the data store
/// understands as "no value", distinct from a missing column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean (BIT)
    Bool(bool),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID / UNIQUEIDENTIFIER
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's kind, used in conversion errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeUtc(_) => "datetimeoffset",
        }
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
        }
    }
}

/// The value bound to one routine parameter.
///
/// Closed set: a scalar, a table-shaped collection bound as a single unit,
/// or the database-null marker. Call sites match exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Database-null marker
    Null,
    /// A single scalar value
    Scalar(Value),
    /// A table-valued collection
    Table(TableValue),
}

impl ParamValue {
    /// Bind a scalar field value. `None` becomes the null marker.
    pub fn scalar(value: impl IntoValue) -> Self {
        match value.into_value() {
            Value::Null => ParamValue::Null,
            v => ParamValue::Scalar(v),
        }
    }

    /// Bind a table-valued field.
    pub fn table(table: TableValue) -> Self {
        ParamValue::Table(table)
    }

    /// Check if the value is the null marker
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

/// Column definition inside a table-valued parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    /// Column name as declared by the user-defined table type
    pub name: String,
    /// Declared database type
    pub db_type: DbType,
    /// Declared size for character/binary columns
    pub size: i32,
    /// Declared precision for decimal columns
    pub precision: u8,
    /// Declared scale for decimal columns
    pub scale: u8,
}

/// A table-shaped value bound to a structured parameter as a single unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableValue {
    /// Schema override carried by the element type, if any
    pub schema: Option<&'static str>,
    /// Table-type name override carried by the element type, if any
    pub type_name: Option<&'static str>,
    /// Column definitions, in field order
    pub columns: Vec<TableColumn>,
    /// Row data, one `Vec<Value>` per element, in column order
    pub rows: Vec<Vec<Value>>,
}

impl TableValue {
    /// Build a table value from a slice of records, using the element
    /// type's field metadata for the column definitions.
    pub fn from_records<R: crate::record::ProcRecord>(records: &[R]) -> Self {
        let columns = R::fields()
            .iter()
            .map(|f| f.table_column())
            .collect::<Vec<_>>();

        let rows = records
            .iter()
            .map(|r| {
                R::fields()
                    .iter()
                    .map(|f| match r.get(f.field) {
                        ParamValue::Scalar(v) => v,
                        ParamValue::Null => Value::Null,
                        // nested tables cannot appear inside a table value
                        ParamValue::Table(_) => Value::Null,
                    })
                    .collect()
            })
            .collect();

        Self {
            schema: R::SCHEMA,
            type_name: R::TABLE_TYPE,
            columns,
            rows,
        }
    }

    /// Number of rows in the table value
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the table value holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FieldSpec {
    /// Column definition for this field when it appears inside a
    /// table-valued parameter. Missing metadata falls back to
    /// type-appropriate defaults.
    pub(crate) fn table_column(&self) -> TableColumn {
        TableColumn {
            name: self.resolved_name().to_string(),
            db_type: self.db_type,
            size: self.size.unwrap_or(50),
            precision: self.precision.unwrap_or(10),
            scale: self.scale.unwrap_or(2),
        }
    }
}

/// Conversion from a Rust field value into a database [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion from a database [`Value`] into a Rust field value.
///
/// The database-null marker converts to the type's zero/empty value; a
/// value of the wrong kind is a [`ConvertError`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConvertError>;
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConvertError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        Value::Null => Ok(Self::default()),
                        other => Err(ConvertError::new(other.kind(), $name)),
                    }
                }
            }
        )*
    };
}

impl_value_conversions! {
    bool => Bool, "bool";
    i16 => Int16, "int16";
    f32 => Float32, "float32";
    f64 => Float64, "float64";
    String => String, "string";
    Vec<u8> => Bytes, "bytes";
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int32(self)
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Int16(v) => Ok(v as i32),
            Value::Int32(v) => Ok(v),
            Value::Null => Ok(0),
            other => Err(ConvertError::new(other.kind(), "int32")),
        }
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int64(self)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(0),
            other => other
                .as_i64()
                .ok_or_else(|| ConvertError::new(other.kind(), "int64")),
        }
    }
}

impl IntoValue for Uuid {
    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Null => Ok(Uuid::nil()),
            other => Err(ConvertError::new(other.kind(), "uuid")),
        }
    }
}

impl IntoValue for NaiveDate {
    fn into_value(self) -> Value {
        Value::Date(self)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Date(v) => Ok(v),
            Value::Null => Ok(NaiveDate::default()),
            other => Err(ConvertError::new(other.kind(), "date")),
        }
    }
}

impl IntoValue for NaiveTime {
    fn into_value(self) -> Value {
        Value::Time(self)
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Time(v) => Ok(v),
            Value::Null => Ok(NaiveTime::default()),
            other => Err(ConvertError::new(other.kind(), "time")),
        }
    }
}

impl IntoValue for NaiveDateTime {
    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Null => Ok(NaiveDateTime::default()),
            other => Err(ConvertError::new(other.kind(), "datetime")),
        }
    }
}

impl IntoValue for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::DateTimeUtc(self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::DateTimeUtc(v) => Ok(v),
            Value::Null => Ok(DateTime::<Utc>::default()),
            other => Err(ConvertError::new(other.kind(), "datetimeoffset")),
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}
