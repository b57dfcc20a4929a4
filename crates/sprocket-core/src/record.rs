//! Registration-time field metadata and the record mapping trait

use crate::error::ConvertError;
use crate::stream::{StreamPayload, StreamSpec};
use crate::types::{ParamValue, Value};

/// Direction of data flow for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Value flows into the routine only
    #[default]
    Input,
    /// Value flows out of the routine only
    Output,
    /// Value flows both ways
    InputOutput,
    /// The routine's return code
    ReturnValue,
}

impl Direction {
    /// True for directions that write a value back into the input record
    /// after the call.
    pub fn writes_back(&self) -> bool {
        !matches!(self, Direction::Input)
    }
}

/// Declared database type of a parameter or table-value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbType {
    Bit,
    TinyInt,
    SmallInt,
    #[default]
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    Char,
    VarChar,
    NChar,
    NVarChar,
    Text,
    NText,
    Binary,
    VarBinary,
    Image,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    UniqueIdentifier,
    Xml,
    /// Table-valued parameter; the bound field must hold a collection
    Structured,
}

impl DbType {
    /// Types that carry a declared size
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            DbType::Char
                | DbType::VarChar
                | DbType::NChar
                | DbType::NVarChar
                | DbType::Text
                | DbType::NText
                | DbType::Binary
                | DbType::VarBinary
                | DbType::Image
        )
    }
}

/// Metadata for one record field: how it binds to a parameter and how it
/// is read back from a result column.
///
/// Built once per record type with the const fluent constructors:
///
/// ```
/// use sprocket_core::{DbType, Direction, FieldSpec};
///
/// const FIELDS: &[FieldSpec] = &[
///     FieldSpec::new("StaffId"),
///     FieldSpec::new("first_name").db_type(DbType::NVarChar).size(100),
///     FieldSpec::new("Status")
///         .named("@Status")
///         .direction(Direction::Output)
///         .db_type(DbType::NVarChar)
///         .size(50),
/// ];
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field identifier on the record type
    pub field: &'static str,
    /// Parameter/column name override; defaults to the field identifier
    pub parameter: Option<&'static str>,
    /// Data flow direction, defaults to input
    pub direction: Direction,
    /// Declared database type
    pub db_type: DbType,
    /// Declared size for character/binary types
    pub size: Option<i32>,
    /// Declared precision for decimal types
    pub precision: Option<u8>,
    /// Declared scale for decimal types
    pub scale: Option<u8>,
    /// Schema override for the user-defined table type
    pub table_schema: Option<&'static str>,
    /// Name override for the user-defined table type
    pub table_type: Option<&'static str>,
    /// Route this result column to a stream destination instead of a
    /// plain field assignment
    pub stream: Option<StreamSpec>,
}

impl FieldSpec {
    /// Create a new field spec with defaults: parameter name = field
    /// name, input direction, `Int` database type.
    pub const fn new(field: &'static str) -> Self {
        Self {
            field,
            parameter: None,
            direction: Direction::Input,
            db_type: DbType::Int,
            size: None,
            precision: None,
            scale: None,
            table_schema: None,
            table_type: None,
            stream: None,
        }
    }

    /// Override the parameter/column name
    pub const fn named(mut self, parameter: &'static str) -> Self {
        self.parameter = Some(parameter);
        self
    }

    /// Set the data flow direction
    pub const fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the declared database type
    pub const fn db_type(mut self, db_type: DbType) -> Self {
        self.db_type = db_type;
        self
    }

    /// Set the declared size
    pub const fn size(mut self, size: i32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the declared precision
    pub const fn precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Set the declared scale
    pub const fn scale(mut self, scale: u8) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Mark the field as a table-valued (structured) parameter
    pub const fn structured(mut self) -> Self {
        self.db_type = DbType::Structured;
        self
    }

    /// Override the user-defined table type schema
    pub const fn table_schema(mut self, schema: &'static str) -> Self {
        self.table_schema = Some(schema);
        self
    }

    /// Override the user-defined table type name
    pub const fn table_type(mut self, name: &'static str) -> Self {
        self.table_type = Some(name);
        self
    }

    /// Route the result column to a stream destination
    pub const fn stream(mut self, spec: StreamSpec) -> Self {
        self.stream = Some(spec);
        self
    }

    /// The parameter/column name this field binds to
    pub fn resolved_name(&self) -> &'static str {
        self.parameter.unwrap_or(self.field)
    }
}

/// Explicit field mapping for a record type used as routine input, result
/// row, or table-valued element.
///
/// One hand-written implementation per record type; no runtime
/// reflection. `fields` is the ordered mapping table, `get`/`set` move
/// values between fields and the database representation. Every listed
/// field is persisted; fields the database should never see are simply
/// not listed.
pub trait ProcRecord: Default + Send + Sync + 'static {
    /// Schema override for the routine or table type, standing in for a
    /// type-level schema attribute.
    const SCHEMA: Option<&'static str> = None;

    /// Default routine name when the descriptor does not set one.
    const ROUTINE: Option<&'static str> = None;

    /// Table-type name when this record is the element of a table-valued
    /// parameter.
    const TABLE_TYPE: Option<&'static str> = None;

    /// Ordered field metadata for this record type.
    fn fields() -> &'static [FieldSpec];

    /// Read the current value of a field for parameter binding.
    fn get(&self, field: &str) -> ParamValue;

    /// Assign a column or output-parameter value to a field. The null
    /// marker must become the field's zero/empty value, which
    /// [`FromValue`](crate::FromValue) implementations guarantee.
    fn set(&mut self, field: &str, value: Value) -> Result<(), ConvertError>;

    /// Receive the product of a stream directive for a field. Only
    /// records with streamed fields need to implement this.
    fn set_stream(&mut self, field: &str, payload: StreamPayload) -> Result<(), ConvertError> {
        let _ = (field, payload);
        Err(ConvertError::new("stream", "unstreamed field"))
    }
}

/// Short type name for error messages, without the module path.
pub(crate) fn short_type_name<R: 'static>() -> &'static str {
    let full = std::any::type_name::<R>();
    full.rsplit("::").next().unwrap_or(full)
}
