//! Shared record fixtures for unit tests

use crate::error::ConvertError;

/// Opt-in tracing output for a test run.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("sprocket_core=trace")
        .try_init();
}
use crate::record::{DbType, Direction, FieldSpec, ProcRecord};
use crate::stream::{MemoryShape, MemoryStream, StreamPayload, StreamSpec};
use crate::types::{FromValue, ParamValue, TableValue, Value};

/// Minimal result record: `Item{Id:int, Name:string}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Item {
    pub id: i32,
    pub name: String,
}

impl ProcRecord for Item {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("Id"),
            FieldSpec::new("Name").db_type(DbType::NVarChar).size(50),
        ];
        FIELDS
    }

    fn get(&self, field: &str) -> ParamValue {
        match field {
            "Id" => ParamValue::scalar(self.id),
            "Name" => ParamValue::scalar(self.name.clone()),
            _ => ParamValue::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ConvertError> {
        match field {
            "Id" => self.id = FromValue::from_value(value)?,
            "Name" => self.name = FromValue::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

/// Element type for a table-valued parameter, with a type-level table
/// type name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContactRow {
    pub kind: String,
    pub detail: String,
}

impl ProcRecord for ContactRow {
    const TABLE_TYPE: Option<&'static str> = Some("ContactType");

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("Kind").db_type(DbType::NVarChar).size(20),
            FieldSpec::new("Detail").db_type(DbType::NVarChar).size(200),
        ];
        FIELDS
    }

    fn get(&self, field: &str) -> ParamValue {
        match field {
            "Kind" => ParamValue::scalar(self.kind.clone()),
            "Detail" => ParamValue::scalar(self.detail.clone()),
            _ => ParamValue::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ConvertError> {
        match field {
            "Kind" => self.kind = FromValue::from_value(value)?,
            "Detail" => self.detail = FromValue::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

/// Staff upsert input: scalar parameters in several directions plus a
/// table-valued contacts parameter.
#[derive(Debug, Default, Clone)]
pub struct StaffInput {
    pub staff_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub salary: f64,
    pub status: String,
    pub return_code: i32,
    pub contacts: Vec<ContactRow>,
}

impl ProcRecord for StaffInput {
    const ROUTINE: Option<&'static str> = Some("sp_UpsertStaff");

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("StaffId").direction(Direction::InputOutput),
            FieldSpec::new("first_name").db_type(DbType::NVarChar).size(100),
            FieldSpec::new("last_name").db_type(DbType::NVarChar).size(100),
            FieldSpec::new("Salary")
                .db_type(DbType::Decimal)
                .precision(18)
                .scale(2),
            FieldSpec::new("Status")
                .named("StatusMessage")
                .direction(Direction::Output)
                .db_type(DbType::NVarChar)
                .size(50),
            FieldSpec::new("ReturnCode").direction(Direction::ReturnValue),
            FieldSpec::new("Contacts").structured(),
        ];
        FIELDS
    }

    fn get(&self, field: &str) -> ParamValue {
        match field {
            "StaffId" => ParamValue::scalar(self.staff_id),
            "first_name" => ParamValue::scalar(self.first_name.clone()),
            "last_name" => ParamValue::scalar(self.last_name.clone()),
            "Salary" => ParamValue::scalar(self.salary),
            "Status" => ParamValue::scalar(self.status.clone()),
            "ReturnCode" => ParamValue::scalar(self.return_code),
            "Contacts" => ParamValue::table(TableValue::from_records(&self.contacts)),
            _ => ParamValue::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ConvertError> {
        match field {
            "StaffId" => self.staff_id = FromValue::from_value(value)?,
            "first_name" => self.first_name = FromValue::from_value(value)?,
            "last_name" => self.last_name = FromValue::from_value(value)?,
            "Salary" => self.salary = FromValue::from_value(value)?,
            "Status" => self.status = FromValue::from_value(value)?,
            "ReturnCode" => self.return_code = FromValue::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

/// Structured field that hands back a scalar; used for the type
/// mismatch path.
#[derive(Debug, Default)]
pub struct BrokenTvp {
    pub contacts: i32,
}

impl ProcRecord for BrokenTvp {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::new("Contacts").structured()];
        FIELDS
    }

    fn get(&self, field: &str) -> ParamValue {
        match field {
            "Contacts" => ParamValue::scalar(self.contacts),
            _ => ParamValue::Null,
        }
    }

    fn set(&mut self, _field: &str, _value: Value) -> Result<(), ConvertError> {
        Ok(())
    }
}

/// Two fields resolving to the same parameter name.
#[derive(Debug, Default)]
pub struct DuplicateNames;

impl ProcRecord for DuplicateNames {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("A").named("Same"),
            FieldSpec::new("B").named("Same"),
        ];
        FIELDS
    }

    fn get(&self, _field: &str) -> ParamValue {
        ParamValue::Null
    }

    fn set(&mut self, _field: &str, _value: Value) -> Result<(), ConvertError> {
        Ok(())
    }
}

/// Result record with streamed columns: the body goes to a file named
/// by a sibling column, the preview to memory in each shape.
#[derive(Debug, Default)]
pub struct Document {
    pub file_name: String,
    pub preview_bytes: Vec<u8>,
    pub preview_text: String,
    pub preview_handle: Option<MemoryStream>,
}

impl ProcRecord for Document {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("FileName").db_type(DbType::NVarChar).size(260),
            FieldSpec::new("Body")
                .db_type(DbType::VarBinary)
                .stream(StreamSpec::ToFile {
                    name_field: "FileName",
                }),
            FieldSpec::new("PreviewBytes")
                .db_type(DbType::VarBinary)
                .stream(StreamSpec::ToMemory(MemoryShape::Bytes)),
            FieldSpec::new("PreviewText")
                .db_type(DbType::NVarChar)
                .stream(StreamSpec::ToMemory(MemoryShape::Text)),
            FieldSpec::new("PreviewHandle")
                .db_type(DbType::VarBinary)
                .stream(StreamSpec::ToMemory(MemoryShape::Handle)),
        ];
        FIELDS
    }

    fn get(&self, field: &str) -> ParamValue {
        match field {
            "FileName" => ParamValue::scalar(self.file_name.clone()),
            _ => ParamValue::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ConvertError> {
        match field {
            "FileName" => self.file_name = FromValue::from_value(value)?,
            // streamed fields zero out on null columns
            "Body" => {}
            "PreviewBytes" => self.preview_bytes = FromValue::from_value(value)?,
            "PreviewText" => self.preview_text = FromValue::from_value(value)?,
            "PreviewHandle" => self.preview_handle = None,
            _ => {}
        }
        Ok(())
    }

    fn set_stream(&mut self, field: &str, payload: StreamPayload) -> Result<(), ConvertError> {
        match (field, payload) {
            ("PreviewBytes", StreamPayload::Bytes(data)) => self.preview_bytes = data,
            ("PreviewText", StreamPayload::Text(text)) => self.preview_text = text,
            ("PreviewHandle", StreamPayload::Handle(handle)) => {
                self.preview_handle = Some(handle)
            }
            _ => return Err(ConvertError::new("stream payload", "document field")),
        }
        Ok(())
    }
}
