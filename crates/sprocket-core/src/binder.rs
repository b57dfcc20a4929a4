//! Parameter binder: record fields to routine parameters

use std::collections::HashSet;

use crate::error::{ProcError, Result};
use crate::record::{DbType, Direction, ProcRecord};
use crate::types::{ParamValue, Value};

/// One bound routine parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBinding {
    /// Resolved parameter name
    pub name: String,
    /// Data flow direction
    pub direction: Direction,
    /// Declared database type
    pub db_type: DbType,
    /// Declared size, if any
    pub size: Option<i32>,
    /// Declared precision, if any
    pub precision: Option<u8>,
    /// Declared scale, if any
    pub scale: Option<u8>,
    /// Resolved schema-qualified table type name, for structured
    /// parameters with a non-null value
    pub type_name: Option<String>,
    /// The bound value
    pub value: ParamValue,
}

impl ParamBinding {
    /// True when this binding must be omitted from the outgoing command:
    /// a structured parameter whose value resolved to the null marker.
    pub fn omit_from_command(&self) -> bool {
        self.db_type == DbType::Structured && self.value.is_null()
    }
}

/// Per-call product of the binder: the ordered bindings plus the
/// parameter-name to field-name mapping the output writer needs.
/// Rebuilt on every call; never shared between calls.
#[derive(Debug)]
pub(crate) struct BoundParams {
    pub bindings: Vec<ParamBinding>,
    pub mapped: Vec<(String, &'static str)>,
}

impl BoundParams {
    /// Field name a parameter was created from, if any.
    pub fn field_for(&self, parameter: &str) -> Option<&'static str> {
        self.mapped
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, field)| *field)
    }
}

/// Convert the fields of `data` into an ordered set of parameter
/// bindings. A `None` record binds every parameter to the null marker.
pub(crate) fn bind_parameters<R: ProcRecord>(
    schema: &str,
    data: Option<&R>,
) -> Result<BoundParams> {
    let mut bindings = Vec::with_capacity(R::fields().len());
    let mut mapped = Vec::with_capacity(R::fields().len());
    let mut seen = HashSet::new();

    for spec in R::fields() {
        let name = spec.resolved_name();
        if !seen.insert(name) {
            return Err(ProcError::Configuration(format!(
                "duplicate parameter name {name} on {}",
                crate::record::short_type_name::<R>()
            )));
        }

        let raw = match data {
            None => ParamValue::Null,
            Some(record) => record.get(spec.field),
        };

        let mut type_name = None;
        let value = if spec.db_type == DbType::Structured {
            match raw {
                ParamValue::Null => ParamValue::Null,
                // empty tables bind as the null marker; some drivers
                // reject an empty table value outright
                ParamValue::Table(table) if table.is_empty() => ParamValue::Null,
                ParamValue::Table(table) => {
                    let type_schema = spec.table_schema.or(table.schema).unwrap_or(schema);
                    let base = spec.table_type.or(table.type_name).unwrap_or(spec.field);
                    type_name = Some(format!("{type_schema}.{base}"));
                    ParamValue::Table(table)
                }
                ParamValue::Scalar(_) => {
                    return Err(ProcError::TypeMismatch {
                        field: spec.field.to_string(),
                        message: "structured parameters must hold a collection value".to_string(),
                    });
                }
            }
        } else {
            match raw {
                ParamValue::Table(_) => {
                    return Err(ProcError::TypeMismatch {
                        field: spec.field.to_string(),
                        message: "collection value bound to a non-structured parameter"
                            .to_string(),
                    });
                }
                ParamValue::Scalar(Value::Null) => ParamValue::Null,
                other => other,
            }
        };

        mapped.push((name.to_string(), spec.field));
        bindings.push(ParamBinding {
            name: name.to_string(),
            direction: spec.direction,
            db_type: spec.db_type,
            size: spec.size,
            precision: spec.precision,
            scale: spec.scale,
            type_name,
            value,
        });
    }

    tracing::trace!(
        record = crate::record::short_type_name::<R>(),
        count = bindings.len(),
        "bound parameters"
    );

    Ok(BoundParams { bindings, mapped })
}
