//! T-SQL batch synthesis for routine calls
//!
//! tiberius has no command type for stored procedures with OUTPUT
//! parameters, so each call becomes one batch: declare a local for every
//! writable parameter, EXEC with OUTPUT markers, then SELECT the locals
//! back as the batch's final result set. Input values travel as ordinary
//! `@Pn` placeholders.

use sprocket_core::{Direction, ParamBinding, ParamValue, ProcError, Result, Value};
use sprocket_core::DbType;

/// One synthesized batch, ready for the wire.
#[derive(Debug, PartialEq)]
pub(crate) struct ExecBatch {
    /// The full T-SQL text
    pub sql: String,
    /// Placeholder values, in `@P1..@Pn` order
    pub scalars: Vec<Value>,
    /// Parameter names the trailing SELECT returns, in column order.
    /// Empty when the routine has no writable parameters.
    pub outputs: Vec<String>,
}

/// Synthesize the batch for one bound call.
pub(crate) fn build_exec_batch(routine: &str, params: &[ParamBinding]) -> Result<ExecBatch> {
    let mut declares = Vec::new();
    let mut args = Vec::new();
    let mut selects = Vec::new();
    let mut scalars = Vec::new();
    let mut outputs = Vec::new();
    let mut return_local: Option<String> = None;

    for binding in params {
        if binding.db_type == DbType::Structured {
            return Err(ProcError::NotSupported(
                "table-valued parameters are not supported over the tiberius transport"
                    .to_string(),
            ));
        }

        let name = binding.name.trim_start_matches('@');
        let local = format!("@out_{}", sanitize_identifier(name));

        match binding.direction {
            Direction::Input => {
                scalars.push(scalar_value(&binding.value));
                args.push(format!("@{name} = @P{}", scalars.len()));
            }
            Direction::InputOutput => {
                scalars.push(scalar_value(&binding.value));
                declares.push(format!(
                    "DECLARE {local} {} = @P{};",
                    declared_sql_type(binding),
                    scalars.len()
                ));
                args.push(format!("@{name} = {local} OUTPUT"));
                selects.push(format!("{local} AS [{name}]"));
                outputs.push(binding.name.clone());
            }
            Direction::Output => {
                declares.push(format!("DECLARE {local} {};", declared_sql_type(binding)));
                args.push(format!("@{name} = {local} OUTPUT"));
                selects.push(format!("{local} AS [{name}]"));
                outputs.push(binding.name.clone());
            }
            Direction::ReturnValue => {
                if return_local.is_some() {
                    return Err(ProcError::Configuration(format!(
                        "more than one return-value parameter ({name})"
                    )));
                }
                declares.push(format!("DECLARE {local} INT;"));
                selects.push(format!("{local} AS [{name}]"));
                outputs.push(binding.name.clone());
                return_local = Some(local);
            }
        }
    }

    let mut sql = String::new();
    for declare in &declares {
        sql.push_str(declare);
        sql.push('\n');
    }

    sql.push_str("EXEC ");
    if let Some(local) = &return_local {
        sql.push_str(local);
        sql.push_str(" = ");
    }
    sql.push_str(&quote_routine(routine));
    if !args.is_empty() {
        sql.push(' ');
        sql.push_str(&args.join(", "));
    }
    sql.push(';');

    if !selects.is_empty() {
        sql.push('\n');
        sql.push_str("SELECT ");
        sql.push_str(&selects.join(", "));
        sql.push(';');
    }

    Ok(ExecBatch {
        sql,
        scalars,
        outputs,
    })
}

fn scalar_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Scalar(v) => v.clone(),
        // structured values never reach here; the null marker does
        _ => Value::Null,
    }
}

/// Bracket-quote a schema-qualified routine name.
pub(crate) fn quote_routine(routine: &str) -> String {
    routine
        .split('.')
        .map(|part| format!("[{}]", part.replace(']', "]]")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Strip everything T-SQL would not accept in a local variable name.
fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// T-SQL type to declare a local with, from the binding's metadata.
pub(crate) fn declared_sql_type(binding: &ParamBinding) -> String {
    let sized = |keyword: &str| match binding.size {
        Some(size) if size > 0 => format!("{keyword}({size})"),
        _ => format!("{keyword}(MAX)"),
    };

    match binding.db_type {
        DbType::Bit => "BIT".to_string(),
        DbType::TinyInt => "TINYINT".to_string(),
        DbType::SmallInt => "SMALLINT".to_string(),
        DbType::Int => "INT".to_string(),
        DbType::BigInt => "BIGINT".to_string(),
        DbType::Real => "REAL".to_string(),
        DbType::Float => "FLOAT".to_string(),
        DbType::Decimal => format!(
            "DECIMAL({},{})",
            binding.precision.unwrap_or(18),
            binding.scale.unwrap_or(2)
        ),
        DbType::Char => sized("CHAR"),
        DbType::VarChar => sized("VARCHAR"),
        DbType::NChar => sized("NCHAR"),
        DbType::NVarChar => sized("NVARCHAR"),
        // the legacy LOB types cannot be declared as locals
        DbType::Text => "VARCHAR(MAX)".to_string(),
        DbType::NText => "NVARCHAR(MAX)".to_string(),
        DbType::Binary => sized("BINARY"),
        DbType::VarBinary => sized("VARBINARY"),
        DbType::Image => "VARBINARY(MAX)".to_string(),
        DbType::Date => "DATE".to_string(),
        DbType::Time => "TIME".to_string(),
        DbType::DateTime => "DATETIME".to_string(),
        DbType::DateTime2 => "DATETIME2".to_string(),
        DbType::DateTimeOffset => "DATETIMEOFFSET".to_string(),
        DbType::UniqueIdentifier => "UNIQUEIDENTIFIER".to_string(),
        DbType::Xml => "XML".to_string(),
        DbType::Structured => unreachable!("structured parameters are rejected before this point"),
    }
}
