//! Result materializer: rows of one result set into typed records

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::error::{ProcError, Result};
use crate::record::{short_type_name, FieldSpec, ProcRecord};
use crate::stream::{self, StreamSpec};
use crate::transport::RoutineCursor;
use crate::types::{ParamValue, Value};

/// Read every row of the current result set into records of type `R`.
///
/// Column lookup is by resolved field name, case-insensitive. A column
/// absent from this particular result set leaves the field at its
/// zero/empty value; any other per-field failure is fatal and carries
/// the column and record type name.
pub(crate) async fn read_result_set<R: ProcRecord>(
    cursor: &mut dyn RoutineCursor,
    columns: &[String],
    stream_dir: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<Vec<R>> {
    // resolve each field to its column position once per result set
    let positions: Vec<(&FieldSpec, Option<usize>)> = R::fields()
        .iter()
        .map(|spec| {
            let name = spec.resolved_name();
            let pos = columns.iter().position(|c| c.eq_ignore_ascii_case(name));
            (spec, pos)
        })
        .collect();

    let mut records = Vec::new();
    loop {
        let row = tokio::select! {
            _ = cancel.cancelled() => return Err(ProcError::Cancelled),
            row = cursor.next_row() => row?,
        };
        let Some(row) = row else { break };

        let mut record = R::default();
        for (spec, pos) in &positions {
            let value = match pos {
                // absent column: explicitly the zero/empty value
                None => Value::Null,
                Some(i) => row.get(*i).cloned().unwrap_or(Value::Null),
            };

            match &spec.stream {
                Some(directive) if !value.is_null() => {
                    route_stream(&mut record, spec, directive, value, stream_dir, cancel)
                        .await?;
                }
                _ => {
                    record.set(spec.field, value).map_err(|e| {
                        ProcError::field_mapping(
                            spec.resolved_name(),
                            short_type_name::<R>(),
                            e,
                        )
                    })?;
                }
            }
        }
        records.push(record);
    }

    tracing::trace!(
        record = short_type_name::<R>(),
        rows = records.len(),
        "materialized result set"
    );

    Ok(records)
}

/// Copy a streamed column into its destination and hand the record
/// whatever the destination kind delivers.
async fn route_stream<R: ProcRecord>(
    record: &mut R,
    spec: &FieldSpec,
    directive: &StreamSpec,
    value: Value,
    stream_dir: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<()> {
    let column = spec.resolved_name();
    let data = stream::raw_bytes(value)
        .map_err(|e| ProcError::field_mapping(column, short_type_name::<R>(), e))?;

    match directive {
        StreamSpec::ToFile { name_field } => {
            let base = stream_dir.ok_or_else(|| {
                ProcError::Configuration(format!(
                    "field {} streams to a file but no stream directory is configured",
                    spec.field
                ))
            })?;

            // the file name comes from a sibling field populated earlier
            // in declaration order
            let file_name = match record.get(name_field) {
                ParamValue::Scalar(Value::String(name)) if !name.is_empty() => name,
                _ => {
                    return Err(ProcError::field_mapping(
                        column,
                        short_type_name::<R>(),
                        format!("file name field {name_field} is empty"),
                    ));
                }
            };

            let path = base.join(&file_name);
            tracing::debug!(column = %column, path = %path.display(), "streaming column to file");
            stream::copy_to_file(&path, &data, cancel).await
        }
        StreamSpec::ToMemory(shape) => {
            let payload = stream::memory_payload(*shape, data)
                .map_err(|e| ProcError::field_mapping(column, short_type_name::<R>(), e))?;
            record
                .set_stream(spec.field, payload)
                .map_err(|e| ProcError::field_mapping(column, short_type_name::<R>(), e))
        }
    }
}
