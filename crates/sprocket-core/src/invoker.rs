//! Call orchestration: bind, execute, materialize, write back

use crate::batch::{CallOutcome, ResultBatches};
use crate::binder::{bind_parameters, BoundParams, ParamBinding};
use crate::error::{ProcError, Result};
use crate::proc::{CallOptions, StoredProc};
use crate::record::{short_type_name, ProcRecord};
use crate::transport::{RoutineCall, RoutineTransport};
use crate::types::Value;

/// Execute one routine call end to end.
///
/// Connection discipline: the transport is opened only when not already
/// open, and closed afterward only in that case, whether the call
/// succeeded or failed. An externally-opened transport stays open.
pub(crate) async fn call_routine<R: ProcRecord, B: ResultBatches>(
    descriptor: &StoredProc<R>,
    transport: &dyn RoutineTransport,
    mut data: Option<&mut R>,
    mut options: CallOptions,
) -> Result<CallOutcome<B>> {
    let routine = descriptor.full_name()?;
    if options.timeout.is_none() {
        options.timeout = descriptor.timeout();
    }
    let bound = bind_parameters::<R>(descriptor.schema(), data.as_deref())?;
    let cancel = options.cancel.clone();

    tracing::debug!(
        routine = %routine,
        params = bound.bindings.len(),
        batches = B::DECLARED,
        "calling stored routine"
    );

    let opened = if transport.is_open() {
        false
    } else {
        let open = tokio::select! {
            _ = cancel.cancelled() => Err(ProcError::Cancelled),
            result = transport.open() => result,
        };
        open.map_err(|e| contextualize(&routine, e))?;
        true
    };

    let result = execute_and_read::<B>(transport, &routine, &bound, &options).await;

    // release on every exit path, but only the connection we acquired
    if opened {
        if let Err(e) = transport.close().await {
            tracing::warn!(routine = %routine, error = %e, "error closing connection after call");
        }
    }

    let (outcome, outputs) = result.map_err(|e| contextualize(&routine, e))?;

    if let Some(record) = data.as_deref_mut() {
        write_output_params::<R>(&bound, &outputs, record)?;
    }

    Ok(outcome)
}

/// Execute the bound call and drain its cursor. Runs with the connection
/// held; the caller handles release.
async fn execute_and_read<B: ResultBatches>(
    transport: &dyn RoutineTransport,
    routine: &str,
    bound: &BoundParams,
    options: &CallOptions,
) -> Result<(CallOutcome<B>, Vec<(String, Value)>)> {
    let cancel = &options.cancel;

    // null-valued structured parameters never reach the wire
    let wire: Vec<ParamBinding> = bound
        .bindings
        .iter()
        .filter(|b| !b.omit_from_command())
        .cloned()
        .collect();

    let call = RoutineCall {
        routine,
        params: &wire,
        timeout: options.timeout,
        transaction: options.transaction,
    };

    let mut cursor = tokio::select! {
        _ = cancel.cancelled() => return Err(ProcError::Cancelled),
        cursor = transport.execute(call) => cursor?,
    };

    let (batches, matched) =
        B::materialize(cursor.as_mut(), options.stream_dir.as_deref(), cancel).await?;

    let outputs = tokio::select! {
        _ = cancel.cancelled() => return Err(ProcError::Cancelled),
        outputs = cursor.finish() => outputs?,
    };

    Ok((CallOutcome { batches, matched }, outputs))
}

/// Write every non-input parameter value back onto the caller's record,
/// resolving fields through the per-call name mapping. The null marker
/// becomes the field's zero/empty value.
fn write_output_params<R: ProcRecord>(
    bound: &BoundParams,
    outputs: &[(String, Value)],
    record: &mut R,
) -> Result<()> {
    for binding in bound.bindings.iter().filter(|b| b.direction.writes_back()) {
        let Some(field) = bound.field_for(&binding.name) else {
            continue;
        };
        // a transport that produced no value for this parameter leaves
        // the field untouched
        let Some((_, value)) = outputs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&binding.name))
        else {
            continue;
        };

        record.set(field, value.clone()).map_err(|e| {
            ProcError::field_mapping(binding.name.clone(), short_type_name::<R>(), e)
        })?;
    }
    Ok(())
}

/// Attach the routine name to failures that lack context of their own.
fn contextualize(routine: &str, error: ProcError) -> ProcError {
    match error {
        ProcError::Transport { routine: r, message } if r.is_empty() => {
            ProcError::transport(routine, message)
        }
        e @ (ProcError::Cancelled
        | ProcError::Configuration(_)
        | ProcError::TypeMismatch { .. }
        | ProcError::FieldMapping { .. }
        | ProcError::NotSupported(_)
        | ProcError::Transport { .. }
        | ProcError::Io(_)) => e,
    }
}
