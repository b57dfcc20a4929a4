//! Sprocket Drivers - transport implementations
//!
//! Concrete implementations of the [`RoutineTransport`] seam defined in
//! `sprocket-core`, plus a shared runtime for synchronous callers.

#[cfg(feature = "mssql")]
pub use sprocket_driver_mssql as mssql;

mod runtime;

pub use runtime::{block_on_tokio, get_tokio_runtime};

/// Re-export commonly used types from sprocket-core
pub use sprocket_core::{
    CallOptions, CallOutcome, ProcError, ProcRecord, Result, ResultBatches, RoutineTransport,
    StoredProc,
};

/// Drive a routine call to completion from synchronous code, on the
/// shared runtime.
pub fn call_blocking<R, B>(
    descriptor: &StoredProc<R>,
    transport: &dyn RoutineTransport,
    data: Option<&mut R>,
    options: CallOptions,
) -> Result<CallOutcome<B>>
where
    R: ProcRecord,
    B: ResultBatches,
{
    block_on_tokio(descriptor.call::<B>(transport, data, options))
}
