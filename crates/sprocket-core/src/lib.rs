//! Sprocket Core - typed stored-routine invoker
//!
//! Calls stored database routines through a typed record mapping with no
//! runtime reflection:
//!
//! - `ProcRecord` - registration-time field mapping implemented once per
//!   record type
//! - `StoredProc<R>` - reusable descriptor for one routine
//! - binder: record fields to named parameters, including table-valued
//!   parameters
//! - materializer: result sets back into typed records, with optional
//!   streaming of large columns to files or memory buffers
//! - output writer: output/return parameter values back onto the input
//!   record
//!
//! Transports implement the `RoutineTransport`/`RoutineCursor` seam; a
//! scripted `StubTransport` is provided for tests.

mod batch;
mod binder;
mod error;
mod invoker;
mod materializer;
mod proc;
mod record;
mod stream;
pub mod stub;
mod transport;
mod types;

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod stream_tests;

pub use batch::{CallOutcome, ResultBatches};
pub use binder::ParamBinding;
pub use error::{ConvertError, ProcError, Result};
pub use proc::{CallOptions, StoredProc};
pub use record::{DbType, Direction, FieldSpec, ProcRecord};
pub use stream::{MemoryShape, MemoryStream, StreamPayload, StreamSpec};
pub use transport::{RoutineCall, RoutineCursor, RoutineTransport, TransactionHandle};
pub use types::{FromValue, IntoValue, ParamValue, TableColumn, TableValue, Value};
