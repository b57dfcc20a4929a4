//! Transport seam: how a bound routine call reaches a data store

use std::time::Duration;

use async_trait::async_trait;

use crate::binder::ParamBinding;
use crate::error::Result;
use crate::types::Value;

/// Opaque handle to a transport-owned transaction. Issued by
/// [`RoutineTransport::begin`]; the caller decides when to commit or
/// roll back, the invoker never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle(pub u64);

/// One fully bound routine invocation, ready for a transport.
///
/// Structured parameters whose value resolved to the null marker have
/// already been omitted by the invoker.
#[derive(Debug)]
pub struct RoutineCall<'a> {
    /// Schema-qualified routine name
    pub routine: &'a str,
    /// Bound parameters, in field order
    pub params: &'a [ParamBinding],
    /// Command timeout, only when the caller supplied one
    pub timeout: Option<Duration>,
    /// Transaction to enroll in, if the caller began one
    pub transaction: Option<TransactionHandle>,
}

/// A connection-like transport that can execute stored routines.
///
/// The invoker opens the transport only when it is not already open, and
/// closes it afterward only in that case; an externally-opened transport
/// is never closed here.
#[async_trait]
pub trait RoutineTransport: Send + Sync {
    /// Whether the underlying connection is currently open
    fn is_open(&self) -> bool;

    /// Open the underlying connection
    async fn open(&self) -> Result<()>;

    /// Close the underlying connection
    async fn close(&self) -> Result<()>;

    /// Execute one routine call, returning a forward-only cursor over
    /// its result sets
    async fn execute(&self, call: RoutineCall<'_>) -> Result<Box<dyn RoutineCursor>>;

    /// Begin a transaction owned by the caller
    async fn begin(&self) -> Result<TransactionHandle> {
        Err(crate::ProcError::NotSupported(
            "transactions are not supported by this transport".into(),
        ))
    }

    /// Commit a caller-owned transaction
    async fn commit(&self, tx: TransactionHandle) -> Result<()> {
        let _ = tx;
        Err(crate::ProcError::NotSupported(
            "transactions are not supported by this transport".into(),
        ))
    }

    /// Roll back a caller-owned transaction
    async fn rollback(&self, tx: TransactionHandle) -> Result<()> {
        let _ = tx;
        Err(crate::ProcError::NotSupported(
            "transactions are not supported by this transport".into(),
        ))
    }
}

/// Forward-only cursor over the result sets of one routine call.
#[async_trait]
pub trait RoutineCursor: Send {
    /// Advance to the next result set; returns its column names, or
    /// `None` when no result sets remain.
    async fn next_result(&mut self) -> Result<Option<Vec<String>>>;

    /// Fetch the next row of the current result set, or `None` at the
    /// end of the set.
    async fn next_row(&mut self) -> Result<Option<Vec<Value>>>;

    /// Finish the call and collect output and return parameter values
    /// by parameter name.
    async fn finish(self: Box<Self>) -> Result<Vec<(String, Value)>>;
}
