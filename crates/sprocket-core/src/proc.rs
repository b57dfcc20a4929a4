//! Stored routine descriptor and per-call options

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::batch::{CallOutcome, ResultBatches};
use crate::error::{ProcError, Result};
use crate::invoker;
use crate::record::ProcRecord;
use crate::transport::{RoutineTransport, TransactionHandle};

/// Descriptor for one callable stored routine, typed over its input
/// record.
///
/// Created once, typically at service start, and reused across calls;
/// the fluent setters are for configuration time only. A descriptor
/// with no routine name fails with [`ProcError::Configuration`] at call
/// time.
///
/// ```no_run
/// # use sprocket_core::*;
/// # #[derive(Default)] struct StaffQuery;
/// # impl ProcRecord for StaffQuery {
/// #     fn fields() -> &'static [FieldSpec] { &[] }
/// #     fn get(&self, _: &str) -> ParamValue { ParamValue::Null }
/// #     fn set(&mut self, _: &str, _: Value) -> std::result::Result<(), ConvertError> { Ok(()) }
/// # }
/// let get_staff: StoredProc<StaffQuery> =
///     StoredProc::new().has_owner("dbo").has_name("sp_GetStaffs");
/// ```
#[derive(Debug, Clone)]
pub struct StoredProc<R: ProcRecord> {
    schema: String,
    name: Option<String>,
    timeout: Option<Duration>,
    _record: PhantomData<fn() -> R>,
}

impl<R: ProcRecord> StoredProc<R> {
    /// Create a descriptor. Schema and routine name default from the
    /// record type's `SCHEMA` and `ROUTINE` consts when present.
    pub fn new() -> Self {
        Self {
            schema: R::SCHEMA.unwrap_or("dbo").to_string(),
            name: R::ROUTINE.map(str::to_string),
            timeout: None,
            _record: PhantomData,
        }
    }

    /// Create a descriptor with an explicit routine name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().has_name(name)
    }

    /// Fluent setup: assign the owning schema.
    pub fn has_owner(mut self, owner: impl Into<String>) -> Self {
        self.schema = owner.into();
        self
    }

    /// Fluent setup: assign the routine name.
    pub fn has_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fluent setup: default command timeout for calls through this
    /// descriptor. A per-call option overrides it.
    pub fn use_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Owning schema
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Default command timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Schema-qualified routine name.
    pub fn full_name(&self) -> Result<String> {
        match &self.name {
            Some(name) if !name.is_empty() => Ok(format!("{}.{}", self.schema, name)),
            _ => Err(ProcError::Configuration(
                "missing stored procedure name".to_string(),
            )),
        }
    }

    /// Call the routine.
    ///
    /// `data` supplies the parameter values and receives output
    /// parameter values afterward; `None` binds every parameter to the
    /// database-null marker. `B` declares the expected result batch
    /// types in result-set order.
    pub async fn call<B: ResultBatches>(
        &self,
        transport: &dyn RoutineTransport,
        data: Option<&mut R>,
        options: CallOptions,
    ) -> Result<CallOutcome<B>> {
        invoker::call_routine::<R, B>(self, transport, data, options).await
    }
}

impl<R: ProcRecord> Default for StoredProc<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call options: timeout override, transaction enrollment,
/// cancellation, and the base directory for file stream destinations.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Command timeout override; `None` falls back to the descriptor
    /// default, and the transport default after that
    pub timeout: Option<Duration>,
    /// Caller-owned transaction to enroll in
    pub transaction: Option<TransactionHandle>,
    /// Cancellation signal, honored at every suspension point
    pub cancel: CancellationToken,
    /// Base directory for [`StreamSpec::ToFile`](crate::StreamSpec::ToFile)
    /// destinations
    pub stream_dir: Option<PathBuf>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the command timeout for this call
    pub fn use_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enroll the call in a caller-owned transaction
    pub fn use_transaction(mut self, tx: TransactionHandle) -> Self {
        self.transaction = Some(tx);
        self
    }

    /// Attach a cancellation signal
    pub fn use_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Configure the base directory for file stream destinations
    pub fn stream_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stream_dir = Some(dir.into());
        self
    }
}
