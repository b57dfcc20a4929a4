//! MS SQL Server transport over tiberius

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tiberius::{Client, ColumnData, Row as TiberiusRow};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use sprocket_core::{
    ProcError, Result, RoutineCall, RoutineCursor, RoutineTransport, TransactionHandle, Value,
};

use crate::batch::build_exec_batch;
use crate::config::MssqlConfig;

/// MS SQL Server transport errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlTransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection is not open")]
    NotOpen,

    #[error("Tiberius error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MssqlTransportError> for ProcError {
    fn from(err: MssqlTransportError) -> Self {
        // the invoker attaches the routine name
        ProcError::transport("", err)
    }
}

/// [`RoutineTransport`] over a single tiberius connection.
///
/// Created closed; the invoker opens it per call, or the caller opens it
/// once and keeps it open across calls.
pub struct MssqlTransport {
    config: MssqlConfig,
    client: Mutex<Option<Client<Compat<TcpStream>>>>,
    open: AtomicBool,
    next_tx: AtomicU64,
}

impl MssqlTransport {
    pub fn new(config: MssqlConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
            open: AtomicBool::new(false),
            next_tx: AtomicU64::new(0),
        }
    }

    async fn run_statement(&self, sql: &str) -> std::result::Result<(), MssqlTransportError> {
        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(MssqlTransportError::NotOpen)?;
        client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    async fn connect(&self) -> std::result::Result<Client<Compat<TcpStream>>, MssqlTransportError> {
        let config = self.config.to_tiberius()?;
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MssqlTransportError::ConnectionFailed(e.to_string()))?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MssqlTransportError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("connected to MS SQL Server");
        Ok(client)
    }
}

#[async_trait]
impl RoutineTransport for MssqlTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> Result<()> {
        let mut guard = self.client.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        *guard = Some(self.connect().await?);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let client = self.client.lock().await.take();
        self.open.store(false, Ordering::SeqCst);
        if let Some(client) = client {
            client
                .close()
                .await
                .map_err(MssqlTransportError::Tiberius)?;
        }
        tracing::debug!("MS SQL Server connection closed");
        Ok(())
    }

    async fn execute(&self, call: RoutineCall<'_>) -> Result<Box<dyn RoutineCursor>> {
        let batch = build_exec_batch(call.routine, call.params)?;
        let params: Vec<MssqlParam> = batch.scalars.iter().map(value_to_param).collect();
        let param_refs: Vec<&dyn tiberius::ToSql> = params
            .iter()
            .map(|p| p as &dyn tiberius::ToSql)
            .collect();

        tracing::debug!(
            routine = %call.routine,
            placeholders = params.len(),
            outputs = batch.outputs.len(),
            "executing routine batch"
        );

        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(MssqlTransportError::NotOpen)?;

        let run = async {
            let stream = client
                .query(&batch.sql, &param_refs[..])
                .await
                .map_err(MssqlTransportError::Tiberius)?;
            stream
                .into_results()
                .await
                .map_err(MssqlTransportError::Tiberius)
        };

        let raw_sets = match call.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| MssqlTransportError::Timeout(limit))??,
            None => run.await?,
        };

        let mut sets: VecDeque<(Vec<String>, VecDeque<Vec<Value>>)> = raw_sets
            .into_iter()
            .map(convert_result_set)
            .collect::<Result<_>>()?;

        // the trailing SELECT of locals is ours, not the caller's
        let outputs = if batch.outputs.is_empty() {
            Vec::new()
        } else {
            match sets.pop_back() {
                Some((_, mut rows)) => match rows.pop_front() {
                    Some(values) => batch.outputs.into_iter().zip(values).collect(),
                    None => Vec::new(),
                },
                None => Vec::new(),
            }
        };

        Ok(Box::new(MssqlCursor {
            sets,
            current: None,
            outputs,
        }))
    }

    async fn begin(&self) -> Result<TransactionHandle> {
        self.run_statement("BEGIN TRANSACTION").await?;
        let tx = TransactionHandle(self.next_tx.fetch_add(1, Ordering::SeqCst) + 1);
        tracing::debug!(tx = tx.0, "transaction started");
        Ok(tx)
    }

    async fn commit(&self, tx: TransactionHandle) -> Result<()> {
        self.run_statement("COMMIT TRANSACTION").await?;
        tracing::debug!(tx = tx.0, "transaction committed");
        Ok(())
    }

    async fn rollback(&self, tx: TransactionHandle) -> Result<()> {
        self.run_statement("ROLLBACK TRANSACTION").await?;
        tracing::debug!(tx = tx.0, "transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for MssqlTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlTransport")
            .field("host", &self.config.host)
            .field("database", &self.config.database)
            .field("open", &self.open.load(Ordering::SeqCst))
            .finish()
    }
}

/// Cursor over the result sets one batch produced. Everything is
/// prefetched; tiberius streams are tied to the client borrow.
struct MssqlCursor {
    sets: VecDeque<(Vec<String>, VecDeque<Vec<Value>>)>,
    current: Option<VecDeque<Vec<Value>>>,
    outputs: Vec<(String, Value)>,
}

#[async_trait]
impl RoutineCursor for MssqlCursor {
    async fn next_result(&mut self) -> Result<Option<Vec<String>>> {
        match self.sets.pop_front() {
            Some((columns, rows)) => {
                self.current = Some(rows);
                Ok(Some(columns))
            }
            None => {
                self.current = None;
                Ok(None)
            }
        }
    }

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.current.as_mut().and_then(|rows| rows.pop_front()))
    }

    async fn finish(self: Box<Self>) -> Result<Vec<(String, Value)>> {
        Ok(self.outputs)
    }
}

fn convert_result_set(
    rows: Vec<TiberiusRow>,
) -> Result<(Vec<String>, VecDeque<Vec<Value>>)> {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let converted = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(column_to_value)
                .collect::<Result<Vec<Value>>>()
        })
        .collect::<Result<VecDeque<_>>>()?;

    Ok((columns, converted))
}

/// Convert one tiberius column value into a core [`Value`].
pub(crate) fn column_to_value(data: ColumnData<'static>) -> Result<Value> {
    let value = match data {
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::U8(v) => v.map(|n| Value::Int16(n as i16)),
        ColumnData::I16(v) => v.map(Value::Int16),
        ColumnData::I32(v) => v.map(Value::Int32),
        ColumnData::I64(v) => v.map(Value::Int64),
        ColumnData::F32(v) => v.map(Value::Float32),
        ColumnData::F64(v) => v.map(Value::Float64),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(Value::Uuid),
        ColumnData::Binary(v) => v.map(|b| Value::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| Value::Decimal(n.to_string())),
        ColumnData::Xml(v) => v.map(|x| Value::String(x.into_owned().into_string())),
        ColumnData::Date(v) => v.map(|d| Value::Date(date_from_days(1, 1, 1, d.days() as i64))),
        ColumnData::Time(v) => v.map(|t| Value::Time(time_from_increments(t.increments()))),
        ColumnData::DateTime(v) => v.map(|dt| {
            // legacy DATETIME: days since 1900, 1/300s fragments
            Value::DateTime(chrono::NaiveDateTime::new(
                date_from_days(1900, 1, 1, dt.days() as i64),
                seconds_from_midnight((dt.seconds_fragments() as f64 / 300.0) as u32),
            ))
        }),
        ColumnData::SmallDateTime(v) => v.map(|dt| {
            Value::DateTime(chrono::NaiveDateTime::new(
                date_from_days(1900, 1, 1, dt.days() as i64),
                seconds_from_midnight(dt.seconds_fragments() as u32 * 60),
            ))
        }),
        ColumnData::DateTime2(v) => v.map(|dt| Value::DateTime(datetime2_to_naive(dt))),
        ColumnData::DateTimeOffset(v) => v.map(|dto| {
            let naive = datetime2_to_naive(dto.datetime2());
            Value::DateTimeUtc(chrono::DateTime::from_naive_utc_and_offset(
                naive,
                chrono::Utc,
            ))
        }),
    };

    Ok(value.unwrap_or(Value::Null))
}

fn date_from_days(year: i32, month: u32, day: u32, days: i64) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .expect("valid epoch")
        + chrono::Duration::days(days)
}

fn seconds_from_midnight(seconds: u32) -> chrono::NaiveTime {
    chrono::NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default()
}

/// TIME/DATETIME2 carry 100ns increments past midnight.
fn time_from_increments(increments: u64) -> chrono::NaiveTime {
    chrono::NaiveTime::from_num_seconds_from_midnight_opt(
        (increments / 10_000_000) as u32,
        ((increments % 10_000_000) * 100) as u32,
    )
    .unwrap_or_default()
}

fn datetime2_to_naive(dt: tiberius::time::DateTime2) -> chrono::NaiveDateTime {
    chrono::NaiveDateTime::new(
        date_from_days(1, 1, 1, dt.date().days() as i64),
        time_from_increments(dt.time().increments()),
    )
}

/// Owned parameter value for the tiberius placeholder slice.
#[derive(Debug)]
pub(crate) enum MssqlParam {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
}

impl tiberius::ToSql for MssqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            MssqlParam::Null => ColumnData::I32(None),
            MssqlParam::Bool(v) => ColumnData::Bit(Some(*v)),
            MssqlParam::I16(v) => ColumnData::I16(Some(*v)),
            MssqlParam::I32(v) => ColumnData::I32(Some(*v)),
            MssqlParam::I64(v) => ColumnData::I64(Some(*v)),
            MssqlParam::F32(v) => ColumnData::F32(Some(*v)),
            MssqlParam::F64(v) => ColumnData::F64(Some(*v)),
            MssqlParam::String(v) => {
                ColumnData::String(Some(std::borrow::Cow::Borrowed(v.as_str())))
            }
            MssqlParam::Bytes(v) => {
                ColumnData::Binary(Some(std::borrow::Cow::Borrowed(v.as_slice())))
            }
            MssqlParam::Uuid(v) => ColumnData::Guid(Some(*v)),
        }
    }
}

/// Convert a core [`Value`] into a placeholder parameter. Temporal and
/// decimal values travel as strings and convert server-side.
pub(crate) fn value_to_param(value: &Value) -> MssqlParam {
    match value {
        Value::Null => MssqlParam::Null,
        Value::Bool(b) => MssqlParam::Bool(*b),
        Value::Int16(i) => MssqlParam::I16(*i),
        Value::Int32(i) => MssqlParam::I32(*i),
        Value::Int64(i) => MssqlParam::I64(*i),
        Value::Float32(f) => MssqlParam::F32(*f),
        Value::Float64(f) => MssqlParam::F64(*f),
        Value::Decimal(d) => MssqlParam::String(d.clone()),
        Value::String(s) => MssqlParam::String(s.clone()),
        Value::Bytes(b) => MssqlParam::Bytes(b.clone()),
        Value::Uuid(u) => MssqlParam::Uuid(*u),
        Value::Date(d) => MssqlParam::String(d.to_string()),
        Value::Time(t) => MssqlParam::String(t.to_string()),
        Value::DateTime(dt) => MssqlParam::String(dt.to_string()),
        Value::DateTimeUtc(dt) => MssqlParam::String(dt.to_rfc3339()),
    }
}
