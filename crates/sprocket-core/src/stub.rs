//! Scripted in-memory transport, used as a test double
//!
//! Result sets and output parameter values are loaded up front; every
//! executed call is recorded so tests can assert on exactly what reached
//! the wire (parameter omission, open/close pairing, enrollment).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::binder::ParamBinding;
use crate::error::{ProcError, Result};
use crate::transport::{RoutineCall, RoutineCursor, RoutineTransport, TransactionHandle};
use crate::types::{ParamValue, Value};

/// One scripted result set.
#[derive(Debug, Clone)]
pub struct StubResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// A call as the stub received it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub routine: String,
    pub params: Vec<ParamBinding>,
    pub timeout: Option<Duration>,
    pub transaction: Option<TransactionHandle>,
}

#[derive(Debug, Default)]
struct StubScript {
    result_sets: Vec<StubResultSet>,
    outputs: Vec<(String, Value)>,
    echo_outputs: bool,
    fail_open: Option<String>,
    fail_execute: Option<String>,
    fail_row: Option<String>,
    hang_open: bool,
    hang_execute: bool,
    hang_row: bool,
}

/// Scripted transport for tests.
#[derive(Debug, Default)]
pub struct StubTransport {
    script: Mutex<StubScript>,
    calls: Mutex<Vec<RecordedCall>>,
    open: AtomicBool,
    opens: AtomicU64,
    closes: AtomicU64,
    next_tx: AtomicU64,
    tx_log: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a result set, in return order.
    pub fn with_result_set(
        self,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Self {
        self.script.lock().unwrap().result_sets.push(StubResultSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        });
        self
    }

    /// Script an output parameter value.
    pub fn with_output(self, name: &str, value: Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .outputs
            .push((name.to_string(), value));
        self
    }

    /// Echo every writable parameter's input value back as its output
    /// value.
    pub fn echo_outputs(self) -> Self {
        self.script.lock().unwrap().echo_outputs = true;
        self
    }

    /// Fail the next open with the given message.
    pub fn fail_on_open(self, message: &str) -> Self {
        self.script.lock().unwrap().fail_open = Some(message.to_string());
        self
    }

    /// Fail execution with the given message.
    pub fn fail_on_execute(self, message: &str) -> Self {
        self.script.lock().unwrap().fail_execute = Some(message.to_string());
        self
    }

    /// Fail the first row fetch with the given message.
    pub fn fail_on_row(self, message: &str) -> Self {
        self.script.lock().unwrap().fail_row = Some(message.to_string());
        self
    }

    /// Never complete the open; lets tests drive cancellation.
    pub fn hang_on_open(self) -> Self {
        self.script.lock().unwrap().hang_open = true;
        self
    }

    /// Never complete execution; lets tests drive cancellation.
    pub fn hang_on_execute(self) -> Self {
        self.script.lock().unwrap().hang_execute = true;
        self
    }

    /// Never complete a row fetch; lets tests drive cancellation.
    pub fn hang_on_row(self) -> Self {
        self.script.lock().unwrap().hang_row = true;
        self
    }

    /// Pretend the caller already opened the connection.
    pub fn mark_open(self) -> Self {
        self.open.store(true, Ordering::SeqCst);
        self
    }

    /// Calls executed so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times the invoker opened the connection.
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of times the invoker closed the connection.
    pub fn close_count(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Transaction operations seen, in order ("begin 1", "commit 1", ...).
    pub fn transaction_log(&self) -> Vec<String> {
        self.tx_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoutineTransport for StubTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> Result<()> {
        let (fail, hang) = {
            let script = self.script.lock().unwrap();
            (script.fail_open.clone(), script.hang_open)
        };
        if hang {
            return std::future::pending().await;
        }
        if let Some(message) = fail {
            return Err(ProcError::transport("", message));
        }
        self.open.store(true, Ordering::SeqCst);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, call: RoutineCall<'_>) -> Result<Box<dyn RoutineCursor>> {
        let routine = call.routine.to_string();

        self.calls.lock().unwrap().push(RecordedCall {
            routine: routine.clone(),
            params: call.params.to_vec(),
            timeout: call.timeout,
            transaction: call.transaction,
        });

        let (sets, outputs, fail_execute, fail_row, hang, hang_row) = {
            let script = self.script.lock().unwrap();
            let outputs = if script.echo_outputs {
                call.params
                    .iter()
                    .filter(|b| b.direction.writes_back())
                    .map(|b| {
                        let value = match &b.value {
                            ParamValue::Scalar(v) => v.clone(),
                            _ => Value::Null,
                        };
                        (b.name.clone(), value)
                    })
                    .collect()
            } else {
                script.outputs.clone()
            };
            (
                script.result_sets.clone(),
                outputs,
                script.fail_execute.clone(),
                script.fail_row.clone(),
                script.hang_execute,
                script.hang_row,
            )
        };

        if hang {
            return std::future::pending().await;
        }
        if let Some(message) = fail_execute {
            return Err(ProcError::transport(&routine, message));
        }

        Ok(Box::new(StubCursor {
            routine,
            sets: sets.into(),
            current: None,
            outputs,
            fail_row,
            hang_row,
        }))
    }

    async fn begin(&self) -> Result<TransactionHandle> {
        let tx = TransactionHandle(self.next_tx.fetch_add(1, Ordering::SeqCst) + 1);
        self.tx_log.lock().unwrap().push(format!("begin {}", tx.0));
        Ok(tx)
    }

    async fn commit(&self, tx: TransactionHandle) -> Result<()> {
        self.tx_log.lock().unwrap().push(format!("commit {}", tx.0));
        Ok(())
    }

    async fn rollback(&self, tx: TransactionHandle) -> Result<()> {
        self.tx_log
            .lock()
            .unwrap()
            .push(format!("rollback {}", tx.0));
        Ok(())
    }
}

struct StubCursor {
    routine: String,
    sets: VecDeque<StubResultSet>,
    current: Option<VecDeque<Vec<Value>>>,
    outputs: Vec<(String, Value)>,
    fail_row: Option<String>,
    hang_row: bool,
}

#[async_trait]
impl RoutineCursor for StubCursor {
    async fn next_result(&mut self) -> Result<Option<Vec<String>>> {
        match self.sets.pop_front() {
            Some(set) => {
                self.current = Some(set.rows.into());
                Ok(Some(set.columns))
            }
            None => {
                self.current = None;
                Ok(None)
            }
        }
    }

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.hang_row {
            return std::future::pending().await;
        }
        if let Some(message) = self.fail_row.take() {
            return Err(ProcError::transport(&self.routine, message));
        }
        Ok(self.current.as_mut().and_then(|rows| rows.pop_front()))
    }

    async fn finish(self: Box<Self>) -> Result<Vec<(String, Value)>> {
        Ok(self.outputs)
    }
}
