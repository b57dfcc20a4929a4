//! MS SQL Server transport for sprocket stored-routine calls
//!
//! Executes bound routine calls over tiberius. Output and return
//! parameters come back through a synthesized T-SQL batch: locals are
//! declared for every writable parameter, passed with OUTPUT markers,
//! and selected as a final result set that the cursor peels off before
//! the caller sees it.

mod batch;
mod config;
mod transport;

#[cfg(test)]
mod batch_tests;
#[cfg(test)]
mod transport_tests;

pub use config::MssqlConfig;
pub use transport::{MssqlTransport, MssqlTransportError};
