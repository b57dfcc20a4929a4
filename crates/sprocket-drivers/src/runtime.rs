//! Tokio runtime for calling routines from synchronous code
//!
//! The invoker is async end to end, but plenty of host applications are
//! not. A shared runtime lets those callers drive a call to completion
//! without owning a runtime themselves.

use std::sync::OnceLock;
use tokio::runtime::Runtime;

/// Global Tokio runtime for blocking callers
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or create the shared Tokio runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be created.
pub fn get_tokio_runtime() -> &'static Runtime {
    TOKIO_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("sprocket-driver-runtime")
            .build()
            .expect("Failed to create Tokio runtime for routine calls")
    })
}

/// Run a routine call (or any future) to completion on the shared
/// runtime, blocking the current thread.
///
/// ```ignore
/// let outcome = block_on_tokio(async {
///     descriptor.call::<(Vec<Staff>,)>(&transport, Some(&mut input), options).await
/// })?;
/// ```
pub fn block_on_tokio<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    get_tokio_runtime().block_on(future)
}
