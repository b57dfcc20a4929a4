//! Typed result batches

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ProcError, Result};
use crate::materializer::read_result_set;
use crate::record::ProcRecord;
use crate::transport::RoutineCursor;

/// Everything a call produced on the result-set side.
///
/// `matched` is the number of declared batch types that actually
/// consumed a result set: when the routine returns fewer result sets
/// than were declared (or more), the surplus is dropped and `matched`
/// makes that observable instead of silent.
#[derive(Debug)]
pub struct CallOutcome<B> {
    /// One typed batch per declared output type, in result-set order.
    /// Batches past `matched` are empty.
    pub batches: B,
    /// Number of declared types that matched a returned result set
    pub matched: usize,
}

impl<A> CallOutcome<(Vec<A>,)> {
    /// Convenience for single-batch calls
    pub fn into_rows(self) -> Vec<A> {
        self.batches.0
    }
}

/// The declared output types of a call, in result-set order.
///
/// Implemented for tuples of `Vec<R>` up to four result sets; `()`
/// declares that all result sets are ignored.
#[async_trait]
pub trait ResultBatches: Sized + Send {
    /// Number of declared output types
    const DECLARED: usize;

    /// Consume `min(declared, returned)` result sets from the cursor.
    async fn materialize(
        cursor: &mut dyn RoutineCursor,
        stream_dir: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<(Self, usize)>;
}

#[async_trait]
impl ResultBatches for () {
    const DECLARED: usize = 0;

    async fn materialize(
        _cursor: &mut dyn RoutineCursor,
        _stream_dir: Option<&Path>,
        _cancel: &CancellationToken,
    ) -> Result<(Self, usize)> {
        Ok(((), 0))
    }
}

macro_rules! impl_result_batches {
    ($count:expr; $($ty:ident => $var:ident),+) => {
        #[async_trait]
        impl<$($ty: ProcRecord),+> ResultBatches for ($(Vec<$ty>,)+) {
            const DECLARED: usize = $count;

            async fn materialize(
                cursor: &mut dyn RoutineCursor,
                stream_dir: Option<&Path>,
                cancel: &CancellationToken,
            ) -> Result<(Self, usize)> {
                let mut matched = 0usize;
                let mut exhausted = false;
                $(
                    let $var: Vec<$ty> = if exhausted {
                        Vec::new()
                    } else {
                        let columns = tokio::select! {
                            _ = cancel.cancelled() => return Err(ProcError::Cancelled),
                            columns = cursor.next_result() => columns?,
                        };
                        match columns {
                            Some(columns) => {
                                matched += 1;
                                read_result_set::<$ty>(cursor, &columns, stream_dir, cancel)
                                    .await?
                            }
                            None => {
                                exhausted = true;
                                Vec::new()
                            }
                        }
                    };
                )+
                let _ = exhausted;
                Ok((($($var,)+), matched))
            }
        }
    };
}

impl_result_batches!(1; A => a);
impl_result_batches!(2; A => a, B => b);
impl_result_batches!(3; A => a, B => b, C => c);
impl_result_batches!(4; A => a, B => b, C => c, D => d);
