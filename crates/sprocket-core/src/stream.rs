//! Stream destinations for large column values
//!
//! A field carrying a stream directive does not receive its column value
//! directly; the raw bytes are copied into a file or an in-memory buffer
//! first. Every destination is flushed and closed before the next field
//! is processed, except a [`MemoryShape::Handle`] buffer whose lifetime
//! the caller explicitly takes over.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{ConvertError, ProcError, Result};
use crate::types::Value;

/// What a memory destination delivers to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryShape {
    /// The finished byte array
    Bytes,
    /// The finished buffer decoded as UTF-8 text
    Text,
    /// An open handle to the populated buffer; the caller owns it
    Handle,
}

/// Destination for a streamed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSpec {
    /// Copy the column to a file under the caller-configured base
    /// directory. The file name is read from `name_field` on the same
    /// record, so that field must precede this one in declaration order.
    ToFile {
        name_field: &'static str,
    },
    /// Copy the column to an in-memory buffer
    ToMemory(MemoryShape),
}

/// What a stream destination hands back to the record.
#[derive(Debug)]
pub enum StreamPayload {
    /// Finished byte array (memory destination, [`MemoryShape::Bytes`])
    Bytes(Vec<u8>),
    /// Finished decoded text (memory destination, [`MemoryShape::Text`])
    Text(String),
    /// Open handle to the populated buffer ([`MemoryShape::Handle`]);
    /// the caller is responsible for its lifetime
    Handle(MemoryStream),
}

/// A readable, seekable handle over a populated in-memory buffer.
#[derive(Debug)]
pub struct MemoryStream {
    inner: Cursor<Vec<u8>>,
}

impl MemoryStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    /// Length of the underlying buffer
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Consume the handle, returning the buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Raw bytes of a streamable column value. Character data streams as its
/// UTF-8 encoding.
pub(crate) fn raw_bytes(value: Value) -> std::result::Result<Vec<u8>, ConvertError> {
    match value {
        Value::Bytes(b) => Ok(b),
        Value::String(s) => Ok(s.into_bytes()),
        other => Err(ConvertError::new(other.kind(), "streamable bytes")),
    }
}

/// Build the payload for a memory destination.
pub(crate) fn memory_payload(
    shape: MemoryShape,
    data: Vec<u8>,
) -> std::result::Result<StreamPayload, ConvertError> {
    match shape {
        MemoryShape::Bytes => Ok(StreamPayload::Bytes(data)),
        MemoryShape::Text => match String::from_utf8(data) {
            Ok(text) => Ok(StreamPayload::Text(text)),
            Err(_) => Err(ConvertError::new("bytes", "utf-8 text")),
        },
        MemoryShape::Handle => Ok(StreamPayload::Handle(MemoryStream::new(data))),
    }
}

/// Copy column data to a file, honoring cancellation. The file is
/// flushed and closed before returning.
pub(crate) async fn copy_to_file(
    path: &Path,
    data: &[u8],
    cancel: &CancellationToken,
) -> Result<()> {
    let mut file = tokio::select! {
        _ = cancel.cancelled() => return Err(ProcError::Cancelled),
        file = tokio::fs::File::create(path) => file?,
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(ProcError::Cancelled),
        result = async {
            file.write_all(data).await?;
            file.flush().await?;
            Ok(())
        } => result,
    }
}
