//! Module for writing a [`Document`] as compact JSON text
//!
//! The output is produced by a single non-recursive walk over the tree. It is
//! written to a [`JsonSink`]; [`JsonStreamSink`] is an implementation which writes
//! to a [`Write`] in a streaming way, and `Vec<u8>` collects the output in memory.
//!
//! String values and member names are written verbatim between quotes, without
//! re-escaping. A string which contained an escaped `"` in the input is therefore
//! not written back as valid JSON.
//!
//! # Examples
//! ```
//! # use chainjson::tree::*;
//! let mut document = Document::new_object()?;
//! let root = document.root_id();
//! let list = document.add_member(root, "list", NewValue::Array)?;
//! document.add_element(list, "text")?;
//! document.add_element(list, 1.5)?;
//!
//! let json = chainjson::serialize_to_string(&document)?;
//! assert_eq!(r#"{"list":["text",1.5]}"#, json);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{io::Write, str::Utf8Error};

use thiserror::Error;

use crate::tree::Document;

mod serializer;
mod stream_sink;
// Re-export streaming implementation under `writer` module
pub use stream_sink::*;

type IoError = std::io::Error;

/// Error which occurred while serializing a document
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SerializeError {
    /// An IO error occurred while writing to the underlying writer
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    /// A floating point value is NaN or infinite, which cannot be represented in JSON
    #[error("non-finite number {value}")]
    NonFiniteNumber {
        /// The non-finite value
        value: f64,
    },
    /// The document contains a value slot which was never filled
    #[error("uninitialized value")]
    UninitializedValue,
    /// The output is not valid UTF-8, because a string value or member name is not
    #[error("output is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] Utf8Error),
    /// Memory for the output or the traversal could not be reserved
    #[error("allocation failure")]
    AllocationFailure,
}

/// Destination for serialized JSON text
///
/// The serializer only appends bytes; implementations decide how to buffer them.
pub trait JsonSink {
    /// Appends the bytes to the output
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerializeError>;
}

/// Collects the output in memory
impl JsonSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerializeError> {
        self.try_reserve(bytes.len())
            .map_err(|_| SerializeError::AllocationFailure)?;
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Writes the document to the sink
///
/// Nothing is written after the document, and the sink is not flushed.
pub fn serialize_to_sink<S: JsonSink + ?Sized>(
    document: &Document,
    sink: &mut S,
) -> Result<(), SerializeError> {
    serializer::serialize(document, sink)
}

/// Writes the document as bytes
pub fn serialize_to_vec(document: &Document) -> Result<Vec<u8>, SerializeError> {
    let mut bytes = Vec::new();
    serialize_to_sink(document, &mut bytes)?;
    Ok(bytes)
}

/// Writes the document as `String`
///
/// Fails with [`SerializeError::InvalidUtf8`] if a string value or member name
/// is not valid UTF-8; [`serialize_to_vec`] can be used for such documents.
pub fn serialize_to_string(document: &Document) -> Result<String, SerializeError> {
    let bytes = serialize_to_vec(document)?;
    String::from_utf8(bytes).map_err(|e| SerializeError::InvalidUtf8(e.utf8_error()))
}

/// Writes the document to `writer` with [default settings](SinkSettings::default)
///
/// The output ends with a line break, and the writer is flushed.
pub fn serialize_to_writer<W: Write>(document: &Document, writer: W) -> Result<(), SerializeError> {
    let mut sink = JsonStreamSink::new(writer);
    serialize_to_sink(document, &mut sink)?;
    sink.finish_document()
}
