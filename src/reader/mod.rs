//! Module for parsing JSON text into a [`Document`]
//!
//! [`parse`] consumes bytes from any [`Read`] in blocks and builds the tree in a single
//! pass, one byte at a time, without recursion and without backtracking. The accepted
//! syntax is a superset of JSON:
//!
//! - member names and values may be unquoted, for example `{a: b}`
//! - C-style escape sequences are supported in addition to the JSON ones:
//!   `\a`, `\v`, `\0`, `\xHH`, `\UHHHHHHHH` and 3-digit octal escapes `\NNN`
//!   (first digit `1` to `3`), see [`ParserSettings::allow_c_escapes`]
//! - `\u` and `\U` escapes are encoded as UTF-8 individually; surrogate pairs are
//!   not combined, and code points up to `0x7FFFFFFF` are encoded with up to 6 bytes
//!
//! Scalar values are not classified: `true`, `null` and numbers are stored as
//! string values, exactly like quoted strings.
//!
//! # Examples
//! ```
//! # use chainjson::tree::*;
//! let document = chainjson::parse_str(r#"{"name": "value", "list": [1, true]}"#)?;
//! assert_eq!(RootKind::Object, document.kind());
//!
//! let object = document.root().as_object().unwrap();
//! assert_eq!(Some(&b"value"[..]), string_of("name", object));
//!
//! let list: Vec<&str> = value_of("list", object)
//!     .and_then(|list| list.elements())
//!     .unwrap()
//!     .filter_map(|element| element.as_str())
//!     .collect();
//! assert_eq!(vec!["1", "true"], list);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fmt::{Display, Formatter},
    io::{ErrorKind, Read},
};

use log::debug;
use thiserror::Error;

use crate::tree::Document;

mod accumulator;
mod builder;
mod decoder;

use self::{
    accumulator::{Accumulator, DEFAULT_CHUNK_CAPACITY},
    builder::{BuildFailure, Builder},
    decoder::{DecodeFailure, Decoder},
};

type IoError = std::io::Error;

/// Default number of bytes requested from the underlying reader at once
pub const DEFAULT_READ_BLOCK_SIZE: usize = 10_000;

/// Position in the JSON input
///
/// # Examples
/// Consider the following input:
/// ```json
/// {
///   "a": }
/// ```
/// The position of the `}` is line 2, column 8, byte 9.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct InputPosition {
    /// Line number, starting at 1
    ///
    /// Only LF (`\n`) is considered a line break, including LF inside quoted strings.
    pub line: u64,
    /// Byte column within the current line, starting at 1
    pub column: u64,
    /// Byte position within the input, starting at 0
    pub byte_pos: u64,
}

impl Display for InputPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}, column {} (byte {})",
            self.line, self.column, self.byte_pos
        )
    }
}

/// Describes why the structure of the input is invalid
#[non_exhaustive]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum StructuralErrorKind {
    /// A closing bracket (`]` or `}`) was encountered outside of any open structure
    UnexpectedCloser,
    /// A closing bracket does not match the open structure, for example `[1}`
    MismatchedCloser,
    /// An object member has a name but no `:` and value, for example `{"a"}`
    MemberWithoutValue,
    /// An object member has a name and `:` but no value, for example `{"a":}`
    NameWithoutValue,
    /// An object member has no name, for example `{:1}`
    MissingName,
    /// An array element is empty, for example `[1,,2]`
    EmptyValue,
    /// A trailing comma was used, for example `[1,]`
    TrailingComma,
    /// Text follows a closed object or array, for example `[[] 1]`
    TrailingText,
    /// A colon (`:`) was encountered outside of an object member name position
    UnexpectedColon,
    /// A comma (`,`) was encountered where no value can follow
    UnexpectedComma,
    /// A comma (`,`) is missing between two objects or arrays, for example `[[][]]`
    MissingComma,
    /// Text precedes an opening bracket, for example `[a{}]`
    TextBeforeComposite,
    /// A second top-level object or array follows the first one
    MultipleRoots,
    /// A node could not be linked into the tree
    InvalidLink,
}

/// Describes why an escape sequence is invalid
#[non_exhaustive]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum DecodeErrorKind {
    /// A `\xHH` escape contains a non-hexadecimal digit
    InvalidHexDigit,
    /// A `\NNN` escape contains a non-octal digit
    InvalidOctalDigit,
    /// A `\uHHHH` or `\UHHHHHHHH` escape contains a non-hexadecimal digit
    InvalidUnicodeDigit,
    /// A `\UHHHHHHHH` escape denotes a code point larger than `0x7FFFFFFF`
    CodePointOutOfRange,
}

/// Error which occurred while parsing
///
/// Parsing stops at the first error, and everything built so far is released
/// before the error is returned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParseError {
    /// Memory for the tree, the cursor stack or the pending token could not be reserved
    #[error("allocation failure at {position}")]
    AllocationFailure {
        /// Position of the byte being processed
        position: InputPosition,
    },
    /// The input is not structured correctly
    #[error("structural error {kind} at {position}")]
    StructuralError {
        /// Kind of the error
        kind: StructuralErrorKind,
        /// Position of the byte which caused the error
        position: InputPosition,
    },
    /// An escape sequence is malformed
    #[error("decode error {kind} at {position}")]
    DecodeError {
        /// Kind of the error
        kind: DecodeErrorKind,
        /// Position of the offending byte
        position: InputPosition,
    },
    /// The input ended inside an open object, array, string or escape sequence, or
    /// it contained no value at all
    #[error("unexpected end of input at {position}")]
    UnexpectedEof {
        /// Position at the end of the input
        position: InputPosition,
    },
    /// An IO error occurred while reading from the underlying reader
    #[error("IO error '{error}' at (roughly) {position}")]
    IoError {
        /// The IO error which occurred
        error: IoError,
        /// Position of the next byte which would have been processed
        position: InputPosition,
    },
}

impl ParseError {
    /// Position in the input where the error occurred
    pub fn position(&self) -> InputPosition {
        match self {
            ParseError::AllocationFailure { position }
            | ParseError::StructuralError { position, .. }
            | ParseError::DecodeError { position, .. }
            | ParseError::UnexpectedEof { position }
            | ParseError::IoError { position, .. } => *position,
        }
    }
}

/// Settings to customize the parser behavior
///
/// The settings are normally constructed by overwriting some of the default settings:
/// ```
/// # use chainjson::reader::ParserSettings;
/// ParserSettings {
///     allow_c_escapes: false,
///     // For all other settings use the default
///     ..Default::default()
/// }
/// # ;
/// ```
#[derive(Clone, Debug)]
pub struct ParserSettings {
    /// Number of bytes requested from the underlying reader at once
    ///
    /// This only affects performance, never the parse result.
    pub read_block_size: usize,

    /// Whether to decode the C-style escape sequences
    ///
    /// When enabled, `\a`, `\v`, `\0`, `\xHH`, `\UHHHHHHHH` and 3-digit octal escapes
    /// such as `\101` are decoded. When disabled, the character following the `\` is
    /// taken literally for these escapes, the same way as for any other unknown escape
    /// sequence. The JSON escape sequences (including `\uHHHH`) are always decoded.
    pub allow_c_escapes: bool,

    /// Capacity in bytes of each chunk of the pending token buffer
    ///
    /// Tokens longer than this are buffered in multiple chunks. This only affects
    /// performance and memory usage.
    pub initial_token_capacity: usize,
}

impl Default for ParserSettings {
    /// Creates the default parser settings
    ///
    /// - read block size: 10000 bytes
    /// - C-style escapes: enabled
    /// - token buffer chunk capacity: 1000 bytes
    fn default() -> Self {
        ParserSettings {
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
            allow_c_escapes: true,
            initial_token_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

/// Combines decoder, token buffer and builder, and converts their failures
/// into [`ParseError`]s
struct Parser {
    decoder: Decoder,
    acc: Accumulator,
    builder: Builder,
}

impl Parser {
    fn new(settings: &ParserSettings) -> Self {
        Parser {
            decoder: Decoder::new(settings.allow_c_escapes),
            acc: Accumulator::new(settings.initial_token_capacity),
            builder: Builder::new(),
        }
    }

    fn feed(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        for &byte in bytes {
            let position = self.decoder.position();
            let token = match self.decoder.feed(byte, &mut self.acc) {
                Ok(Some(token)) => token,
                Ok(None) => continue,
                Err(DecodeFailure::Decode(kind)) => {
                    return Err(ParseError::DecodeError { kind, position })
                }
                Err(DecodeFailure::Allocation) => {
                    return Err(ParseError::AllocationFailure { position })
                }
            };
            self.builder
                .handle(token, &mut self.acc)
                .map_err(|e| build_error(e, position))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Document, ParseError> {
        let position = self.decoder.position();
        if !self.decoder.is_idle() {
            return Err(ParseError::UnexpectedEof { position });
        }
        let root = self
            .builder
            .finish(&mut self.acc)
            .map_err(|e| build_error(e, position))?
            .ok_or(ParseError::UnexpectedEof { position })?;

        let builder = std::mem::replace(&mut self.builder, Builder::new());
        let document = Document::from_parts(builder.into_tree(), root);
        let audit = document.allocation_audit();
        debug!(
            "parsed {} bytes into {} nodes ({} payload bytes)",
            position.byte_pos, audit.live_nodes, audit.live_payload_bytes
        );
        Ok(document)
    }

    fn abort(self, error: &ParseError) {
        debug!("parsing failed: {error}");
        self.builder.abort();
    }
}

fn build_error(failure: BuildFailure, position: InputPosition) -> ParseError {
    match failure {
        BuildFailure::Structural(kind) => ParseError::StructuralError { kind, position },
        BuildFailure::Allocation => ParseError::AllocationFailure { position },
    }
}

fn read_all<R: Read>(
    parser: &mut Parser,
    mut reader: R,
    settings: &ParserSettings,
) -> Result<Document, ParseError> {
    let block_size = settings.read_block_size.max(1);
    let mut block = Vec::new();
    block
        .try_reserve_exact(block_size)
        .map_err(|_| ParseError::AllocationFailure {
            position: parser.decoder.position(),
        })?;
    block.resize(block_size, 0);

    loop {
        let read_count = match reader.read(&mut block) {
            Ok(0) => break,
            Ok(read_count) => read_count,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(ParseError::IoError {
                    error,
                    position: parser.decoder.position(),
                })
            }
        };
        parser.feed(&block[..read_count])?;
    }
    parser.finish()
}

/// Parses the JSON text from `reader` with [default settings](ParserSettings::default)
///
/// The reader is read until its end; it does not have to be buffered.
pub fn parse<R: Read>(reader: R) -> Result<Document, ParseError> {
    parse_custom(reader, ParserSettings::default())
}

/// Parses the JSON text from `reader` with custom settings
pub fn parse_custom<R: Read>(reader: R, settings: ParserSettings) -> Result<Document, ParseError> {
    let mut parser = Parser::new(&settings);
    let result = read_all(&mut parser, reader, &settings);
    if let Err(e) = &result {
        parser.abort(e);
    }
    result
}

/// Parses the JSON text in `bytes`
pub fn parse_slice(bytes: &[u8]) -> Result<Document, ParseError> {
    let settings = ParserSettings::default();
    let mut parser = Parser::new(&settings);
    let result = parser.feed(bytes).and_then(|_| parser.finish());
    if let Err(e) = &result {
        parser.abort(e);
    }
    result
}

/// Parses the JSON text in `text`
pub fn parse_str(text: &str) -> Result<Document, ParseError> {
    parse_slice(text.as_bytes())
}
