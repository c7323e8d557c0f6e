#![warn(missing_docs)]
#![forbid(unsafe_code)]
// Allow needless `return` because that makes it sometimes more obvious that
// an expression is the result of the function
#![allow(clippy::needless_return)]
// Allow `assert_eq!(true, ...)` because in some cases it is used to check a bool
// value and not a 'flag' / 'state', and `assert_eq!` makes that more explicit
#![allow(clippy::bool_assert_comparison)]
// Enable 'unused' warnings for doc tests (are disabled by default)
#![doc(test(no_crate_inject))]
#![doc(test(attr(warn(unused))))]
// Fail on warnings in doc tests
#![doc(test(attr(deny(warnings))))]
// When `docsrs` configuration flag is set enable banner for features in documentation
// See https://stackoverflow.com/q/61417452
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chainjson parses JSON text into an in-memory tree and writes such a tree back out
//! as compact JSON text.
//!
//! Parsing, writing and freeing a tree all happen in a single iterative pass, without
//! recursion. Deeply nested input can therefore never overflow the call stack; depth
//! is only limited by available memory. The parser accepts a superset of JSON, see
//! the [`reader`] module for details.
//!
//! # Terminology
//!
//! This crate uses the same terminology as the JSON specification:
//!
//! - *object*: `{ ... }`
//!   - *member*: Entry in an object. For example the JSON object `{"a": 1}` has the member
//!     `"a": 1` where `"a"` is the member *name* and `1` is the member *value*.
//! - *array*: `[ ... ]`
//! - *literal*:
//!   - *boolean*: `true` or `false`
//!   - `null`
//! - *number*: number value, for example `123.4e+10`
//! - *string*: string value, for example `"text in \"quotes\""`
//!
//! The parser does not classify scalars: literals and numbers in the input are stored
//! as strings. Documents built with the [`tree`] API can contain numbers and literals.
//!
//! # Usage examples
//!
//! ## Reading
//!
//! ```
//! # use chainjson::tree::*;
//! // In this example JSON data comes from a string;
//! // normally it would come from a file or a network connection
//! let json = r#"{"a": [1, true]}"#;
//! let document = chainjson::parse(json.as_bytes())?;
//!
//! let object = document.root().as_object().unwrap();
//! let array: Vec<_> = value_of("a", object).unwrap().elements().unwrap().collect();
//! assert_eq!(Some("1"), array[0].as_str());
//! assert_eq!(Some("true"), array[1].as_str());
//!
//! let stats = chainjson::destroy(document);
//! assert_eq!(5, stats.released_nodes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Writing
//! ```
//! # use chainjson::tree::*;
//! let mut document = Document::new_object()?;
//! let root = document.root_id();
//! let array = document.add_member(root, "a", NewValue::Array)?;
//! document.add_element(array, 1)?;
//! document.add_element(array, true)?;
//!
//! // In this example JSON bytes are stored in a Vec;
//! // normally they would be written to a file or network connection
//! let mut writer = Vec::<u8>::new();
//! chainjson::serialize_to_writer(&document, &mut writer)?;
//!
//! assert_eq!("{\"a\":[1,true]}\n", String::from_utf8(writer)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod reader;
pub mod tree;
pub mod writer;

mod json_number;
mod utf8;

pub use reader::{parse, parse_custom, parse_slice, parse_str, ParseError, ParserSettings};
pub use tree::{destroy, find_member, string_of, value_of, Document};
pub use writer::{
    serialize_to_sink, serialize_to_string, serialize_to_vec, serialize_to_writer,
    SerializeError,
};
