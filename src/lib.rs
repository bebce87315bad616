//! Reflection-driven decoding of Protocol Buffers messages into flat
//! key/value arguments.
//!
//! Given a [`SchemaRegistry`] describing message types and the raw bytes of a
//! serialized message, an [`ArgsParser`] walks every present field (nested
//! messages, repeated fields and registered extensions included) and emits
//! each leaf value to an [`ArgsSink`] under a dotted path such as
//! `a.b[2].c`. No generated per-message code is involved, so the set of
//! decodable types is whatever the registry describes at runtime.
//!
//! Each emission carries two paths: the indexed `key` (`items[1].name`) and
//! the `flat_key` with array indices removed (`items.name`), which groups all
//! elements of a repeated field under one logical name.
//!
//! # Usage
//!
//! ```
//! use proto_args::{
//!     ArgsParser, ArgsSink, ArrayIndexTracker, FieldDescriptor, FieldKind, Key,
//!     MessageDescriptor, SchemaRegistry,
//! };
//!
//! /// Sink that records each value as a (key, text) pair.
//! #[derive(Default)]
//! struct RecordingSink {
//!     values: Vec<(String, String)>,
//!     indexes: ArrayIndexTracker,
//! }
//!
//! impl RecordingSink {
//!     fn record(&mut self, key: &Key, value: String) {
//!         self.values.push((key.key.clone(), value));
//!     }
//! }
//!
//! impl ArgsSink for RecordingSink {
//!     fn add_integer(&mut self, key: &Key, value: i64) {
//!         self.record(key, value.to_string());
//!     }
//!     fn add_unsigned_integer(&mut self, key: &Key, value: u64) {
//!         self.record(key, value.to_string());
//!     }
//!     fn add_double(&mut self, key: &Key, value: f64) {
//!         self.record(key, value.to_string());
//!     }
//!     fn add_boolean(&mut self, key: &Key, value: bool) {
//!         self.record(key, value.to_string());
//!     }
//!     fn add_string(&mut self, key: &Key, value: &str) {
//!         self.record(key, value.to_string());
//!     }
//!     fn add_pointer(&mut self, key: &Key, value: u64) {
//!         self.record(key, format!("{:#x}", value));
//!     }
//!     fn add_json(&mut self, key: &Key, value: &str) -> bool {
//!         self.record(key, value.to_string());
//!         true
//!     }
//!     fn next_array_index(&mut self, flat_key: &str) -> usize {
//!         self.indexes.next(flat_key)
//!     }
//!     fn advance_array_index(&mut self, flat_key: &str) -> usize {
//!         self.indexes.advance(flat_key)
//!     }
//! }
//!
//! fn main() -> Result<(), proto_args::ParseError> {
//!     let mut registry = SchemaRegistry::new();
//!     registry.register_message(
//!         MessageDescriptor::new("example.Event")
//!             .field(FieldDescriptor::new(1, "id", FieldKind::UInt64))
//!             .field(FieldDescriptor::new(2, "name", FieldKind::String)),
//!     );
//!
//!     // id = 150, name = "hi"
//!     let message = [0x08, 0x96, 0x01, 0x12, 0x02, 0x68, 0x69];
//!
//!     let mut parser = ArgsParser::new(&registry);
//!     let mut sink = RecordingSink::default();
//!     parser.parse_message(&message, "example.Event", None, &mut sink)?;
//!
//!     assert_eq!(
//!         sink.values,
//!         [
//!             ("id".to_string(), "150".to_string()),
//!             ("name".to_string(), "hi".to_string()),
//!         ]
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Design
//!
//! Decoding is best-effort in the direction that favors partial results: the
//! walk stops at the first failure, but everything emitted before it stays in
//! the sink. Forward compatibility is favored in the other direction: field
//! numbers and enum values the schema does not know are skipped or demoted to
//! their raw numeric value rather than failing the parse.
//!
//! Callers can take over decoding of individual fields by registering
//! overrides ([`ArgsParser::register_override`]) keyed by dotted field path,
//! e.g. to flatten a verbose sub-message into one synthetic value.

// This crate parses potentially untrusted bytes, so it is preferable to
// avoid unsafe code.
#![forbid(unsafe_code)]

mod key;
mod parser;
pub mod schema;
pub mod sink;
pub mod wire;

pub use key::{Key, KeyScope};
pub use parser::{ArgsParser, OverrideOutcome, ParseError, ParsingOverride};
pub use schema::{
    EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, SchemaRegistry,
    UnknownTypeError,
};
pub use sink::{ArgsSink, ArrayIndexTracker};
