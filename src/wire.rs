//! Low-level decoder for the Protocol Buffers wire format.
//!
//! This module decodes the fields physically present in a serialized message,
//! without reference to any schema. [`Message::fields`] yields every field in
//! encounter order together with its wire value; the typed accessors on
//! [`Field`] then interpret a value according to the schema type the caller
//! expects. Nothing here allocates: variable-length values are subslices of
//! the message bytes.
//!
//! See <https://protobuf.dev/programming-guides/encoding/> for a guide to the
//! encoding.

mod errors;
mod field;
pub mod varint;

pub use errors::{ErrorKind, WireError};
pub use field::{Field, FieldValue, Fields, Message};
