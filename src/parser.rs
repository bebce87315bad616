//! Reflection-driven decoding of messages into key/value arguments.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;

use crate::key::Key;
use crate::schema::{FieldDescriptor, FieldKind, SchemaRegistry};
use crate::sink::ArgsSink;
use crate::wire::varint::decode_varint;
use crate::wire::{ErrorKind, Field, FieldValue, Message, WireError};

/// Failure decoding a message into arguments.
///
/// Carries a human-readable description of the first failure encountered.
/// Values emitted to the sink before the failure remain valid.
#[derive(Debug)]
pub struct ParseError {
    description: String,
}

impl ParseError {
    /// Create an error with the given description.
    ///
    /// Parsing overrides use this to report their own failures.
    pub fn new(description: impl Into<String>) -> Self {
        ParseError {
            description: description.into(),
        }
    }

    fn unknown_type(type_name: &str) -> Self {
        Self::new(format!("unknown message type {}", type_name))
    }

    fn message_wire(type_name: &str, err: WireError) -> Self {
        Self::new(format!("malformed {} message: {}", type_name, err))
    }

    fn field_wire(field_name: &str, err: WireError) -> Self {
        Self::new(format!("failed to decode field {}: {}", field_name, err))
    }

    fn unsupported_bytes(field_name: &str) -> Self {
        Self::new(format!(
            "field {} has type bytes, which is not supported",
            field_name
        ))
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl Error for ParseError {}

impl From<WireError> for ParseError {
    fn from(err: WireError) -> Self {
        Self::new(err.to_string())
    }
}

/// Decision returned by a parsing override.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// The override fully handled the field. Default decoding is skipped,
    /// including recursion into sub-messages.
    Handled,

    /// Default decoding proceeds as if no override existed.
    ContinueDefault,
}

/// Caller-supplied interceptor replacing default decoding of one field path.
///
/// The override receives the raw still-encoded field, the live [`Key`]
/// (already extended with the field's path segment, through which further
/// dictionary/array contexts can be entered) and the sink. Returning an
/// error aborts the whole parse; values emitted earlier stay in the sink.
pub type ParsingOverride =
    Box<dyn Fn(Field<'_>, &mut Key, &mut dyn ArgsSink) -> Result<OverrideOutcome, ParseError>>;

type OverrideMap = FxHashMap<String, ParsingOverride>;

/// Decodes arbitrary serialized messages into flat key/value arguments.
///
/// The parser walks a message using only schema descriptors from a
/// [`SchemaRegistry`], with no generated per-message code, and emits every
/// leaf value to an [`ArgsSink`] under its dotted path. Given the schema
///
/// ```proto
/// message SubMessage {
///     optional int32 field = 1;
/// }
/// message MainMessage {
///     optional int32 field1 = 1;
///     optional string field2 = 2;
///     optional SubMessage field3 = 3;
/// }
/// ```
///
/// a `MainMessage` produces the keys `field1`, `field2` and `field3.field`.
/// Elements of repeated fields get an indexed key (`items[0]`, `items[1]`)
/// that shares one flat key (`items`).
///
/// A parser is long-lived: the registry reference and any registered
/// overrides are reused across [`parse_message`](ArgsParser::parse_message)
/// calls. It is not internally synchronized; use one instance per thread.
/// See the crate-level documentation for a complete example.
pub struct ArgsParser<'p> {
    registry: &'p SchemaRegistry,
    overrides: OverrideMap,
    key_prefix: Key,
}

impl<'p> ArgsParser<'p> {
    /// Create a parser resolving types from `registry`.
    pub fn new(registry: &'p SchemaRegistry) -> Self {
        ArgsParser {
            registry,
            overrides: OverrideMap::default(),
            key_prefix: Key::new(),
        }
    }

    /// Install an override for the field at `field_path`.
    ///
    /// `field_path` is the full dotted path of the field without array
    /// indices, so an override on a repeated field applies to every element.
    /// Overriding a path that nests below an overridden sub-message has no
    /// effect, since a `Handled` outcome skips recursion into the field.
    /// Re-registering a path replaces the earlier override.
    pub fn register_override(
        &mut self,
        field_path: impl Into<String>,
        override_fn: impl Fn(Field<'_>, &mut Key, &mut dyn ArgsSink) -> Result<OverrideOutcome, ParseError>
            + 'static,
    ) {
        self.overrides.insert(field_path.into(), Box::new(override_fn));
    }

    /// Parse each field of the serialized message in `bytes`.
    ///
    /// `type_name` must name a message type registered in the schema
    /// registry. When `allowed_fields` is non-empty, top-level fields outside
    /// it are skipped silently; nested messages are always fully walked.
    ///
    /// Returns the first failure encountered. Values decoded before the
    /// failure have already reached `sink` and are not retracted, so a
    /// partial result remains usable.
    pub fn parse_message(
        &mut self,
        bytes: &[u8],
        type_name: &str,
        allowed_fields: Option<&[u32]>,
        sink: &mut dyn ArgsSink,
    ) -> Result<(), ParseError> {
        debug_assert!(
            self.key_prefix.is_empty(),
            "key context leaked from a previous parse"
        );
        self.key_prefix.clear();
        parse_fields(
            self.registry,
            &self.overrides,
            &mut self.key_prefix,
            bytes,
            type_name,
            allowed_fields,
            sink,
        )
    }
}

/// Walk all fields present in `bytes`, resolving each against the schema
/// entry for `type_name` and emitting the decoded values.
fn parse_fields(
    registry: &SchemaRegistry,
    overrides: &OverrideMap,
    key: &mut Key,
    bytes: &[u8],
    type_name: &str,
    allowed_fields: Option<&[u32]>,
    sink: &mut dyn ArgsSink,
) -> Result<(), ParseError> {
    let descriptor = registry
        .message(type_name)
        .ok_or_else(|| ParseError::unknown_type(type_name))?;

    for field in Message::new(bytes).fields() {
        let field = field.map_err(|err| ParseError::message_wire(type_name, err))?;
        if matches!(field.value, FieldValue::Sgroup | FieldValue::Egroup) {
            continue;
        }
        // Field numbers that resolve to nothing (including extensions that
        // were never registered) belong to a newer or unrelated schema and
        // are skipped, not failed.
        let Some(field_descriptor) = descriptor.field_by_number(field.number) else {
            continue;
        };
        if !field_allowed(allowed_fields, field.number) {
            continue;
        }
        parse_field(registry, overrides, key, field, field_descriptor, sink)?;
    }
    Ok(())
}

fn field_allowed(allowed_fields: Option<&[u32]>, number: u32) -> bool {
    match allowed_fields {
        Some(fields) if !fields.is_empty() => fields.contains(&number),
        _ => true,
    }
}

/// Decode a single resolved field, entering the key contexts that give its
/// values their dotted/indexed paths.
fn parse_field(
    registry: &SchemaRegistry,
    overrides: &OverrideMap,
    key: &mut Key,
    field: Field<'_>,
    descriptor: &FieldDescriptor,
    sink: &mut dyn ArgsSink,
) -> Result<(), ParseError> {
    let mut scope = key.enter_dictionary(descriptor.name());
    if !descriptor.is_repeated() {
        return parse_field_value(registry, overrides, &mut scope, field, descriptor, sink);
    }

    // A length-delimited wire value on a repeated numeric field is a packed
    // run; every other repeated field carries one element per wire field.
    if descriptor.kind().packable() {
        if let FieldValue::Len(data) = field.value {
            return parse_packed(registry, overrides, &mut scope, field.number, data, descriptor, sink);
        }
    }

    let index = sink.next_array_index(&scope.flat_key);
    let mut element = scope.enter_array(index);
    parse_field_value(registry, overrides, &mut element, field, descriptor, sink)?;
    sink.advance_array_index(&element.flat_key);
    Ok(())
}

/// Decode the elements of a packed repeated field.
///
/// Each element gets its own array index and key context, exactly as if it
/// had arrived unpacked, so both representations of a repeated field produce
/// identical emissions.
fn parse_packed(
    registry: &SchemaRegistry,
    overrides: &OverrideMap,
    key: &mut Key,
    number: u32,
    data: &[u8],
    descriptor: &FieldDescriptor,
    sink: &mut dyn ArgsSink,
) -> Result<(), ParseError> {
    let mut remaining = data;
    while !remaining.is_empty() {
        let (value, rest) = next_packed_value(remaining, descriptor.kind(), number)
            .map_err(|err| ParseError::field_wire(descriptor.name(), err))?;
        remaining = rest;

        let index = sink.next_array_index(&key.flat_key);
        let mut element = key.enter_array(index);
        let element_field = Field { number, value };
        parse_field_value(registry, overrides, &mut element, element_field, descriptor, sink)?;
        sink.advance_array_index(&element.flat_key);
    }
    Ok(())
}

/// Split the next packed element off `data`, framed according to the field's
/// declared kind.
fn next_packed_value<'a>(
    data: &'a [u8],
    kind: &FieldKind,
    number: u32,
) -> Result<(FieldValue<'a>, &'a [u8]), WireError> {
    match kind {
        FieldKind::Int32
        | FieldKind::Int64
        | FieldKind::SInt32
        | FieldKind::SInt64
        | FieldKind::UInt32
        | FieldKind::UInt64
        | FieldKind::Bool
        | FieldKind::Enum(_) => {
            let (value, used) = decode_varint(data).map_err(|err| err.with_field(number))?;
            Ok((FieldValue::Varint(value), &data[used..]))
        }
        FieldKind::Fixed32 | FieldKind::SFixed32 | FieldKind::Float => {
            let Some((chunk, rest)) = data.split_first_chunk::<4>() else {
                return Err(WireError::new(ErrorKind::Eof).with_field(number));
            };
            Ok((FieldValue::I32(u32::from_le_bytes(*chunk)), rest))
        }
        FieldKind::Fixed64 | FieldKind::SFixed64 | FieldKind::Double => {
            let Some((chunk, rest)) = data.split_first_chunk::<8>() else {
                return Err(WireError::new(ErrorKind::Eof).with_field(number));
            };
            Ok((FieldValue::I64(u64::from_le_bytes(*chunk)), rest))
        }
        // Non-packable kinds never reach here; the dispatcher routes their
        // length-delimited values through the single-element path.
        FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
            Err(WireError::new(ErrorKind::FieldTypeMismatch).with_field(number))
        }
    }
}

/// Apply a registered override for the current path, if any.
///
/// `None` means default decoding should proceed; `Some(result)` means the
/// field is finished, successfully or not.
fn apply_override(
    overrides: &OverrideMap,
    field: Field<'_>,
    key: &mut Key,
    sink: &mut dyn ArgsSink,
) -> Option<Result<(), ParseError>> {
    let handler = overrides.get(&key.flat_key)?;
    match handler(field, key, sink) {
        Ok(OverrideOutcome::Handled) => Some(Ok(())),
        Ok(OverrideOutcome::ContinueDefault) => None,
        Err(err) => Some(Err(err)),
    }
}

/// Decode one field value whose key contexts are already entered: apply any
/// override, then emit the scalar or recurse into the sub-message.
fn parse_field_value(
    registry: &SchemaRegistry,
    overrides: &OverrideMap,
    key: &mut Key,
    field: Field<'_>,
    descriptor: &FieldDescriptor,
    sink: &mut dyn ArgsSink,
) -> Result<(), ParseError> {
    if let Some(result) = apply_override(overrides, field, key, sink) {
        return result;
    }

    let wire = |err: WireError| ParseError::field_wire(descriptor.name(), err);
    match descriptor.kind() {
        FieldKind::Int32 => sink.add_integer(key, i64::from(field.get_int32().map_err(wire)?)),
        FieldKind::Int64 => sink.add_integer(key, field.get_int64().map_err(wire)?),
        FieldKind::SInt32 => sink.add_integer(key, i64::from(field.get_sint32().map_err(wire)?)),
        FieldKind::SInt64 => sink.add_integer(key, field.get_sint64().map_err(wire)?),
        FieldKind::SFixed32 => {
            sink.add_integer(key, i64::from(field.get_sfixed32().map_err(wire)?))
        }
        FieldKind::SFixed64 => sink.add_integer(key, field.get_sfixed64().map_err(wire)?),
        FieldKind::UInt32 => {
            sink.add_unsigned_integer(key, u64::from(field.get_uint32().map_err(wire)?))
        }
        FieldKind::UInt64 => sink.add_unsigned_integer(key, field.get_uint64().map_err(wire)?),
        FieldKind::Fixed32 => {
            sink.add_unsigned_integer(key, u64::from(field.get_fixed32().map_err(wire)?))
        }
        FieldKind::Fixed64 => sink.add_unsigned_integer(key, field.get_fixed64().map_err(wire)?),
        FieldKind::Float => sink.add_double(key, f64::from(field.get_float().map_err(wire)?)),
        FieldKind::Double => sink.add_double(key, field.get_double().map_err(wire)?),
        FieldKind::Bool => sink.add_boolean(key, field.get_bool().map_err(wire)?),
        FieldKind::String => sink.add_string(key, field.get_string().map_err(wire)?),
        FieldKind::Bytes => return Err(ParseError::unsupported_bytes(descriptor.name())),
        FieldKind::Enum(enum_type) => {
            let value = field.get_enum().map_err(wire)?;
            match registry.enum_value_name(enum_type, value) {
                Some(name) => sink.add_string(key, name),
                // Values a newer producer added to the enum decode as their
                // raw number.
                None => sink.add_integer(key, i64::from(value)),
            }
        }
        FieldKind::Message(message_type) => {
            let bytes = field.get_message().map_err(wire)?;
            // Nested fields reuse the extended key. The allow-list only
            // constrains the top-level call.
            parse_fields(registry, overrides, key, bytes, message_type, None, sink)?;
        }
    }
    Ok(())
}
