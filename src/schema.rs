//! Schema descriptors used to resolve message fields at decode time.
//!
//! Descriptors are registered programmatically on a [`SchemaRegistry`], which
//! the parser consults to map field numbers onto names and declared types.
//! Registries are mutated only between parses; during decoding the parser
//! reads them through a shared reference, so one registry can serve many
//! parser instances.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;

/// Declared type of a message field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Int32,
    Int64,
    SInt32,
    SInt64,
    SFixed32,
    SFixed64,
    UInt32,
    UInt64,
    Fixed32,
    Fixed64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    /// Enum field; carries the fully-qualified name of the enum type.
    Enum(String),
    /// Sub-message field; carries the fully-qualified name of the message
    /// type.
    Message(String),
}

impl FieldKind {
    /// Return whether repeated values of this kind may use the packed wire
    /// representation.
    pub(crate) fn packable(&self) -> bool {
        !matches!(
            self,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_)
        )
    }
}

/// Schema entry for a single field of a message.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    number: u32,
    name: String,
    kind: FieldKind,
    repeated: bool,
}

impl FieldDescriptor {
    /// Create a descriptor for a singular field.
    pub fn new(number: u32, name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            number,
            name: name.into(),
            kind,
            repeated: false,
        }
    }

    /// Mark the field as repeated.
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Return the field number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Return the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the declared type of the field.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Return whether the field is repeated.
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }
}

/// Schema entry for a message type.
#[derive(Clone, Debug)]
pub struct MessageDescriptor {
    name: String,
    fields: FxHashMap<u32, FieldDescriptor>,
}

impl MessageDescriptor {
    /// Create a descriptor for the message type `name`.
    ///
    /// `name` is the fully-qualified type name, e.g. `trace.TrackEvent`.
    pub fn new(name: impl Into<String>) -> Self {
        MessageDescriptor {
            name: name.into(),
            fields: FxHashMap::default(),
        }
    }

    /// Add a field to the message, replacing any earlier field with the same
    /// number.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.number, field);
        self
    }

    /// Return the fully-qualified type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.get(&number)
    }
}

/// Schema entry for an enum type.
#[derive(Clone, Debug)]
pub struct EnumDescriptor {
    name: String,
    values: FxHashMap<i32, String>,
}

impl EnumDescriptor {
    /// Create a descriptor for the enum type `name`.
    pub fn new(name: impl Into<String>) -> Self {
        EnumDescriptor {
            name: name.into(),
            values: FxHashMap::default(),
        }
    }

    /// Add a named value to the enum.
    pub fn value(mut self, number: i32, name: impl Into<String>) -> Self {
        self.values.insert(number, name.into());
        self
    }

    /// Return the fully-qualified type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the symbolic name of a value.
    pub fn value_name(&self, number: i32) -> Option<&str> {
        self.values.get(&number).map(|name| name.as_str())
    }
}

/// Registry resolving fully-qualified type names to descriptors.
///
/// New registries are empty; message and enum types are registered explicitly
/// before parsing begins. Extension fields can be added to already-registered
/// message types at any point between parses and resolve exactly like native
/// fields afterwards.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    messages: FxHashMap<String, MessageDescriptor>,
    enums: FxHashMap<String, EnumDescriptor>,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message type. Re-registering a name replaces the earlier
    /// descriptor.
    pub fn register_message(&mut self, descriptor: MessageDescriptor) {
        self.messages.insert(descriptor.name.clone(), descriptor);
    }

    /// Register an enum type. Re-registering a name replaces the earlier
    /// descriptor.
    pub fn register_enum(&mut self, descriptor: EnumDescriptor) {
        self.enums.insert(descriptor.name.clone(), descriptor);
    }

    /// Add an extension field to an already-registered message type.
    pub fn register_extension(
        &mut self,
        type_name: &str,
        field: FieldDescriptor,
    ) -> Result<(), UnknownTypeError> {
        let Some(message) = self.messages.get_mut(type_name) else {
            return Err(UnknownTypeError {
                name: type_name.to_owned(),
            });
        };
        message.fields.insert(field.number, field);
        Ok(())
    }

    /// Look up a message type by fully-qualified name.
    pub fn message(&self, type_name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(type_name)
    }

    /// Resolve the symbolic name of an enum value.
    ///
    /// Returns `None` for unknown enum types as well as unknown values, so
    /// callers can fall back to the raw number in both cases.
    pub fn enum_value_name(&self, type_name: &str, value: i32) -> Option<&str> {
        self.enums.get(type_name)?.value_name(value)
    }
}

/// Error registering an extension field against an unknown message type.
#[derive(Debug)]
pub struct UnknownTypeError {
    name: String,
}

impl Display for UnknownTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown message type {}", self.name)
    }
}

impl Error for UnknownTypeError {}
