use crate::wire::errors::{ErrorKind, WireError};
use crate::wire::varint::{decode_varint, decode_zigzag};

/// Largest valid field number (field numbers occupy 29 bits of the tag).
const MAX_FIELD_NUMBER: u64 = (1 << 29) - 1;

/// Wire-type and associated value of a field.
///
/// See <https://protobuf.dev/programming-guides/encoding/#structure>.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldValue<'a> {
    /// Integer value encoded as a varint.
    Varint(u64),

    /// 64-bit fixed-width value, stored as its little-endian bit pattern.
    I64(u64),

    /// A variable-length value (string, bytes, embedded message or packed
    /// repeated field).
    Len(&'a [u8]),

    /// Deprecated start-of-group marker.
    Sgroup,

    /// Deprecated end-of-group marker.
    Egroup,

    /// 32-bit fixed-width value, stored as its little-endian bit pattern.
    I32(u32),
}

#[cfg(test)]
impl FieldValue<'_> {
    /// Encode a field with the value and wire type of `self` and the given
    /// field number.
    pub(crate) fn encode(self, number: u32) -> Vec<u8> {
        use crate::wire::varint::encode_varint;
        let encode_type_number = |wire_type| encode_varint(wire_type | ((number as u64) << 3));

        let mut buf = Vec::new();
        match self {
            Self::Varint(val) => {
                buf.extend(encode_type_number(0));
                buf.extend(encode_varint(val));
            }
            Self::I64(val) => {
                buf.extend(encode_type_number(1));
                buf.extend(val.to_le_bytes());
            }
            Self::Len(data) => {
                buf.extend(encode_type_number(2));
                buf.extend(encode_varint(data.len() as u64));
                buf.extend(data);
            }
            Self::Sgroup => {
                buf.extend(encode_type_number(3));
            }
            Self::Egroup => {
                buf.extend(encode_type_number(4));
            }
            Self::I32(val) => {
                buf.extend(encode_type_number(5));
                buf.extend(val.to_le_bytes());
            }
        }
        buf
    }
}

/// A single field of a message.
///
/// Fields have a number and a wire value. The wire format does not record
/// the schema type of a field, so the same wire value can represent several
/// schema types. The typed `get_*` accessors interpret the value according
/// to the schema type the caller expects and fail with
/// [`ErrorKind::FieldTypeMismatch`] if the wire type cannot represent it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Field<'a> {
    /// The field number.
    pub number: u32,

    /// The field value.
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    fn varint(&self) -> Result<u64, WireError> {
        match self.value {
            FieldValue::Varint(val) => Ok(val),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get the value of a field with schema type `uint64`.
    pub fn get_uint64(&self) -> Result<u64, WireError> {
        self.varint()
    }

    /// Get the value of a field with schema type `uint32`.
    pub fn get_uint32(&self) -> Result<u32, WireError> {
        self.varint().map(|v| v as u32)
    }

    /// Get the value of a field with schema type `int64`.
    pub fn get_int64(&self) -> Result<i64, WireError> {
        self.varint().map(|v| v as i64)
    }

    /// Get the value of a field with schema type `int32`.
    ///
    /// The value is truncated to 32 bits and then sign-extended, so both the
    /// canonical 10-byte encoding of a negative number and a zero-extended
    /// 5-byte encoding decode to the same value.
    pub fn get_int32(&self) -> Result<i32, WireError> {
        self.varint().map(|v| v as u32 as i32)
    }

    /// Get the value of a field where the schema type is an enum.
    pub fn get_enum(&self) -> Result<i32, WireError> {
        self.get_int32()
    }

    /// Get the value of a field with schema type `sint64`.
    pub fn get_sint64(&self) -> Result<i64, WireError> {
        self.varint().map(decode_zigzag)
    }

    /// Get the value of a field with schema type `sint32`.
    pub fn get_sint32(&self) -> Result<i32, WireError> {
        self.varint().map(|v| decode_zigzag(v) as i32)
    }

    /// Get the value of a field with schema type `bool`.
    pub fn get_bool(&self) -> Result<bool, WireError> {
        self.varint().map(|v| v != 0)
    }

    /// Get the value of a field with schema type `fixed64`.
    pub fn get_fixed64(&self) -> Result<u64, WireError> {
        match self.value {
            FieldValue::I64(val) => Ok(val),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get the value of a field with schema type `sfixed64`.
    pub fn get_sfixed64(&self) -> Result<i64, WireError> {
        self.get_fixed64().map(|v| v as i64)
    }

    /// Get the value of a field with schema type `double`.
    pub fn get_double(&self) -> Result<f64, WireError> {
        self.get_fixed64().map(f64::from_bits)
    }

    /// Get the value of a field with schema type `fixed32`.
    pub fn get_fixed32(&self) -> Result<u32, WireError> {
        match self.value {
            FieldValue::I32(val) => Ok(val),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get the value of a field with schema type `sfixed32`.
    pub fn get_sfixed32(&self) -> Result<i32, WireError> {
        self.get_fixed32().map(|v| v as i32)
    }

    /// Get the value of a field with schema type `float`.
    pub fn get_float(&self) -> Result<f32, WireError> {
        self.get_fixed32().map(f32::from_bits)
    }

    /// Get the UTF-8 encoded string in this field.
    ///
    /// The returned span borrows from the message bytes.
    pub fn get_string(&self) -> Result<&'a str, WireError> {
        let bytes = self.get_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| self.error(ErrorKind::InvalidUtf8))
    }

    /// Get the bytes in this field.
    pub fn get_bytes(&self) -> Result<&'a [u8], WireError> {
        match self.value {
            FieldValue::Len(data) => Ok(data),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get the raw bytes of the embedded message in this field.
    pub fn get_message(&self) -> Result<&'a [u8], WireError> {
        self.get_bytes()
    }

    fn error(&self, kind: ErrorKind) -> WireError {
        WireError::new(kind).with_field(self.number)
    }
}

/// A view over the serialized bytes of one message.
pub struct Message<'a> {
    buf: &'a [u8],
}

impl<'a> Message<'a> {
    /// Create a message view over a byte slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Message { buf }
    }

    /// Iterate over the fields physically present in the message, in
    /// encounter order.
    ///
    /// Repeated fields appear once per element (or once per packed run), so
    /// the same field number may be yielded many times.
    pub fn fields(&self) -> Fields<'a> {
        Fields {
            buf: self.buf,
            failed: false,
        }
    }
}

/// Iterator over fields of a message.
///
/// ```
/// # fn main() -> Result<(), proto_args::wire::WireError> {
/// use proto_args::wire::Message;
///
/// // A minimal but valid message: field 1 = varint 150.
/// let message = [0x08, 0x96, 0x01];
///
/// for field in Message::new(&message).fields() {
///     let field = field?;
///     println!("field {} = {:?}", field.number, field.value);
/// }
/// # Ok(()) }
/// ```
pub struct Fields<'a> {
    buf: &'a [u8],

    /// Whether an error was yielded. Iteration stops after the first error
    /// since the remaining bytes cannot be framed reliably.
    failed: bool,
}

impl<'a> Fields<'a> {
    fn read_field(&mut self) -> Result<Field<'a>, WireError> {
        let (tag, used) = decode_varint(self.buf)?;
        self.buf = &self.buf[used..];

        let number = tag >> 3;
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(WireError::new(ErrorKind::InvalidFieldNumber));
        }
        let number = number as u32;

        let value = match tag & 0x7 {
            0 => {
                let (val, used) =
                    decode_varint(self.buf).map_err(|err| err.with_field(number))?;
                self.buf = &self.buf[used..];
                FieldValue::Varint(val)
            }
            1 => FieldValue::I64(u64::from_le_bytes(self.take_chunk(number)?)),
            2 => {
                let (len, used) =
                    decode_varint(self.buf).map_err(|err| err.with_field(number))?;
                self.buf = &self.buf[used..];
                let len = usize::try_from(len)
                    .ok()
                    .filter(|len| *len <= self.buf.len())
                    .ok_or_else(|| WireError::new(ErrorKind::Eof).with_field(number))?;
                let (data, rest) = self.buf.split_at(len);
                self.buf = rest;
                FieldValue::Len(data)
            }
            3 => FieldValue::Sgroup,
            4 => FieldValue::Egroup,
            5 => FieldValue::I32(u32::from_le_bytes(self.take_chunk(number)?)),
            _ => return Err(WireError::new(ErrorKind::InvalidWireType).with_field(number)),
        };

        Ok(Field { number, value })
    }

    fn take_chunk<const N: usize>(&mut self, number: u32) -> Result<[u8; N], WireError> {
        let Some((chunk, rest)) = self.buf.split_first_chunk::<N>() else {
            return Err(WireError::new(ErrorKind::Eof).with_field(number));
        };
        self.buf = rest;
        Ok(*chunk)
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.is_empty() {
            return None;
        }
        match self.read_field() {
            Ok(field) => Some(Ok(field)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
