//! Decode varints from byte slices.
//!
//! Variable length integers (_varints_) are the default encoding of integers
//! in Protocol Buffers messages, including field tags and numbers.
//!
//! See <https://protobuf.dev/programming-guides/encoding/#varints>.

use crate::wire::errors::{ErrorKind, WireError};

/// Maximum number of bytes for an encoded varint.
///
/// A decoded varint is a u64 value. Each byte contains 7 value bits and one
/// continuation bit. Hence we need 9 "full" bytes plus one bit from the 10th byte.
const MAX_VARINT_LEN: usize = 10;

/// Decode a varint value of up to 64-bits from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    let mut value = 0;

    for (index, byte) in buf.iter().copied().take(MAX_VARINT_LEN).enumerate() {
        // High bit is continuation bit. Low 7 bits are the payload.
        value |= ((byte & 0x7f) as u64) << (index * 7);
        if byte <= 0x7f {
            // Only one value bit from the last byte may be used.
            if index + 1 == MAX_VARINT_LEN && byte > 0x01 {
                return Err(WireError::new(ErrorKind::InvalidVarint));
            }
            return Ok((value, index + 1));
        }
    }

    if buf.len() < MAX_VARINT_LEN {
        Err(WireError::new(ErrorKind::Eof))
    } else {
        Err(WireError::new(ErrorKind::InvalidVarint))
    }
}

/// Decode a zig-zag encoded signed integer.
///
/// `sint32` and `sint64` fields map signed values onto unsigned ones so that
/// numbers with a small magnitude keep a short varint encoding.
///
/// See <https://protobuf.dev/programming-guides/encoding/#signed-ints>.
pub fn decode_zigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
pub fn encode_varint(mut val: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);

    loop {
        let mut byte = (val & 0x7f) as u8;
        if val <= 0x7f {
            bytes.push(byte);
            break;
        } else {
            byte |= 0x80;
            bytes.push(byte);
            val = val >> 7;
        }
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::{decode_varint, decode_zigzag, encode_varint};
    use crate::wire::errors::ErrorKind;

    #[test]
    fn test_decode_varint() {
        let mut values: Vec<u64> = (0..1024).collect();
        values.push(u64::MAX);
        for val in values {
            let buf = encode_varint(val);
            let (decoded_val, used) = decode_varint(&buf).unwrap();
            assert_eq!(decoded_val, val);
            assert_eq!(used, buf.len());
        }
    }

    #[test]
    fn test_decode_varint_sequence() {
        // Example from https://protobuf.dev/programming-guides/encoding/#simple.
        let buf = [0x08, 0x96, 0x01];

        let (val, used) = decode_varint(&buf).unwrap();
        assert_eq!((val, used), (8, 1));

        let (val, used) = decode_varint(&buf[1..]).unwrap();
        assert_eq!((val, used), (150, 2));

        let err = decode_varint(&buf[3..]).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::Eof));
    }

    #[test]
    fn test_decode_varint_truncated() {
        // A continuation bit with no following byte.
        let buf = encode_varint(u64::MAX);
        for len in 0..buf.len() {
            let err = decode_varint(&buf[..len]).err().unwrap();
            assert!(matches!(err.kind(), ErrorKind::Eof));
        }
    }

    #[test]
    fn test_invalid_varint() {
        let mut buf = encode_varint(u64::MAX);
        assert_eq!(buf.len(), 10);
        buf[9] += 1;
        let err = decode_varint(&buf).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidVarint));

        // An 11-byte encoding is invalid even if the value would fit.
        let buf = [0x80; 11];
        let err = decode_varint(&buf).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidVarint));
    }

    #[test]
    fn test_decode_zigzag() {
        let cases = [
            (0, 0),
            (1, -1),
            (2, 1),
            (3, -2),
            (4, 2),
            (4294967294, 2147483647),
            (4294967295, -2147483648),
            (u64::MAX - 1, i64::MAX),
            (u64::MAX, i64::MIN),
        ];
        for (encoded, expected) in cases {
            assert_eq!(decode_zigzag(encoded), expected);
        }
    }
}
