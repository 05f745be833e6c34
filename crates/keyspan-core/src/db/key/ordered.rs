use crate::{
    db::key::TupleDecodeError,
    value::{DOUBLE_VARIANT, FieldValue, INT64_VARIANT, NumericKey, ValueRank},
};

const ESCAPE_FOLLOW: u8 = 0xFF;
const TERMINATOR: [u8; 2] = [0x00, 0x00];
const NUMERIC_PAYLOAD_LEN: usize = 8 + 4 + 1;

/// Append one ordered tuple component.
///
/// Byte order of the output matches [`crate::value::canonical_cmp`] for every
/// pair of values, and no component ever begins with `0xFF`.
pub(crate) fn encode_component(out: &mut Vec<u8>, value: &FieldValue) {
    out.push(value.rank().key_byte());

    match value {
        FieldValue::Null => {}
        FieldValue::Bool(v) => out.push(u8::from(*v)),
        FieldValue::Int64(_) | FieldValue::Double(_) => {
            if let Some(key) = NumericKey::of(value) {
                push_numeric_key(out, key);
            }
        }
        FieldValue::String(v) => push_terminated_bytes(out, v.as_bytes()),
        FieldValue::Bytes(v) => push_terminated_bytes(out, v),
    }
}

/// Decode one ordered component starting at `*offset`.
pub(crate) fn decode_component(
    bytes: &[u8],
    offset: &mut usize,
) -> Result<FieldValue, TupleDecodeError> {
    let type_byte = take(bytes, offset, 1)?[0];
    let rank = ValueRank::from_key_byte(type_byte)
        .ok_or(TupleDecodeError::UnknownType { byte: type_byte })?;

    match rank {
        ValueRank::Null => Ok(FieldValue::Null),
        ValueRank::Bool => match take(bytes, offset, 1)?[0] {
            0 => Ok(FieldValue::Bool(false)),
            1 => Ok(FieldValue::Bool(true)),
            byte => Err(TupleDecodeError::InvalidBool { byte }),
        },
        ValueRank::Numeric => decode_numeric(take(bytes, offset, NUMERIC_PAYLOAD_LEN)?),
        ValueRank::String => {
            let raw = read_terminated_bytes(bytes, offset)?;
            String::from_utf8(raw)
                .map(FieldValue::String)
                .map_err(|_| TupleDecodeError::InvalidUtf8)
        }
        ValueRank::Bytes => read_terminated_bytes(bytes, offset).map(FieldValue::Bytes),
    }
}

fn push_numeric_key(out: &mut Vec<u8>, key: NumericKey) {
    out.extend_from_slice(&ordered_f64_bytes(key.bucket));
    out.extend_from_slice(&ordered_i32_bytes(key.residual));
    out.push(key.variant);
}

#[allow(clippy::cast_possible_truncation)]
fn decode_numeric(payload: &[u8]) -> Result<FieldValue, TupleDecodeError> {
    let mut bucket = [0u8; 8];
    bucket.copy_from_slice(&payload[..8]);
    let mut residual = [0u8; 4];
    residual.copy_from_slice(&payload[8..12]);

    let bucket = f64_from_ordered_bytes(bucket);
    let residual = i32_from_ordered_bytes(residual);

    match payload[12] {
        INT64_VARIANT => {
            if !bucket.is_finite() || bucket.fract() != 0.0 {
                return Err(TupleDecodeError::NumericOutOfRange);
            }
            let exact = (bucket as i128) + i128::from(residual);
            i64::try_from(exact)
                .map(FieldValue::Int64)
                .map_err(|_| TupleDecodeError::NumericOutOfRange)
        }
        DOUBLE_VARIANT if residual == 0 => Ok(FieldValue::Double(bucket)),
        DOUBLE_VARIANT => Err(TupleDecodeError::NumericOutOfRange),
        variant => Err(TupleDecodeError::InvalidNumericVariant { variant }),
    }
}

// Embedded 0x00 becomes 0x00 0xFF; the component ends with 0x00 0x00.
fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, ESCAPE_FOLLOW]);
        } else {
            out.push(byte);
        }
    }

    out.extend_from_slice(&TERMINATOR);
}

fn read_terminated_bytes(bytes: &[u8], offset: &mut usize) -> Result<Vec<u8>, TupleDecodeError> {
    let mut out = Vec::new();

    loop {
        let byte = take(bytes, offset, 1)?[0];
        if byte != 0 {
            out.push(byte);
            continue;
        }

        match take(bytes, offset, 1)?[0] {
            0x00 => return Ok(out),
            ESCAPE_FOLLOW => out.push(0),
            _ => return Err(TupleDecodeError::InvalidEscape { offset: *offset - 1 }),
        }
    }
}

fn take<'a>(bytes: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8], TupleDecodeError> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or(TupleDecodeError::Truncated)?;

    let out = &bytes[*offset..end];
    *offset = end;

    Ok(out)
}

const fn ordered_i32_bytes(value: i32) -> [u8; 4] {
    let biased = value.cast_unsigned() ^ (1u32 << 31);
    biased.to_be_bytes()
}

const fn i32_from_ordered_bytes(bytes: [u8; 4]) -> i32 {
    (u32::from_be_bytes(bytes) ^ (1u32 << 31)).cast_signed()
}

const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & 0x8000_0000_0000_0000 == 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        !bits
    };

    ordered.to_be_bytes()
}

const fn f64_from_ordered_bytes(bytes: [u8; 8]) -> f64 {
    let ordered = u64::from_be_bytes(bytes);
    let bits = if ordered & 0x8000_0000_0000_0000 == 0 {
        !ordered
    } else {
        ordered ^ 0x8000_0000_0000_0000
    };

    f64::from_bits(bits)
}

///
/// TESTS
///
