use crate::value::FieldValue;
use xxhash_rust::xxh3::Xxh3;

/// Value-hash format version byte used by the stable content digest.
pub const VALUE_HASH_VERSION: u8 = 2;

/// Stable XXH3 seed used by content hashing across process runs.
pub const VALUE_HASH_SEED: u64 = 0;

fn feed_u8(h: &mut Xxh3, x: u8) {
    h.update(&[x]);
}
fn feed_i64(h: &mut Xxh3, x: i64) {
    h.update(&x.to_be_bytes());
}
fn feed_u64(h: &mut Xxh3, x: u64) {
    h.update(&x.to_be_bytes());
}
fn feed_len(h: &mut Xxh3, len: usize) {
    feed_u64(h, u64::try_from(len).unwrap_or(u64::MAX));
}
fn feed_bytes(h: &mut Xxh3, b: &[u8]) {
    h.update(b);
}

fn write_to_hasher(value: &FieldValue, h: &mut Xxh3) {
    feed_u8(h, value.tag().to_u8());

    match value {
        FieldValue::Null => {}
        FieldValue::Bool(b) => feed_u8(h, u8::from(*b)),
        FieldValue::Int64(i) => feed_i64(h, *i),
        FieldValue::Double(d) => feed_u64(h, d.to_bits()),
        FieldValue::String(s) => {
            feed_len(h, s.len());
            feed_bytes(h, s.as_bytes());
        }
        FieldValue::Bytes(b) => {
            feed_len(h, b.len());
            feed_bytes(h, b);
        }
    }
}

fn new_hasher() -> Xxh3 {
    let mut h = Xxh3::with_seed(VALUE_HASH_SEED);
    feed_u8(&mut h, VALUE_HASH_VERSION);
    h
}

/// Stable 64-bit content hash of one value.
///
/// Deterministic across processes and platforms; the variant tag is hashed
/// first so equal payload bytes of different variants never collide by
/// construction.
#[must_use]
pub fn hash_value(value: &FieldValue) -> u64 {
    let mut h = new_hasher();
    write_to_hasher(value, &mut h);

    h.digest()
}

/// Stable 64-bit content hash of an ordered value sequence.
#[must_use]
pub fn hash_values(values: &[FieldValue]) -> u64 {
    let mut h = new_hasher();
    feed_len(&mut h, values.len());
    for value in values {
        feed_u8(&mut h, 0xFF);
        write_to_hasher(value, &mut h);
    }

    h.digest()
}
