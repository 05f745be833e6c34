use crate::value::FieldValue;
use std::cmp::Ordering;

///
/// NumericKey
///
/// Exact, variant-independent ordering key for numeric values.
///
/// `bucket` is the nearest `f64` to the value and `residual` is the exact
/// integer distance from the bucket (always zero for doubles). Rounding to
/// nearest is monotonic, so ordering by `(bucket, residual)` reproduces the
/// mathematical order of every `i64`/`f64` mix. `variant` breaks ties between
/// numerically equal `Int64` and `Double` values.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct NumericKey {
    pub(crate) bucket: f64,
    pub(crate) residual: i32,
    pub(crate) variant: u8,
}

pub(crate) const INT64_VARIANT: u8 = 0x00;
pub(crate) const DOUBLE_VARIANT: u8 = 0x01;

impl NumericKey {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub(crate) fn from_i64(value: i64) -> Self {
        let bucket = value as f64;
        // |value - bucket| is at most half an ulp at 2^63 (1024), and the
        // bucket of any i64 is an integer in [-2^63, 2^63].
        let residual = i128::from(value) - bucket as i128;

        Self {
            bucket,
            residual: residual as i32,
            variant: INT64_VARIANT,
        }
    }

    pub(crate) fn from_f64(value: f64) -> Self {
        Self {
            bucket: value,
            residual: 0,
            variant: DOUBLE_VARIANT,
        }
    }

    pub(crate) fn of(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int64(v) => Some(Self::from_i64(*v)),
            FieldValue::Double(v) => Some(Self::from_f64(*v)),
            _ => None,
        }
    }

    pub(crate) fn cmp(&self, other: &Self) -> Ordering {
        self.bucket
            .total_cmp(&other.bucket)
            .then(self.residual.cmp(&other.residual))
            .then(self.variant.cmp(&other.variant))
    }
}

/// Total canonical comparator for `FieldValue`.
///
/// Ordering rules:
/// 1. Value rank (null < bool < numeric < string < bytes)
/// 2. Variant-specific comparison within a rank; numerics compare by value
#[must_use]
pub fn canonical_cmp(left: &FieldValue, right: &FieldValue) -> Ordering {
    let rank = left.rank().cmp(&right.rank());
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

/// Compare two values by numeric magnitude only.
///
/// Returns `None` unless both values are numeric. Unlike [`canonical_cmp`],
/// `Int64(10)` and `Double(10.0)` compare equal here.
#[must_use]
pub fn numeric_cmp(left: &FieldValue, right: &FieldValue) -> Option<Ordering> {
    let left = NumericKey::of(left)?;
    let right = NumericKey::of(right)?;

    Some(
        left.bucket
            .total_cmp(&right.bucket)
            .then(left.residual.cmp(&right.residual)),
    )
}

fn canonical_cmp_same_rank(left: &FieldValue, right: &FieldValue) -> Ordering {
    match (left, right) {
        (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
        // UTF-8 byte order equals code point order.
        (FieldValue::String(a), FieldValue::String(b)) => a.as_bytes().cmp(b.as_bytes()),
        (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a.cmp(b),
        _ => match (NumericKey::of(left), NumericKey::of(right)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        },
    }
}
