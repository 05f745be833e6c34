//! Bounded reads over the index layouts.
//!
//! Each function issues exactly one range read; none of them scan a whole
//! index.

use crate::{
    db::{
        index::maintainer::MaintainerError,
        key::{Subspace, Tuple},
        store::{Transaction, decode_counter},
    },
    error::InternalError,
    value::FieldValue,
};

///
/// GroupEntry
/// One decoded flat-index key: the indexed values and the owning id.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupEntry {
    pub values: Tuple,
    pub id: Tuple,
}

/// Smallest value stored under `grouping` in a min/max index.
pub fn min_value(
    txn: &mut dyn Transaction,
    subspace: &Subspace,
    grouping: &Tuple,
) -> Result<Option<FieldValue>, InternalError> {
    extreme_value(txn, subspace, grouping, false)
}

/// Largest value stored under `grouping` in a min/max index.
pub fn max_value(
    txn: &mut dyn Transaction,
    subspace: &Subspace,
    grouping: &Tuple,
) -> Result<Option<FieldValue>, InternalError> {
    extreme_value(txn, subspace, grouping, true)
}

fn extreme_value(
    txn: &mut dyn Transaction,
    subspace: &Subspace,
    grouping: &Tuple,
    reverse: bool,
) -> Result<Option<FieldValue>, InternalError> {
    let rows = txn.scan(&subspace.range_of(grouping), Some(1), reverse)?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };

    let decoded = subspace.unpack(&row.key)?;
    let value = decoded
        .get(grouping.len())
        .cloned()
        .ok_or_else(|| corrupt(subspace, "key holds no value after the grouping"))?;

    Ok(Some(value))
}

/// Decode up to `limit` flat entries under `grouping`. `arity` is the number
/// of indexed values per key; the remaining elements are the id.
pub fn group_entries(
    txn: &mut dyn Transaction,
    subspace: &Subspace,
    grouping: &Tuple,
    arity: usize,
    limit: Option<usize>,
    reverse: bool,
) -> Result<Vec<GroupEntry>, InternalError> {
    let rows = txn.scan(&subspace.range_of(grouping), limit, reverse)?;

    rows.into_iter()
        .map(|row| {
            let mut values = subspace.unpack(&row.key)?.into_values();
            if values.len() <= arity {
                return Err(corrupt(subspace, "key holds no id after the values"));
            }
            let id = values.split_off(arity);

            Ok(GroupEntry {
                values: Tuple::new(values),
                id: Tuple::new(id),
            })
        })
        .collect()
}

/// Stored count or sum for `grouping`; `None` when no record ever
/// contributed.
pub fn aggregate_value(
    txn: &mut dyn Transaction,
    subspace: &Subspace,
    grouping: &Tuple,
) -> Result<Option<i64>, InternalError> {
    let Some(bytes) = txn.get(&subspace.pack(grouping))? else {
        return Ok(None);
    };
    if bytes.len() != 8 {
        return Err(corrupt(
            subspace,
            &format!("counter holds {} bytes, expected 8", bytes.len()),
        ));
    }

    Ok(Some(decode_counter(&bytes)))
}

fn corrupt(subspace: &Subspace, reason: &str) -> InternalError {
    MaintainerError::CorruptEntry {
        index: subspace.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
