use crate::{
    db::key::Tuple,
    expr::{EvaluationError, KeyExpression, RangeComponent},
    model::{Record, RecordField},
    value::FieldValue,
};

/// Evaluate `expr` against `record`.
///
/// Pure and deterministic. A `Nest` or `Range` whose field holds `Null`
/// yields one `Null` per value the child would have produced, so optional
/// sub-records keep the expression's arity.
pub fn evaluate(
    record: &dyn Record,
    expr: &KeyExpression,
) -> Result<Vec<FieldValue>, EvaluationError> {
    let mut out = Vec::with_capacity(expr.arity());
    evaluate_into(record, expr, &mut out)?;

    Ok(out)
}

/// Resolve a record's identifying tuple.
pub fn extract_id(record: &dyn Record, id_expr: &KeyExpression) -> Result<Tuple, EvaluationError> {
    let values = evaluate(record, id_expr)?;
    if values.is_empty() {
        return Err(EvaluationError::EmptyIdentifier);
    }

    Ok(Tuple::new(values))
}

fn evaluate_into(
    record: &dyn Record,
    expr: &KeyExpression,
    out: &mut Vec<FieldValue>,
) -> Result<(), EvaluationError> {
    match expr {
        KeyExpression::Empty => {}
        KeyExpression::Literal(value) => out.push(value.clone()),
        KeyExpression::Field(name) => match lookup(record, name)? {
            RecordField::Value(value) => out.push(value),
            RecordField::Record(_) | RecordField::Range(_) => {
                return Err(EvaluationError::NotAValue {
                    field: name.clone(),
                });
            }
            RecordField::Unreadable(reason) => return Err(unreadable(name, reason)),
        },
        KeyExpression::Concatenate(children) => {
            for child in children {
                evaluate_into(record, child, out)?;
            }
        }
        KeyExpression::Nest { parent, child } => match lookup(record, parent)? {
            RecordField::Record(sub) => evaluate_into(sub, child, out)?,
            RecordField::Value(FieldValue::Null) => push_nulls(out, child.arity()),
            RecordField::Value(_) | RecordField::Range(_) => {
                return Err(EvaluationError::NotARecord {
                    field: parent.clone(),
                });
            }
            RecordField::Unreadable(reason) => return Err(unreadable(parent, reason)),
        },
        KeyExpression::Range { field, component } => match lookup(record, field)? {
            RecordField::Range(range) => out.push(match component {
                RangeComponent::LowerBound => range.lower,
                RangeComponent::UpperBound => range.upper,
            }),
            RecordField::Value(FieldValue::Null) => out.push(FieldValue::Null),
            RecordField::Value(_) | RecordField::Record(_) => {
                return Err(EvaluationError::NotARange {
                    field: field.clone(),
                });
            }
            RecordField::Unreadable(reason) => return Err(unreadable(field, reason)),
        },
    }

    Ok(())
}

fn lookup<'a>(record: &'a dyn Record, name: &str) -> Result<RecordField<'a>, EvaluationError> {
    record
        .field(name)
        .ok_or_else(|| EvaluationError::MissingField {
            field: name.to_string(),
        })
}

fn unreadable(field: &str, reason: String) -> EvaluationError {
    EvaluationError::Unreadable {
        field: field.to_string(),
        reason,
    }
}

fn push_nulls(out: &mut Vec<FieldValue>, count: usize) {
    out.extend(std::iter::repeat_n(FieldValue::Null, count));
}
