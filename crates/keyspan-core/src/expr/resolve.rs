use crate::{
    expr::{ExpressionError, KeyExpression},
    model::{FieldModel, FieldType, find_field},
};

/// Resolve the declared type of every value `expr` would produce.
///
/// Runs at registration so index kinds can validate against declared types.
/// Values reached through an optional record or range come back wrapped in
/// `Optional`, since evaluation yields `Null` there.
pub fn resolve_field_types(
    expr: &KeyExpression,
    fields: &[FieldModel],
) -> Result<Vec<FieldType>, ExpressionError> {
    let mut out = Vec::with_capacity(expr.arity());
    resolve_into(expr, fields, false, &mut out)?;

    Ok(out)
}

fn resolve_into(
    expr: &KeyExpression,
    fields: &[FieldModel],
    optional: bool,
    out: &mut Vec<FieldType>,
) -> Result<(), ExpressionError> {
    match expr {
        KeyExpression::Empty => {}
        KeyExpression::Literal(value) => {
            let ty = FieldType::of_value(value).ok_or(ExpressionError::UntypedLiteral)?;
            out.push(ty);
        }
        KeyExpression::Field(name) => {
            let ty = declared(fields, name)?.clone();
            out.push(wrap(ty, optional));
        }
        KeyExpression::Concatenate(children) => {
            for child in children {
                resolve_into(child, fields, optional, out)?;
            }
        }
        KeyExpression::Nest { parent, child } => {
            let ty = declared(fields, parent)?;
            let nested = ty
                .record_fields()
                .ok_or_else(|| ExpressionError::NotARecord {
                    field: parent.clone(),
                })?;
            let optional = optional || matches!(ty, FieldType::Optional(_));

            resolve_into(child, nested, optional, out)?;
        }
        KeyExpression::Range { field, .. } => {
            let ty = declared(fields, field)?;
            let bound = ty.range_bound().ok_or_else(|| ExpressionError::NotARange {
                field: field.clone(),
            })?;
            let optional = optional || matches!(ty, FieldType::Optional(_));

            out.push(wrap(bound.clone(), optional));
        }
    }

    Ok(())
}

fn declared<'a>(fields: &'a [FieldModel], name: &str) -> Result<&'a FieldType, ExpressionError> {
    find_field(fields, name)
        .map(|field| &field.ty)
        .ok_or_else(|| ExpressionError::UnknownField {
            field: name.to_string(),
        })
}

fn wrap(ty: FieldType, optional: bool) -> FieldType {
    if optional && !matches!(ty, FieldType::Optional(_)) {
        FieldType::Optional(Box::new(ty))
    } else {
        ty
    }
}
