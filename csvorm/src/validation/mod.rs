use crate::error::{CsvOrmError, Result};
use crate::schema::{FieldDescriptor, ModelSchema, ID_COLUMN};
use crate::value::Value;
use std::collections::HashSet;

/// Validate a full set of field values for insertion and arrange them in
/// schema order. Every declared field must be given exactly once.
pub fn prepare_values<I, K>(schema: &ModelSchema, fields: I) -> Result<Vec<Value>>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut slots: Vec<Option<Value>> = vec![None; schema.fields().len()];

    for (name, value) in fields {
        let name = name.as_ref();
        if name == ID_COLUMN {
            return Err(CsvOrmError::Validation(
                "The id is assigned by the store and cannot be supplied".into(),
            ));
        }
        let field = schema.field(name)?;
        let slot = &mut slots[field.position()];
        if slot.is_some() {
            return Err(CsvOrmError::Validation(format!(
                "Field '{name}' is given more than once"
            )));
        }
        *slot = Some(coerce_field(field, value)?);
    }

    let missing: Vec<&str> = schema
        .fields()
        .iter()
        .filter(|f| slots[f.position()].is_none())
        .map(|f| f.name())
        .collect();
    if !missing.is_empty() {
        return Err(CsvOrmError::Validation(format!(
            "Missing value for field(s) {} of model '{}'",
            missing.join(", "),
            schema.name()
        )));
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Resolve equality conditions against the schema. Repeated fields are kept:
/// all conditions must hold.
pub fn prepare_conditions<'s, I, K>(
    schema: &'s ModelSchema,
    conditions: I,
) -> Result<Vec<(&'s FieldDescriptor, Value)>>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    conditions
        .into_iter()
        .map(|(name, value)| {
            let field = schema.field(name.as_ref())?;
            Ok((field, coerce_field(field, value)?))
        })
        .collect()
}

/// Resolve an update patch. The patch must be non-empty, must not touch the
/// id and may name each field at most once.
pub fn prepare_patch<'s, I, K>(
    schema: &'s ModelSchema,
    patch: I,
) -> Result<Vec<(&'s FieldDescriptor, Value)>>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for (name, value) in patch {
        let name = name.as_ref();
        if name == ID_COLUMN {
            return Err(CsvOrmError::Validation("The id field is immutable".into()));
        }
        let field = schema.field(name)?;
        if !seen.insert(field.position()) {
            return Err(CsvOrmError::Validation(format!(
                "Field '{name}' is patched more than once"
            )));
        }
        resolved.push((field, coerce_field(field, value)?));
    }

    if resolved.is_empty() {
        return Err(CsvOrmError::Validation("Update patch is empty".into()));
    }

    Ok(resolved)
}

fn coerce_field(field: &FieldDescriptor, value: Value) -> Result<Value> {
    let type_name = value.type_name();
    value.coerce(field.field_type()).ok_or_else(|| {
        CsvOrmError::Validation(format!(
            "Field '{}' expected {}, got {type_name}",
            field.name(),
            field.field_type()
        ))
    })
}
