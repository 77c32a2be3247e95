// Update and delete as whole-file rewrites

use crate::error::{CsvOrmError, Result};
use crate::query::Query;
use crate::record::Record;
use crate::schema::{FieldDescriptor, ModelSchema};
use crate::storage::{self, StoredRow};
use crate::validation;
use crate::value::Value;
use csv::StringRecord;
use std::collections::HashSet;
use uuid::Uuid;

/// Whether an update re-validates unique fields against the patched values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniqueCheck {
    #[default]
    Skip,
    Enforce,
}

/// Delete every record the query returns, keeping the rest in their original
/// order. Returns the number of deleted records.
pub fn delete(query: &Query<'_>) -> Result<usize> {
    let schema = query.schema();
    let rows = storage::read_rows(schema)?;
    let matched = matched_ids(query, &rows)?;
    if matched.is_empty() {
        return Ok(0);
    }

    let kept = rows
        .into_iter()
        .filter(|row| !matched.contains(&row.record.id()))
        .map(|row| row.raw);
    storage::rewrite(schema, kept)?;

    log::info!("Deleted {} record(s) from '{}'", matched.len(), schema.name());
    Ok(matched.len())
}

/// Overwrite the patched fields of every record the query returns. Rows that
/// are not matched are written back exactly as they were read. Returns the
/// number of updated records.
pub fn update<I, K>(query: &Query<'_>, patch: I, check: UniqueCheck) -> Result<usize>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let schema = query.schema();
    let patch = validation::prepare_patch(schema, patch)?;
    let rows = storage::read_rows(schema)?;
    let matched = matched_ids(query, &rows)?;
    if matched.is_empty() {
        return Ok(0);
    }

    // Unmatched rows keep their original cells; patched rows are re-encoded.
    let rewritten: Vec<(Record, Option<StringRecord>)> = rows
        .into_iter()
        .map(|StoredRow { mut record, raw }| {
            if matched.contains(&record.id()) {
                for (field, value) in &patch {
                    field.set(&mut record, value.clone());
                }
                (record, None)
            } else {
                (record, Some(raw))
            }
        })
        .collect();

    if check == UniqueCheck::Enforce {
        check_patched_uniques(schema, &patch, &rewritten)?;
    }

    storage::rewrite(
        schema,
        rewritten
            .into_iter()
            .map(|(record, raw)| raw.unwrap_or_else(|| storage::encode(&record))),
    )?;

    log::info!("Updated {} record(s) in '{}'", matched.len(), schema.name());
    Ok(matched.len())
}

fn matched_ids(query: &Query<'_>, rows: &[StoredRow]) -> Result<HashSet<Uuid>> {
    let records = rows.iter().map(|row| row.record.clone()).collect();
    Ok(query
        .evaluate(records)?
        .iter()
        .map(Record::id)
        .collect())
}

/// Every patched record must hold a value for each patched unique field that
/// no other row holds.
fn check_patched_uniques(
    schema: &ModelSchema,
    patch: &[(&FieldDescriptor, Value)],
    rows: &[(Record, Option<StringRecord>)],
) -> Result<()> {
    for (field, value) in patch {
        if !schema.is_unique(field.name()) {
            continue;
        }
        let holders = rows
            .iter()
            .filter(|(record, _)| field.get(record) == value)
            .count();
        // Every matched row now holds the patched value.
        if holders > 1 {
            return Err(CsvOrmError::DuplicateKey {
                field: field.name().to_string(),
                value: value.render(),
            });
        }
    }
    Ok(())
}
