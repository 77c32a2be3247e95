//! Composable, schema-bound queries.
//!
//! A [`Query`] collects an equality filter, a sort field and pagination, and is
//! evaluated against a fresh full scan each time a terminal method runs.
//! Evaluation order is always filter, sort, offset, limit, whatever order the
//! builder methods were called in.

use crate::error::{CsvOrmError, Result};
use crate::model::{Filter, Model};
use crate::mutation::{self, UniqueCheck};
use crate::record::{Entity, Record};
use crate::schema::{FieldDescriptor, ModelSchema};
use crate::storage;
use crate::validation;
use crate::value::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct Query<'a> {
    schema: &'a ModelSchema,
    conditions: Vec<(&'a FieldDescriptor, Value)>,
    order_by: Option<&'a FieldDescriptor>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl<'a> Query<'a> {
    pub fn new(schema: &'a ModelSchema) -> Self {
        Query {
            schema,
            conditions: Vec::new(),
            order_by: None,
            offset: None,
            limit: None,
        }
    }

    pub fn schema(&self) -> &'a ModelSchema {
        self.schema
    }

    /// Set the equality filter, replacing any previous one. A row matches only
    /// if every condition holds.
    pub fn filter<I, K>(mut self, conditions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.conditions = validation::prepare_conditions(self.schema, conditions)?;
        Ok(self)
    }

    /// Set the filter from a typed filter value.
    pub fn filter_by<F: Filter>(self, filter: F) -> Result<Self> {
        self.filter(filter.into_conditions())
    }

    /// Sort ascending by a declared field.
    pub fn order_by(mut self, field: impl AsRef<str>) -> Result<Self> {
        self.order_by = Some(self.schema.field(field.as_ref())?);
        Ok(self)
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    // ── Terminal operations ────────────────────────────────────────

    /// Materialize the filtered, sorted and paged records.
    pub fn all(&self) -> Result<Vec<Record>> {
        let records = storage::read_records(self.schema)?;
        self.evaluate(records)
    }

    pub fn first(&self) -> Result<Option<Record>> {
        Ok(self.all()?.into_iter().next())
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(!self.all()?.is_empty())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }

    /// Materialize the results as typed entities.
    pub fn fetch<M: Model>(&self) -> Result<Vec<Entity<M>>> {
        self.all()?
            .iter()
            .map(|record| {
                Ok(Entity {
                    id: record.id(),
                    data: M::from_record(self.schema, record)?,
                })
            })
            .collect()
    }

    /// Delete every record this query returns. Returns the number deleted.
    pub fn delete(&self) -> Result<usize> {
        mutation::delete(self)
    }

    /// Overwrite the patched fields of every record this query returns.
    /// Unique fields are not re-checked; see [`Query::update_checked`].
    pub fn update<I, K>(&self, patch: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        mutation::update(self, patch, UniqueCheck::Skip)
    }

    /// Like [`Query::update`], but fails with a duplicate-key error when a
    /// patched unique field would collide with another row.
    pub fn update_checked<I, K>(&self, patch: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        mutation::update(self, patch, UniqueCheck::Enforce)
    }

    // ── Evaluation ─────────────────────────────────────────────────

    pub(crate) fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| field.get(record) == expected)
    }

    /// Apply filter, sort, offset and limit, in that order.
    pub(crate) fn evaluate(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut matched: Vec<Record> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();

        if let Some(field) = self.order_by {
            sort_records(&mut matched, field)?;
        }

        Ok(matched
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect())
    }
}

/// Stable ascending sort. Every value must be orderable as the field's
/// declared type, otherwise nothing is sorted and the query fails.
fn sort_records(records: &mut [Record], field: &FieldDescriptor) -> Result<()> {
    if let Some(bad) = records
        .iter()
        .map(|record| field.get(record))
        .find(|value| !value.is_orderable_as(field.field_type()))
    {
        return Err(CsvOrmError::NotComparable {
            field: field.name().to_string(),
            value: bad.render(),
        });
    }

    records.sort_by(|a, b| {
        field
            .get(a)
            .compare(field.get(b))
            .unwrap_or(Ordering::Equal)
    });
    Ok(())
}
