//! Traits implemented by generated model code.

use crate::error::Result;
use crate::record::Record;
use crate::schema::{ModelDefinition, ModelSchema};
use crate::value::Value;

/// A Rust type stored as one row of a model's storage file.
pub trait Model: Sized {
    /// The model's declaration: name, ordered fields and unique fields.
    fn definition() -> ModelDefinition;

    /// Field values keyed by field name.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    fn from_record(schema: &ModelSchema, record: &Record) -> Result<Self>;
}

/// A typed equality filter whose set fields are AND-ed together.
pub trait Filter {
    fn into_conditions(self) -> Vec<(&'static str, Value)>;
}
