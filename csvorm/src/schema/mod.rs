mod parser;
mod types;

pub use parser::{load_definitions, model_files, parse_model, parse_model_str};
pub use types::{FieldDefinition, FieldType, ModelDefinition};

use crate::error::{CsvOrmError, Result};
use crate::record::Record;
use crate::value::Value;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Name of the leading identifier column in every storage file.
pub const ID_COLUMN: &str = "id";

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"))
}

/// A field of a bound schema: its name, declared type and column position.
///
/// Records are plain ordered value lists; every read or write of a field value
/// goes through its descriptor instead of a name lookup on the record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    position: usize,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Zero-based position among the model's fields (the id column is not counted).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn get<'r>(&self, record: &'r Record) -> &'r Value {
        &record.values()[self.position]
    }

    pub(crate) fn set(&self, record: &mut Record, value: Value) {
        record.values_mut()[self.position] = value;
    }
}

/// An immutable, validated model schema bound to its storage file.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    unique: Vec<usize>,
    storage_path: PathBuf,
}

impl ModelSchema {
    /// Validate a definition and bind it to `<data_dir>/<name-lowercase>.csv`.
    pub fn new(definition: ModelDefinition, data_dir: &Path) -> Result<Self> {
        let storage_path = data_dir.join(storage_file_name(&definition.name));
        Self::with_storage_path(definition, storage_path)
    }

    /// Validate a definition and bind it to an explicit storage file.
    pub fn with_storage_path(definition: ModelDefinition, storage_path: PathBuf) -> Result<Self> {
        let ModelDefinition {
            name,
            fields: field_defs,
            unique: unique_names,
        } = definition;

        if !identifier_pattern().is_match(&name) {
            return Err(CsvOrmError::Schema(format!(
                "Invalid model name '{name}'"
            )));
        }
        if field_defs.is_empty() {
            return Err(CsvOrmError::Schema(format!(
                "Model '{name}' declares no fields"
            )));
        }

        let mut fields = Vec::with_capacity(field_defs.len());
        let mut index = HashMap::new();
        for (position, def) in field_defs.into_iter().enumerate() {
            if !identifier_pattern().is_match(&def.name) {
                return Err(CsvOrmError::Schema(format!(
                    "Invalid field name '{}' in model '{name}'",
                    def.name
                )));
            }
            if def.name == ID_COLUMN {
                return Err(CsvOrmError::Schema(format!(
                    "Field name '{ID_COLUMN}' is reserved (model '{name}')"
                )));
            }
            if index.insert(def.name.clone(), position).is_some() {
                return Err(CsvOrmError::Schema(format!(
                    "Field '{}' is declared twice in model '{name}'",
                    def.name
                )));
            }
            fields.push(FieldDescriptor {
                name: def.name,
                field_type: def.field_type,
                position,
            });
        }

        let mut unique = Vec::new();
        for field in &unique_names {
            let position = *index.get(field).ok_or_else(|| {
                CsvOrmError::Schema(format!(
                    "Unique field '{field}' is not a field of model '{name}'"
                ))
            })?;
            if !unique.contains(&position) {
                unique.push(position);
            }
        }

        Ok(ModelSchema {
            name,
            fields,
            index,
            unique,
            storage_path,
        })
    }

    /// Start building a schema in code instead of from a model file.
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            definition: ModelDefinition {
                name: name.into(),
                fields: Vec::new(),
                unique: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Look up a declared field, failing with a schema error for unknown names.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.index
            .get(name)
            .map(|&position| &self.fields[position])
            .ok_or_else(|| {
                CsvOrmError::Schema(format!(
                    "Unknown field '{name}' for model '{}'",
                    self.name
                ))
            })
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.unique.iter().map(|&position| &self.fields[position])
    }

    pub fn is_unique(&self, name: &str) -> bool {
        self.index
            .get(name)
            .is_some_and(|position| self.unique.contains(position))
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// The storage header: `id` followed by the fields in declared order.
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(ID_COLUMN)
            .chain(self.field_names())
            .collect()
    }

    /// The declarative view of this schema, as read by code generation.
    pub fn definition(&self) -> ModelDefinition {
        ModelDefinition {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldDefinition::new(f.name.clone(), f.field_type))
                .collect(),
            unique: self.unique_fields().map(|f| f.name.clone()).collect(),
        }
    }
}

/// Storage file name for a model: the lowercased model name with a `.csv` extension.
pub fn storage_file_name(model_name: &str) -> String {
    format!("{}.csv", model_name.to_lowercase())
}

/// Builder for schemas declared in code.
pub struct ModelSchemaBuilder {
    definition: ModelDefinition,
}

impl ModelSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.definition
            .fields
            .push(FieldDefinition::new(name, field_type));
        self
    }

    pub fn unique(mut self, name: impl Into<String>) -> Self {
        self.definition.unique.push(name.into());
        self
    }

    pub fn definition(self) -> ModelDefinition {
        self.definition
    }

    pub fn build(self, data_dir: &Path) -> Result<ModelSchema> {
        ModelSchema::new(self.definition, data_dir)
    }
}
