// Records: one stored row, as plain (id, ordered values)

use crate::error::{CsvOrmError, Result};
use crate::schema::ModelSchema;
use crate::value::{FromValue, Value};
use serde::Serialize;
use uuid::Uuid;

/// A stored row: an immutable id plus one value per schema field, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Uuid,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(id: Uuid, values: Vec<Value>) -> Self {
        Record { id, values }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// Get a field value by name.
    pub fn get(&self, schema: &ModelSchema, field: &str) -> Result<&Value> {
        Ok(schema.field(field)?.get(self))
    }

    /// Get a field value by name, converted to a Rust type.
    pub fn get_as<T: FromValue>(&self, schema: &ModelSchema, field: &str) -> Result<T> {
        let value = self.get(schema, field)?;
        T::from_value(value).ok_or_else(|| {
            CsvOrmError::Validation(format!(
                "Field '{field}' of {}/{} holds {} value '{value}'",
                schema.name(),
                self.id,
                value.type_name()
            ))
        })
    }

    /// Render the record as a JSON object with `id` first, then fields in order.
    pub fn to_json(&self, schema: &ModelSchema) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("id".into(), serde_json::Value::String(self.id.to_string()));
        for field in schema.fields() {
            obj.insert(field.name().to_string(), field.get(self).to_json());
        }
        serde_json::Value::Object(obj)
    }
}

/// A typed record: the stored id together with a model value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity<T> {
    pub id: Uuid,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use std::path::Path;

    fn schema() -> ModelSchema {
        ModelSchema::builder("User")
            .field("name", FieldType::String)
            .field("age", FieldType::Integer)
            .build(Path::new("data"))
            .unwrap()
    }

    #[test]
    fn test_get_and_get_as() {
        let schema = schema();
        let record = Record::new(Uuid::new_v4(), vec![Value::from("Ana"), Value::Integer(31)]);
        assert_eq!(record.get(&schema, "name").unwrap(), &Value::from("Ana"));
        assert_eq!(record.get_as::<i64>(&schema, "age").unwrap(), 31);
        assert!(matches!(
            record.get_as::<bool>(&schema, "age"),
            Err(CsvOrmError::Validation(_))
        ));
        assert!(matches!(record.get(&schema, "email"), Err(CsvOrmError::Schema(_))));
    }

    #[test]
    fn test_to_json() {
        let schema = schema();
        let id = Uuid::new_v4();
        let record = Record::new(id, vec![Value::from("Ana"), Value::Integer(31)]);
        let json = record.to_json(&schema);
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["name"], "Ana");
        assert_eq!(json["age"], 31);
    }
}
