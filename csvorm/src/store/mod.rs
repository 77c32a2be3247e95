use crate::config::ProjectConfig;
use crate::error::{CsvOrmError, Result};
use crate::model::Model;
use crate::query::Query;
use crate::record::{Entity, Record};
use crate::schema::{ModelDefinition, ModelSchema};
use crate::storage;
use crate::validation;
use crate::value::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The main entry point for csvorm.
/// Holds the registered model schemas of a project, each bound to its CSV file
/// under the data directory, and hands out table handles for CRUD and queries.
pub struct Store {
    data_dir: PathBuf,
    config: Option<ProjectConfig>,
    models: BTreeMap<String, ModelSchema>,
}

impl Store {
    /// Open the project at `root`: read `csvorm.yaml` and register every model
    /// file found in the configured model directories.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let config = ProjectConfig::load(root.as_ref())?;
        let definitions = config.load_definitions()?;

        let mut store = Store::new(&config.data_dir);
        for definition in definitions {
            store.register(definition)?;
        }
        log::debug!(
            "Opened project at {} with {} model(s)",
            config.root.display(),
            store.models.len()
        );
        store.config = Some(config);
        Ok(store)
    }

    /// An empty store keeping its files under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Store {
            data_dir: data_dir.as_ref().to_path_buf(),
            config: None,
            models: BTreeMap::new(),
        }
    }

    /// Validate and register a model definition.
    pub fn register(&mut self, definition: ModelDefinition) -> Result<&ModelSchema> {
        let schema = ModelSchema::new(definition, &self.data_dir)?;
        if let Some(existing) = self
            .models
            .values()
            .find(|existing| existing.storage_path() == schema.storage_path())
        {
            return Err(CsvOrmError::Schema(format!(
                "Model '{}' conflicts with registered model '{}' (both stored in {})",
                schema.name(),
                existing.name(),
                schema.storage_path().display()
            )));
        }
        let name = schema.name().to_string();
        Ok(self.models.entry(name).or_insert(schema))
    }

    /// Register the schema of a typed model.
    pub fn register_model<M: Model>(&mut self) -> Result<&ModelSchema> {
        self.register(M::definition())
    }

    /// Look up a model by name. An exact match wins; otherwise the name is
    /// matched case-insensitively.
    pub fn model(&self, name: &str) -> Option<&ModelSchema> {
        self.models.get(name).or_else(|| {
            self.models
                .values()
                .find(|schema| schema.name().eq_ignore_ascii_case(name))
        })
    }

    /// Get a table handle for a registered model.
    pub fn table(&self, name: &str) -> Result<Table<'_>> {
        self.model(name)
            .map(Table::new)
            .ok_or_else(|| CsvOrmError::Schema(format!("Model '{name}' is not registered")))
    }

    /// Get the table handle for a typed model.
    pub fn table_for<M: Model>(&self) -> Result<Table<'_>> {
        self.table(&M::definition().name)
    }

    /// Registered schemas, ordered by model name.
    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.values()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The project configuration, when opened with [`Store::open`].
    pub fn config(&self) -> Option<&ProjectConfig> {
        self.config.as_ref()
    }
}

/// A handle to the records of one model.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    schema: &'a ModelSchema,
}

impl<'a> Table<'a> {
    pub fn new(schema: &'a ModelSchema) -> Self {
        Table { schema }
    }

    pub fn schema(&self) -> &'a ModelSchema {
        self.schema
    }

    /// Create the storage file with its header if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        storage::ensure(self.schema)?;
        Ok(())
    }

    /// Insert a new record and return it with its freshly assigned id.
    ///
    /// Every field must be given. Fails with a duplicate-key error, writing
    /// nothing, when a unique field's value is already stored.
    pub fn insert<I, K>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let values = validation::prepare_values(self.schema, values)?;
        storage::ensure(self.schema)?;

        let existing = storage::read_records(self.schema)?;
        for field in self.schema.unique_fields() {
            let candidate = &values[field.position()];
            if existing.iter().any(|record| field.get(record) == candidate) {
                return Err(CsvOrmError::DuplicateKey {
                    field: field.name().to_string(),
                    value: candidate.render(),
                });
            }
        }

        let record = Record::new(Uuid::new_v4(), values);
        storage::append(self.schema, &record)?;
        Ok(record)
    }

    /// Insert a typed model value.
    pub fn insert_model<M: Model>(&self, model: M) -> Result<Entity<M>> {
        let record = self.insert(model.to_values())?;
        Ok(Entity {
            id: record.id(),
            data: model,
        })
    }

    /// Every record in file order. Empty when the file does not exist yet.
    pub fn scan_all(&self) -> Result<Vec<Record>> {
        storage::read_records(self.schema)
    }

    /// Start a query over this table.
    pub fn query(&self) -> Query<'a> {
        Query::new(self.schema)
    }

    /// Start a query with an equality filter.
    pub fn filter<I, K>(&self, conditions: I) -> Result<Query<'a>>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.query().filter(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG_FILE, DEFAULT_CONFIG};
    use crate::model::Filter;
    use crate::schema::{FieldDefinition, FieldType};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup_test_project() -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), DEFAULT_CONFIG).unwrap();
        std::fs::create_dir_all(tmp.path().join("models")).unwrap();
        std::fs::write(
            tmp.path().join("models/car.yaml"),
            r#"
name: Car
fields:
  - { name: brand, type: string }
  - { name: doors, type: integer }
  - { name: price, type: integer }
  - { name: plate, type: string }
  - { name: color, type: string }
unique: [plate]
"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("models/user.yaml"),
            r#"
name: User
fields:
  - { name: national_id, type: integer }
  - { name: name, type: string }
  - { name: age, type: integer }
unique: [national_id]
"#,
        )
        .unwrap();

        let store = Store::open(tmp.path()).unwrap();
        (tmp, store)
    }

    fn car(brand: &str, doors: i64, price: i64, plate: &str, color: &str) -> Vec<(&'static str, Value)> {
        vec![
            ("brand", Value::from(brand)),
            ("doors", Value::Integer(doors)),
            ("price", Value::Integer(price)),
            ("plate", Value::from(plate)),
            ("color", Value::from(color)),
        ]
    }

    #[test]
    fn test_open_project() {
        let (tmp, store) = setup_test_project();
        let names: Vec<_> = store.models().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Car", "User"]);
        assert_eq!(
            store.model("car").unwrap().storage_path(),
            tmp.path().join("data/car.csv")
        );
        assert!(store.config().is_some());
    }

    #[test]
    fn test_unknown_model() {
        let (_tmp, store) = setup_test_project();
        assert!(matches!(store.table("Truck"), Err(CsvOrmError::Schema(_))));
    }

    #[test]
    fn test_register_twice_rejected() {
        let mut store = Store::new("data");
        let definition = ModelDefinition {
            name: "Tag".into(),
            fields: vec![FieldDefinition::new("label", FieldType::String)],
            unique: vec![],
        };
        store.register(definition.clone()).unwrap();
        assert!(matches!(store.register(definition), Err(CsvOrmError::Schema(_))));
    }

    #[test]
    fn test_names_differing_only_in_case_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = Store::new(tmp.path());
        store
            .register(ModelDefinition {
                name: "Car".into(),
                fields: vec![FieldDefinition::new("brand", FieldType::String)],
                unique: vec![],
            })
            .unwrap();

        let err = store
            .register(ModelDefinition {
                name: "car".into(),
                fields: vec![FieldDefinition::new("wheels", FieldType::Integer)],
                unique: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, CsvOrmError::Schema(_)));
        assert_eq!(store.models().count(), 1);

        store
            .table("Car")
            .unwrap()
            .insert([("brand", Value::from("Volvo"))])
            .unwrap();
        assert_eq!(store.table("car").unwrap().schema().name(), "Car");
        assert_eq!(store.table("car").unwrap().scan_all().unwrap().len(), 1);
    }

    #[test]
    fn test_insert_then_scan_roundtrip() {
        let (tmp, store) = setup_test_project();
        let cars = store.table("Car").unwrap();

        let first = cars.insert(car("Mazda", 4, 20000, "ABC-123", "red")).unwrap();
        let second = cars.insert(car("Fiat", 2, 9000, "XYZ-987", "blue")).unwrap();
        assert_ne!(first.id(), second.id());
        assert!(!first.id().is_nil());

        let all = cars.scan_all().unwrap();
        assert_eq!(all, vec![first.clone(), second]);

        let content = std::fs::read_to_string(tmp.path().join("data/car.csv")).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("id,brand,doors,price,plate,color"));
        assert_eq!(
            lines.next(),
            Some(format!("{},Mazda,4,20000,ABC-123,red", first.id()).as_str())
        );
    }

    #[test]
    fn test_duplicate_unique_value_rejected() {
        let (tmp, store) = setup_test_project();
        let cars = store.table("Car").unwrap();
        cars.insert(car("Mazda", 4, 20000, "ABC-123", "red")).unwrap();
        let before = std::fs::read_to_string(tmp.path().join("data/car.csv")).unwrap();

        let result = cars.insert(car("Kia", 4, 15000, "ABC-123", "white"));
        match result {
            Err(CsvOrmError::DuplicateKey { field, value }) => {
                assert_eq!(field, "plate");
                assert_eq!(value, "ABC-123");
            }
            other => panic!("expected duplicate key error, got {other:?}"),
        }

        let after = std::fs::read_to_string(tmp.path().join("data/car.csv")).unwrap();
        assert_eq!(before, after);
        assert_eq!(cars.scan_all().unwrap().len(), 1);
    }

    #[test]
    fn test_non_unique_fields_may_repeat() {
        let (_tmp, store) = setup_test_project();
        let cars = store.table("Car").unwrap();
        cars.insert(car("Mazda", 4, 20000, "A", "red")).unwrap();
        cars.insert(car("Mazda", 4, 20000, "B", "red")).unwrap();
        assert_eq!(cars.query().count().unwrap(), 2);
    }

    #[test]
    fn test_failed_validation_creates_no_file() {
        let (tmp, store) = setup_test_project();
        let users = store.table("User").unwrap();
        let result = users.insert([("name", Value::from("Ana"))]);
        assert!(matches!(result, Err(CsvOrmError::Validation(_))));
        assert!(!tmp.path().join("data/user.csv").exists());
    }

    #[test]
    fn test_ensure_creates_header_only() {
        let (tmp, store) = setup_test_project();
        let users = store.table("User").unwrap();
        users.ensure().unwrap();
        users.ensure().unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("data/user.csv")).unwrap(),
            "id,national_id,name,age\n"
        );
        assert!(users.scan_all().unwrap().is_empty());
    }

    #[test]
    fn test_ids_are_unique_across_many_inserts() {
        let (_tmp, store) = setup_test_project();
        let users = store.table("User").unwrap();
        for n in 0..50 {
            users
                .insert([
                    ("national_id", Value::Integer(n)),
                    ("name", Value::from(format!("user{n}"))),
                    ("age", Value::Integer(20 + n % 7)),
                ])
                .unwrap();
        }
        let ids: HashSet<_> = users.scan_all().unwrap().iter().map(Record::id).collect();
        assert_eq!(ids.len(), 50);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        label: String,
        weight: i64,
    }

    impl Model for Tag {
        fn definition() -> ModelDefinition {
            ModelDefinition {
                name: "Tag".into(),
                fields: vec![
                    FieldDefinition::new("label", FieldType::String),
                    FieldDefinition::new("weight", FieldType::Integer),
                ],
                unique: vec!["label".into()],
            }
        }

        fn to_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("label", Value::from(self.label.clone())),
                ("weight", Value::from(self.weight)),
            ]
        }

        fn from_record(schema: &ModelSchema, record: &Record) -> Result<Self> {
            Ok(Tag {
                label: record.get_as(schema, "label")?,
                weight: record.get_as(schema, "weight")?,
            })
        }
    }

    #[derive(Default)]
    struct TagWhere {
        label: Option<String>,
        weight: Option<i64>,
    }

    impl Filter for TagWhere {
        fn into_conditions(self) -> Vec<(&'static str, Value)> {
            let mut conditions = Vec::new();
            if let Some(v) = self.label {
                conditions.push(("label", Value::from(v)));
            }
            if let Some(v) = self.weight {
                conditions.push(("weight", Value::from(v)));
            }
            conditions
        }
    }

    #[test]
    fn test_typed_models() {
        let tmp = TempDir::new().unwrap();
        let mut store = Store::new(tmp.path());
        store.register_model::<Tag>().unwrap();
        let tags = store.table_for::<Tag>().unwrap();

        let rust = tags
            .insert_model(Tag { label: "rust".into(), weight: 3 })
            .unwrap();
        tags.insert_model(Tag { label: "csv".into(), weight: 1 }).unwrap();
        tags.insert_model(Tag { label: "orm".into(), weight: 3 }).unwrap();

        let heavy: Vec<Entity<Tag>> = tags
            .query()
            .filter_by(TagWhere { weight: Some(3), ..Default::default() })
            .unwrap()
            .order_by("label")
            .unwrap()
            .fetch()
            .unwrap();
        let labels: Vec<_> = heavy.iter().map(|e| e.data.label.as_str()).collect();
        assert_eq!(labels, vec!["orm", "rust"]);
        assert_eq!(heavy[1], rust);
    }
}
