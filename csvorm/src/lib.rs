pub mod config;
pub mod error;
pub mod model;
pub mod mutation;
pub mod query;
pub mod record;
pub mod schema;
pub mod storage;
pub mod store;
pub mod validation;
pub mod value;
pub mod watcher;

pub use config::ProjectConfig;
pub use error::{CsvOrmError, Result};
pub use model::{Filter, Model};
pub use mutation::UniqueCheck;
pub use query::Query;
pub use record::{Entity, Record};
pub use schema::{FieldDefinition, FieldType, ModelDefinition, ModelSchema};
pub use store::{Store, Table};
pub use value::{FromValue, Value};

pub use chrono;
pub use uuid;
