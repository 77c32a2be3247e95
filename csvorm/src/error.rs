use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvOrmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate value for unique field '{field}': {value}")]
    DuplicateKey { field: String, value: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Cannot sort by '{field}': value '{value}' is not comparable")]
    NotComparable { field: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Corrupt storage file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Atomic replace failed: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CsvOrmError>;
