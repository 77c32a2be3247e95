use crate::error::{CsvOrmError, Result};
use super::types::ModelDefinition;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Parse a model file into a ModelDefinition
pub fn parse_model(path: &Path) -> Result<ModelDefinition> {
    let content = std::fs::read_to_string(path)?;
    parse_model_str(&content)
        .map_err(|e| CsvOrmError::Schema(format!("{}: {e}", path.display())))
}

/// Parse a model YAML string into a ModelDefinition
pub fn parse_model_str(content: &str) -> Result<ModelDefinition> {
    let model: ModelDefinition = serde_yaml::from_str(content)?;
    Ok(model)
}

/// Find every model file (`*.yaml` / `*.yml`) directly inside `dir`, sorted by path.
pub fn model_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = format!("{}/*.{}", dir.display(), ext);
        let matches = glob::glob(&pattern)
            .map_err(|e| CsvOrmError::Other(format!("Glob error: {e}")))?;
        files.extend(matches.filter_map(|r| r.ok()));
    }
    files.sort();
    Ok(files)
}

/// Load all model definitions from `models_dir` followed by each extra search path.
///
/// The models directory must exist; search paths that do not exist are skipped.
pub fn load_definitions(models_dir: &Path, search_paths: &[PathBuf]) -> Result<Vec<ModelDefinition>> {
    if !models_dir.is_dir() {
        return Err(CsvOrmError::Configuration(format!(
            "Models path not found: {}",
            models_dir.display()
        )));
    }

    let mut dirs = vec![models_dir.to_path_buf()];
    dirs.extend(search_paths.iter().filter(|p| p.is_dir()).cloned());

    let mut seen = HashSet::new();
    let mut definitions = Vec::new();
    for dir in &dirs {
        for file in model_files(dir)? {
            let definition = parse_model(&file)?;
            if !seen.insert(definition.name.to_lowercase()) {
                return Err(CsvOrmError::Schema(format!(
                    "Model '{}' is declared more than once, ignoring case (again in {})",
                    definition.name,
                    file.display()
                )));
            }
            log::debug!("Loaded model '{}' from {}", definition.name, file.display());
            definitions.push(definition);
        }
    }

    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use tempfile::TempDir;

    const CAR: &str = r#"
name: Car
fields:
  - { name: brand, type: string }
  - { name: doors, type: integer }
  - { name: price, type: float }
  - { name: plate, type: string }
unique: [plate]
"#;

    #[test]
    fn test_parse_model_str_keeps_field_order() {
        let model = parse_model_str(CAR).unwrap();
        assert_eq!(model.name, "Car");
        let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["brand", "doors", "price", "plate"]);
        assert_eq!(model.fields[1].field_type, FieldType::Integer);
        assert_eq!(model.unique, vec!["plate".to_string()]);
    }

    #[test]
    fn test_unique_defaults_to_empty() {
        let model = parse_model_str("name: Tag\nfields:\n  - { name: label, type: string }\n").unwrap();
        assert!(model.unique.is_empty());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = parse_model_str("name: Tag\nfields:\n  - { name: label, type: blob }\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_definitions_from_models_and_search_paths() {
        let tmp = TempDir::new().unwrap();
        let models = tmp.path().join("models");
        let extra = tmp.path().join("shared");
        std::fs::create_dir_all(&models).unwrap();
        std::fs::create_dir_all(&extra).unwrap();
        std::fs::write(models.join("car.yaml"), CAR).unwrap();
        std::fs::write(
            extra.join("user.yml"),
            "name: User\nfields:\n  - { name: email, type: string }\nunique: [email]\n",
        )
        .unwrap();
        std::fs::write(models.join("notes.txt"), "not a model").unwrap();

        let defs = load_definitions(&models, &[extra, tmp.path().join("missing")]).unwrap();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Car", "User"]);
    }

    #[test]
    fn test_missing_models_dir_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_definitions(&tmp.path().join("models"), &[]).unwrap_err();
        assert!(matches!(err, CsvOrmError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_model_names_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.yaml"), CAR).unwrap();
        std::fs::write(tmp.path().join("b.yaml"), CAR).unwrap();
        let err = load_definitions(tmp.path(), &[]).unwrap_err();
        assert!(matches!(err, CsvOrmError::Schema(_)));
    }

    #[test]
    fn test_model_names_differing_only_in_case_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.yaml"), CAR).unwrap();
        std::fs::write(
            tmp.path().join("b.yaml"),
            "name: car\nfields:\n  - { name: wheels, type: integer }\n",
        )
        .unwrap();
        let err = load_definitions(tmp.path(), &[]).unwrap_err();
        assert!(matches!(err, CsvOrmError::Schema(_)));
    }
}
