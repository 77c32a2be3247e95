//! Project configuration (`csvorm.yaml`) and project scaffolding.

use crate::error::{CsvOrmError, Result};
use crate::schema::{self, ModelDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the project configuration, found at the project root.
pub const CONFIG_FILE: &str = "csvorm.yaml";

/// Configuration written by [`init_project`].
pub const DEFAULT_CONFIG: &str = "\
project:
  models: models
  generated: generated
  data: data
search_paths: []
";

/// The configuration file as written on disk. Paths are relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub project: ProjectSection,
    #[serde(default)]
    pub search_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub models: String,
    pub generated: String,
    #[serde(default = "default_data_dir")]
    pub data: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Resolved project configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub models_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Extra directories scanned for model files after `models_dir`.
    pub search_paths: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Load `csvorm.yaml` from the project root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(CsvOrmError::Configuration(format!(
                "Missing {CONFIG_FILE} in {}",
                root.display()
            )));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CsvOrmError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::parse(root, &content)
    }

    /// Parse configuration content, resolving paths against `root`.
    pub fn parse(root: &Path, content: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| CsvOrmError::Configuration(format!("Invalid {CONFIG_FILE}: {e}")))?;

        Ok(ProjectConfig {
            root: root.to_path_buf(),
            models_dir: root.join(&file.project.models),
            generated_dir: root.join(&file.project.generated),
            data_dir: root.join(&file.project.data),
            search_paths: file.search_paths.iter().map(|p| root.join(p)).collect(),
        })
    }

    /// Find the project root for `start`: the nearest ancestor holding a
    /// `csvorm.yaml`, or failing that the nearest holding a `.git` directory.
    pub fn find_root(start: &Path) -> Result<PathBuf> {
        if let Some(dir) = start.ancestors().find(|dir| dir.join(CONFIG_FILE).is_file()) {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = start.ancestors().find(|dir| dir.join(".git").exists()) {
            return Ok(dir.to_path_buf());
        }
        Err(CsvOrmError::Configuration(format!(
            "No project root found from {} (no {CONFIG_FILE} or .git in any parent)",
            start.display()
        )))
    }

    /// Locate the project root from `start` and load its configuration.
    pub fn discover(start: &Path) -> Result<Self> {
        Self::load(&Self::find_root(start)?)
    }

    /// Every directory scanned for model files, models dir first.
    pub fn model_dirs(&self) -> Vec<&Path> {
        std::iter::once(self.models_dir.as_path())
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .collect()
    }

    pub fn load_definitions(&self) -> Result<Vec<ModelDefinition>> {
        schema::load_definitions(&self.models_dir, &self.search_paths)
    }
}

/// What [`init_project`] created.
#[derive(Debug, Clone, PartialEq)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub created_config: bool,
    pub models_dir: PathBuf,
    pub created_models_dir: bool,
}

/// Scaffold a project: a models directory and a default `csvorm.yaml`.
/// An existing configuration is left untouched.
pub fn init_project(root: &Path) -> Result<InitReport> {
    let config_path = root.join(CONFIG_FILE);
    let created_config = !config_path.exists();
    if created_config {
        std::fs::create_dir_all(root)?;
        std::fs::write(&config_path, DEFAULT_CONFIG)?;
        log::info!("Wrote {}", config_path.display());
    }

    let config = ProjectConfig::load(root)?;
    let created_models_dir = !config.models_dir.is_dir();
    if created_models_dir {
        std::fs::create_dir_all(&config.models_dir)?;
        log::info!("Created {}", config.models_dir.display());
    }

    Ok(InitReport {
        config_path,
        created_config,
        models_dir: config.models_dir,
        created_models_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_resolves_paths() {
        let root = Path::new("/srv/app");
        let config = ProjectConfig::parse(
            root,
            "project:\n  models: models\n  generated: src/generated\nsearch_paths: [shared/models]\n",
        )
        .unwrap();
        assert_eq!(
            config,
            ProjectConfig {
                root: root.to_path_buf(),
                models_dir: root.join("models"),
                generated_dir: root.join("src/generated"),
                data_dir: root.join("data"),
                search_paths: vec![root.join("shared/models")],
            }
        );
    }

    #[test]
    fn test_missing_config_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let err = ProjectConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, CsvOrmError::Configuration(_)));
    }

    #[test]
    fn test_invalid_config_is_configuration_error() {
        let err = ProjectConfig::parse(Path::new("."), "project: [1, 2]").unwrap_err();
        assert!(matches!(err, CsvOrmError::Configuration(_)));
    }

    #[test]
    fn test_init_project_scaffolds_once() {
        let tmp = TempDir::new().unwrap();
        let report = init_project(tmp.path()).unwrap();
        assert!(report.created_config);
        assert!(report.created_models_dir);
        assert!(tmp.path().join("models").is_dir());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap(),
            DEFAULT_CONFIG
        );

        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "project:\n  models: schema\n  generated: gen\n",
        )
        .unwrap();
        let again = init_project(tmp.path()).unwrap();
        assert!(!again.created_config);
        assert!(again.created_models_dir);
        assert_eq!(again.models_dir, tmp.path().join("schema"));
    }

    #[test]
    fn test_find_root_walks_up() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), DEFAULT_CONFIG).unwrap();
        let nested = tmp.path().join("src/deep/er");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(ProjectConfig::find_root(&nested).unwrap(), tmp.path());
        let config = ProjectConfig::discover(&nested).unwrap();
        assert_eq!(config.models_dir, tmp.path().join("models"));
    }

    #[test]
    fn test_find_root_falls_back_to_git() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git")).unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(ProjectConfig::find_root(&nested).unwrap(), tmp.path());
    }
}
