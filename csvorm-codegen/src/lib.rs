//! csvorm code generation: typed Rust models from a project's model files.
//!
//! For every model this emits a data struct implementing `csvorm::Model`, a
//! `<Model>Where` filter struct, and a `<Model>Field` enum. A single
//! `StoreExt` trait adds one typed table accessor per model to `csvorm::Store`.
//!
//! The main entry point is [`generate_for_project`], which loads the models of
//! a project and writes `models.rs` into its generated directory.

mod filter_gen;
mod generator;
mod store_gen;
mod struct_gen;
pub mod type_utils;

use csvorm::schema::{parse_model_str, ModelDefinition, ModelSchema};
use csvorm::ProjectConfig;
use std::path::{Path, PathBuf};

/// File written into the project's generated directory.
pub const OUTPUT_FILE: &str = "models.rs";

/// Generate Rust source for a set of model definitions.
///
/// Each definition is validated first, so an invalid model never produces code.
pub fn generate_from_definitions(
    definitions: &[ModelDefinition],
) -> Result<String, Box<dyn std::error::Error>> {
    for definition in definitions {
        ModelSchema::new(definition.clone(), Path::new(""))?;
    }
    type_utils::check_identifiers(definitions)?;
    let tokens = generator::generate_all(definitions);
    let formatted = generator::format_token_stream(&tokens)?;
    Ok(formatted)
}

/// Generate Rust source from a single model YAML string. Useful for testing.
pub fn generate_from_model_str(model_yaml: &str) -> Result<String, Box<dyn std::error::Error>> {
    let definition = parse_model_str(model_yaml)?;
    generate_from_definitions(&[definition])
}

/// Load every model of the project and write the generated source to
/// `<generated_dir>/models.rs`. Returns the path written.
///
/// # Example
///
/// ```no_run
/// let config = csvorm::ProjectConfig::discover(std::path::Path::new(".")).unwrap();
/// csvorm_codegen::generate_for_project(&config).unwrap();
/// ```
pub fn generate_for_project(config: &ProjectConfig) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let definitions = config.load_definitions()?;
    let formatted = generate_from_definitions(&definitions)?;

    std::fs::create_dir_all(&config.generated_dir)?;
    let output_path = config.generated_dir.join(OUTPUT_FILE);
    std::fs::write(&output_path, formatted)?;
    log::info!(
        "Generated {} model(s) into {}",
        definitions.len(),
        output_path.display()
    );
    Ok(output_path)
}
