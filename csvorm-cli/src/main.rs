use clap::{Parser, Subcommand, ValueEnum};
use csvorm::schema::ID_COLUMN;
use csvorm::watcher::ModelWatcher;
use csvorm::{CsvOrmError, ModelSchema, ProjectConfig, Query, Store, Value};
use std::path::PathBuf;
use std::process;

/// csvorm CLI: manage a csvorm project and its CSV-backed records
#[derive(Parser)]
#[command(name = "csvorm", version, about)]
struct Cli {
    /// Project root (default: nearest directory with csvorm.yaml or .git)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create the models directory and a default csvorm.yaml
    Init,

    /// Generate typed Rust declarations from the model files
    #[command(name = "generate_types", alias = "generate-types")]
    GenerateTypes,

    /// Regenerate types whenever a model file changes
    Watch,

    /// List the project's models
    Models,

    /// List records of a model
    List {
        /// Model name
        model: String,
        /// Equality filters (e.g. --filter color=red)
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
        /// Sort ascending by this field
        #[arg(long)]
        order_by: Option<String>,
        /// Skip this many records after sorting
        #[arg(long)]
        offset: Option<usize>,
        /// Return at most this many records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Count records of a model
    Count {
        /// Model name
        model: String,
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// Insert a new record
    Insert {
        /// Model name
        model: String,
        /// Field values (e.g. --field brand=Volvo)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Update every matching record
    Update {
        /// Model name
        model: String,
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
        /// New field values (e.g. --set color=blue)
        #[arg(long = "set", value_parser = parse_key_value, required = true)]
        set: Vec<(String, String)>,
        /// Reject updates that would duplicate a unique field's value
        #[arg(long)]
        check_unique: bool,
    },

    /// Delete every matching record
    Delete {
        /// Model name
        model: String,
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = cli.format;

    match cli.command {
        Command::Init => {
            let root = match cli.root {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            let report = csvorm::config::init_project(&root)?;
            print_output(
                &serde_json::json!({
                    "config": report.config_path.display().to_string(),
                    "created_config": report.created_config,
                    "models": report.models_dir.display().to_string(),
                    "created_models": report.created_models_dir,
                }),
                &format,
            )?;
        }

        Command::GenerateTypes => {
            let config = ProjectConfig::load(&project_root(cli.root)?)?;
            let path = csvorm_codegen::generate_for_project(&config)?;
            print_output(
                &serde_json::json!({ "ok": true, "output": path.display().to_string() }),
                &format,
            )?;
        }

        Command::Watch => {
            let config = ProjectConfig::load(&project_root(cli.root)?)?;
            csvorm_codegen::generate_for_project(&config)?;
            let watcher = ModelWatcher::start(&config.model_dirs())?;
            log::info!("Watching for model changes (Ctrl-C to stop)");

            for change in watcher.changes.iter() {
                for path in &change.paths {
                    log::info!("Model file changed: {}", path.display());
                }
                match csvorm_codegen::generate_for_project(&config) {
                    Ok(path) => println!("Regenerated {}", path.display()),
                    Err(e) => eprintln!("ERROR:{e}"),
                }
            }
        }

        Command::Models => {
            let store = Store::open(project_root(cli.root)?)?;
            let models: Vec<_> = store
                .models()
                .map(|schema| {
                    let fields: Vec<_> = schema
                        .fields()
                        .iter()
                        .map(|f| serde_json::json!({ "name": f.name(), "type": f.field_type().as_str() }))
                        .collect();
                    let unique: Vec<_> = schema.unique_fields().map(|f| f.name()).collect();
                    serde_json::json!({
                        "name": schema.name(),
                        "fields": fields,
                        "unique": unique,
                        "storage": schema.storage_path().display().to_string(),
                    })
                })
                .collect();
            print_output(&serde_json::Value::Array(models), &format)?;
        }

        Command::List {
            model,
            filters,
            order_by,
            offset,
            limit,
        } => {
            let store = Store::open(project_root(cli.root)?)?;
            let table = store.table(&model)?;
            let mut query = filtered_query(table.query(), &filters)?;
            if let Some(field) = order_by {
                query = query.order_by(field)?;
            }
            if let Some(n) = offset {
                query = query.offset(n);
            }
            if let Some(n) = limit {
                query = query.limit(n);
            }
            let records: Vec<_> = query
                .all()?
                .iter()
                .map(|record| record.to_json(table.schema()))
                .collect();
            print_output(&serde_json::Value::Array(records), &format)?;
        }

        Command::Count { model, filters } => {
            let store = Store::open(project_root(cli.root)?)?;
            let table = store.table(&model)?;
            let count = filtered_query(table.query(), &filters)?.count()?;
            print_output(&serde_json::json!({ "count": count }), &format)?;
        }

        Command::Insert { model, fields } => {
            let store = Store::open(project_root(cli.root)?)?;
            let table = store.table(&model)?;
            let values = parse_values(table.schema(), &fields)?;
            let record = table.insert(values)?;
            print_output(&record.to_json(table.schema()), &format)?;
        }

        Command::Update {
            model,
            filters,
            set,
            check_unique,
        } => {
            let store = Store::open(project_root(cli.root)?)?;
            let table = store.table(&model)?;
            let query = filtered_query(table.query(), &filters)?;
            let patch = parse_values(table.schema(), &set)?;
            let updated = if check_unique {
                query.update_checked(patch)?
            } else {
                query.update(patch)?
            };
            print_output(&serde_json::json!({ "ok": true, "updated": updated }), &format)?;
        }

        Command::Delete { model, filters } => {
            let store = Store::open(project_root(cli.root)?)?;
            let table = store.table(&model)?;
            let deleted = filtered_query(table.query(), &filters)?.delete()?;
            print_output(&serde_json::json!({ "ok": true, "deleted": deleted }), &format)?;
        }
    }

    Ok(())
}

fn project_root(root: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match root {
        Some(root) => Ok(root),
        None => Ok(ProjectConfig::find_root(&std::env::current_dir()?)?),
    }
}

/// Parse `key=value` pairs using each field's declared type. An `id` pair is
/// passed through as text for the store to reject.
fn parse_values(
    schema: &ModelSchema,
    pairs: &[(String, String)],
) -> csvorm::Result<Vec<(String, Value)>> {
    pairs
        .iter()
        .map(|(key, raw)| {
            if key == ID_COLUMN {
                return Ok((key.clone(), Value::from(raw.as_str())));
            }
            let field = schema.field(key)?;
            let value = Value::parse(raw, field.field_type())
                .map_err(|reason| CsvOrmError::Validation(format!("Field '{key}': {reason}")))?;
            Ok((key.clone(), value))
        })
        .collect()
}

fn filtered_query<'a>(query: Query<'a>, filters: &[(String, String)]) -> csvorm::Result<Query<'a>> {
    if filters.is_empty() {
        return Ok(query);
    }
    let conditions = parse_values(query.schema(), filters)?;
    query.filter(conditions)
}

fn print_output(value: &serde_json::Value, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
