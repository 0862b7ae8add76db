//! Tilestore CLI
//!
//! Command-line interface for sparse arrays:
//! - Create arrays from a JSON schema, or build the `all_datetimes` fixture
//! - Write and read single coordinates
//! - Read and set array metadata
//! - Inspect, export, remove and unlock arrays

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tilestore::config::{generate_default_config, Config, LoggingConfig};
use tilestore::fixture;
use tilestore::storage::{
    ArraySchema, CellMap, CellValue, Datatype, OpenMode, SparseArrayStore, StorageError,
};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "tilestore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sparse multi-dimensional arrays with datetime attributes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty array from a JSON schema file
    Create {
        /// Array directory
        path: PathBuf,
        /// Schema file ({"dimensions": [...], "attributes": [...], "sparse": true})
        schema: PathBuf,
    },

    /// Build the all_datetimes test array
    Fixture {
        /// Array directory
        #[arg(default_value = fixture::ARRAY_NAME)]
        path: PathBuf,
    },

    /// Write every attribute of one coordinate
    Write {
        /// Array directory
        path: PathBuf,
        /// Coordinate keys, comma-separated (e.g. 1 or 3,-2)
        coordinate: String,
        /// Attribute values in name=value format
        #[arg(short = 's', long = "set", required = true)]
        values: Vec<String>,
    },

    /// Read one coordinate
    Read {
        /// Array directory
        path: PathBuf,
        /// Coordinate keys, comma-separated
        coordinate: String,
    },

    /// List array metadata, or set one key
    Meta {
        /// Array directory
        path: PathBuf,
        /// Key to set; omit to list every key
        key: Option<String>,
        /// Value to store under the key
        #[arg(requires = "key")]
        value: Option<String>,
        /// Datatype of the value (int64 or datetime64[<unit>])
        #[arg(short = 't', long = "type", default_value = "int64")]
        datatype: String,
        /// Remove the key instead of setting it
        #[arg(long, requires = "key", conflicts_with = "value")]
        delete: bool,
    },

    /// Show schema and statistics
    Info {
        /// Array directory
        path: PathBuf,
    },

    /// Export every written coordinate as CSV
    Export {
        /// Array directory
        path: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete an array
    Remove {
        /// Array directory
        path: PathBuf,
    },

    /// Remove a writer lock left by a crashed process
    Unlock {
        /// Array directory
        path: PathBuf,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    let store_config = config.storage.store_config();
    tracing::debug!("Store config: {:?}", store_config);

    match cli.command {
        Commands::Create { path, schema } => {
            let content = std::fs::read_to_string(&schema)
                .with_context(|| format!("reading schema {:?}", schema))?;
            let schema: ArraySchema = serde_json::from_str(&content)
                .with_context(|| format!("parsing schema {:?}", schema))?;

            let store = SparseArrayStore::create_with(&path, schema, &store_config)?;
            println!(
                "Created {:?} with {} dimensions and {} attributes",
                path,
                store.schema().dimensions().len(),
                store.schema().attributes().len()
            );
        }

        Commands::Fixture { path } => {
            fixture::build_all_datetimes(&path, &store_config)?;
            println!("Built {:?}", path);
        }

        Commands::Write {
            path,
            coordinate,
            values,
        } => {
            let coordinate = parse_coordinate(&coordinate)?;
            let mut store = SparseArrayStore::open_with(&path, OpenMode::Write, &store_config)?;
            let cells = parse_cells(store.schema(), &values)?;

            store.write(&coordinate, &cells)?;
            store.close()?;
            println!("Wrote {:?}", coordinate);
        }

        Commands::Read { path, coordinate } => {
            let coordinate = parse_coordinate(&coordinate)?;
            let cells =
                SparseArrayStore::scoped(&path, OpenMode::Read, |store| store.read(&coordinate))?;

            match cells {
                Some(cells) => print_cells(&cells, cli.format)?,
                None => {
                    eprintln!("No cells at {:?}", coordinate);
                    std::process::exit(1);
                }
            }
        }

        Commands::Meta {
            path,
            key,
            value,
            datatype,
            delete,
        } => match (key, value) {
            (Some(key), _) if delete => {
                let removed = SparseArrayStore::scoped_with(
                    &path,
                    OpenMode::Write,
                    &store_config,
                    |store| store.delete_metadata(&key),
                )?;
                match removed {
                    Some(_) => println!("Removed '{}'", key),
                    None => println!("'{}' was not set", key),
                }
            }
            (Some(key), Some(value)) => {
                let datatype: Datatype = datatype.parse()?;
                let value = CellValue::parse(&value, datatype)
                    .with_context(|| format!("metadata '{}'", key))?;
                SparseArrayStore::scoped_with(&path, OpenMode::Write, &store_config, |store| {
                    store.put_metadata(&key, value)
                })?;
                println!("Set '{}' = {}", key, value);
            }
            (Some(key), None) => {
                let value = SparseArrayStore::scoped(&path, OpenMode::Read, |store| {
                    store.metadata(&key)
                })?;
                match value {
                    Some(value) => {
                        let mut cells = CellMap::new();
                        cells.insert(key, value);
                        print_cells(&cells, cli.format)?;
                    }
                    None => {
                        eprintln!("No metadata '{}'", key);
                        std::process::exit(1);
                    }
                }
            }
            (None, _) => {
                let metadata = SparseArrayStore::scoped(&path, OpenMode::Read, |store| {
                    Ok(store.metadata_entries()?.clone())
                })?;
                print_cells(&metadata, cli.format)?;
            }
        },

        Commands::Info { path } => {
            let store = SparseArrayStore::open(&path, OpenMode::Read)?;
            print_info(&store, cli.format)?;
        }

        Commands::Export { path, output } => {
            let mut store = SparseArrayStore::open(&path, OpenMode::Read)?;
            let sink: Box<dyn Write> = match &output {
                Some(file) => Box::new(
                    std::fs::File::create(file)
                        .with_context(|| format!("creating {:?}", file))?,
                ),
                None => Box::new(std::io::stdout()),
            };
            let rows = export_csv(&mut store, sink)?;

            if let Some(file) = output {
                println!("Exported {} rows to {:?}", rows, file);
            }
        }

        Commands::Remove { path } => {
            SparseArrayStore::remove(&path)?;
            println!("Removed {:?}", path);
        }

        Commands::Unlock { path } => {
            if SparseArrayStore::break_lock(&path)? {
                println!("Removed writer lock on {:?}", path);
            } else {
                println!("{:?} was not locked", path);
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber; logs go to stderr or the configured file
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tilestore={}", config.level)));

    let writer = match &config.file {
        Some(file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("opening log file {}", file))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init(),
    }
    Ok(())
}

fn parse_coordinate(text: &str) -> Result<Vec<i64>> {
    text.split(',')
        .map(|key| {
            key.trim()
                .parse::<i64>()
                .with_context(|| format!("invalid coordinate key '{}'", key))
        })
        .collect()
}

/// Parse `name=value` pairs against the array's declared datatypes
fn parse_cells(schema: &ArraySchema, values: &[String]) -> Result<CellMap> {
    let mut cells = CellMap::new();
    for pair in values {
        let (name, value) = match pair.split_once('=') {
            Some(parts) => parts,
            None => bail!("expected name=value, got '{}'", pair),
        };
        let name = name.trim();
        let attr = schema
            .attribute_index(name)
            .map(|i| &schema.attributes()[i])
            .ok_or_else(|| StorageError::UnknownAttribute(name.to_string()))?;

        let cell = CellValue::parse(value, attr.datatype)
            .with_context(|| format!("attribute '{}'", name))?;
        cells.insert(name.to_string(), cell);
    }
    Ok(cells)
}

fn print_cells(cells: &CellMap, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json: serde_json::Map<String, serde_json::Value> = cells
                .iter()
                .map(|(name, cell)| {
                    (
                        name.clone(),
                        serde_json::json!({
                            "datatype": cell.datatype().to_string(),
                            "raw": cell.to_cell(),
                            "value": cell.to_string(),
                        }),
                    )
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            let width = cells.keys().map(|k| k.len()).max().unwrap_or(0);
            for (name, cell) in cells {
                println!(
                    "{:<width$}  {:<16}  {}",
                    name,
                    cell.datatype().to_string(),
                    cell,
                    width = width
                );
            }
        }
    }
    Ok(())
}

fn print_info(store: &SparseArrayStore, format: OutputFormat) -> Result<()> {
    let stats = store.stats()?;
    let domain = store.non_empty_domain()?;

    if format == OutputFormat::Json {
        let json = serde_json::json!({
            "path": store.path(),
            "schema": store.schema(),
            "coordinates": stats.coordinates,
            "cells_per_column": stats.cells_per_column,
            "metadata": store.metadata_entries()?,
            "storage_size_bytes": stats.storage_size_bytes,
            "non_empty_domain": domain,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Array: {:?}", store.path());
    println!("Dimensions:");
    for dim in store.schema().dimensions() {
        println!(
            "  {} {} [{}, {}] tile {}",
            dim.name, dim.datatype, dim.domain.0, dim.domain.1, dim.tile_extent
        );
    }
    println!("Attributes:");
    for attr in store.schema().attributes() {
        println!("  {} {}", attr.name, attr.datatype);
    }
    match domain {
        Some(ranges) => println!("Non-empty domain: {:?}", ranges),
        None => println!("Non-empty domain: (empty)"),
    }
    let metadata = store.metadata_entries()?;
    if !metadata.is_empty() {
        println!("Metadata:");
        for (key, value) in metadata {
            println!("  {} {} = {}", key, value.datatype(), value);
        }
    }
    println!("{}", stats);
    Ok(())
}

/// Write one CSV row per coordinate: dimension keys, then attribute values
fn export_csv(store: &mut SparseArrayStore, sink: Box<dyn Write>) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(sink);

    let header: Vec<String> = store
        .schema()
        .dimensions()
        .iter()
        .map(|d| d.name.clone())
        .chain(store.schema().attributes().iter().map(|a| a.name.clone()))
        .collect();
    writer.write_record(&header)?;

    let attributes: Vec<String> = store
        .schema()
        .attributes()
        .iter()
        .map(|a| a.name.clone())
        .collect();

    let entries = store.entries()?;
    for (coordinate, cells) in &entries {
        let row: Vec<String> = coordinate
            .iter()
            .map(|k| k.to_string())
            .chain(
                attributes
                    .iter()
                    .map(|name| cells.get(name).map(|c| c.to_string()).unwrap_or_default()),
            )
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(entries.len())
}
