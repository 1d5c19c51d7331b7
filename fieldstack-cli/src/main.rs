//! fieldstack command line
//!
//! Inspects and edits custom field values in a SQLite attribute store.
//!
//! Usage:
//!   fieldstack --db fields.db load-fields fields.json
//!   fieldstack --db fields.db create issue --data '{"subject":"Crash"}' --values '{"42":"Alpha"}'
//!   fieldstack --db fields.db set <id> --values '{"7":["a","b"]}'
//!   fieldstack --db fields.db show <id>

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldstack_cli::{create, fields, load_config, load_fields, parse_json, schema, set, show, SaveReport};
use fieldstack_storage::SqliteStore;
use serde_json::Value;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "fieldstack")]
#[command(about = "Inspect and edit custom field values")]
struct Args {
    /// Path to the SQLite database
    #[arg(long, default_value = "fieldstack.db")]
    db: PathBuf,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store field definitions from a JSON array file
    LoadFields { file: PathBuf },
    /// List the field definitions of an entity type
    Fields { entity_type: String },
    /// Print the form field list of an entity type
    Schema { entity_type: String },
    /// Print a record with its custom values
    Show { id: String },
    /// Create a record
    Create {
        entity_type: String,
        /// The record's own columns (JSON object)
        #[arg(long, default_value = "{}")]
        data: String,
        /// Custom values: {"<field id>": value} or [{"id": .., "value": ..}]
        #[arg(long, default_value = "{}")]
        values: String,
    },
    /// Assign custom values to a record
    Set {
        id: String,
        #[arg(long)]
        values: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let builder = FmtSubscriber::builder().with_target(false).with_writer(std::io::stderr).compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => builder.with_max_level(level).init(),
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;
    debug!("Using {:?}", config);

    let output: Value = match args.command {
        Command::LoadFields { file } => {
            let count = load_fields(&store, &file)?;
            serde_json::json!({ "loaded": count })
        }
        Command::Fields { entity_type } => fields(&store, &entity_type)?,
        Command::Schema { entity_type } => schema(&store, &entity_type)?,
        Command::Show { id } => show(&store, config, &id)?,
        Command::Create {
            entity_type,
            data,
            values,
        } => {
            let data = parse_json(&data, "--data")?;
            let values = parse_json(&values, "--values")?;
            return print_report(create(&store, config, &entity_type, data, &values)?);
        }
        Command::Set { id, values } => {
            let values = parse_json(&values, "--values")?;
            return print_report(set(&store, config, &id, &values)?);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: SaveReport) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    Ok(match report {
        SaveReport::Saved { .. } => ExitCode::SUCCESS,
        SaveReport::Invalid(_) => ExitCode::from(2),
    })
}
