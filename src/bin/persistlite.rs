use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use persistlite::{
    DialectKind, EntityRegistry, PersistConfig, PersistError, PersistManager, VersionState,
};

/// Schema lifecycle and bulk export/import for SQLite databases.
#[derive(Parser)]
#[command(name = "persistlite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file, or `memory` for a throwaway in-memory database
    #[arg(global = true, long = "db", default_value = "memory")]
    database: String,

    /// JSON file declaring the entity types
    #[arg(global = true, long)]
    schema: Option<PathBuf>,

    /// JSON configuration file
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    /// Enable debug logging, including every executed statement
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema on an empty database or validate its data version
    Start,
    /// Report the stored data version
    Status,
    /// Export every table into batched JSON documents
    Export {
        #[arg(long)]
        output: PathBuf,
        /// Rows per document (defaults to the configured batch size)
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Replace all data with an exported file set
    Import {
        #[arg(long)]
        input: PathBuf,
    },
    /// Apply all foreign-key constraints
    ApplyConstraints,
    /// Drop all foreign-key constraints, ignoring ones already absent
    DropConstraints,
    /// Upgrade an exported file set to the application data version
    Migrate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the creation script for a backend
    Script {
        #[arg(long, default_value_t = DialectKind::Sqlite)]
        dialect: DialectKind,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let manager = match open_manager(&cli) {
        Ok(manager) => manager,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = run_command(&manager, &cli.command) {
        eprintln!("command failed: {err}");
        process::exit(1);
    }
}

fn open_manager(cli: &Cli) -> Result<PersistManager, PersistError> {
    let config = match &cli.config {
        Some(path) => PersistConfig::from_path(path)?,
        None => PersistConfig::default(),
    };
    let registry = match &cli.schema {
        Some(path) => EntityRegistry::from_path(path)?,
        None => EntityRegistry::new(),
    };
    if cli.database == "memory" {
        PersistManager::open_in_memory(config, registry)
    } else {
        PersistManager::open(&cli.database, config, registry)
    }
}

fn run_command(manager: &PersistManager, command: &Commands) -> Result<(), PersistError> {
    let payload = match command {
        Commands::Start => {
            let outcome = manager.start()?;
            json!({
                "command": "start",
                "outcome": outcome,
                "data_version": manager.data_version(),
            })
        }
        Commands::Status => {
            let state = manager.status()?;
            let stored = match &state {
                VersionState::Mismatched { stored, .. } => Some(stored.clone()),
                VersionState::Current => Some(manager.data_version().to_string()),
                VersionState::Uninitialized => None,
            };
            json!({
                "command": "status",
                "state": state,
                "stored_version": stored,
                "data_version": manager.data_version(),
                "entity_types": manager.registry().len(),
            })
        }
        Commands::Export { output, batch_size } => {
            let batch_size = batch_size.unwrap_or(manager.config().export_batch_size);
            let summary = manager.export_data(output, batch_size)?;
            json!({
                "command": "export",
                "output": output.display().to_string(),
                "batch_size": batch_size,
                "rows": summary.total_rows(),
                "documents": summary.total_documents(),
                "entities": summary.entities,
            })
        }
        Commands::Import { input } => {
            let summary = manager.import_data(input)?;
            let rows = summary.total_rows();
            json!({
                "command": "import",
                "input": input.display().to_string(),
                "data_version": summary.data_version,
                "rows": rows,
                "constraints_applied": summary.constraints_applied,
                "entities": summary.entities,
            })
        }
        Commands::ApplyConstraints => {
            let report = manager.apply_foreign_key_constraints()?;
            json!({
                "command": "apply-constraints",
                "executed": report.executed,
            })
        }
        Commands::DropConstraints => {
            let report = manager.drop_foreign_key_constraints()?;
            json!({
                "command": "drop-constraints",
                "executed": report.executed,
                "failures": report.failures,
            })
        }
        Commands::Migrate { input } => {
            let outcome = manager.migrate(input)?;
            json!({
                "command": "migrate",
                "from_version": outcome.from_version,
                "to_version": outcome.to_version,
                "migrated": outcome.migrated,
            })
        }
        Commands::Script { dialect } => {
            let script = manager.schema_script(*dialect)?;
            print!("{}", script.render());
            return Ok(());
        }
    };
    println!("{payload}");
    Ok(())
}
