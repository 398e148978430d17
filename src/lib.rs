//! Persistence lifecycle engine on SQLite.
//!
//! persistlite detects the installed data version, creates the physical
//! schema from a registered set of entity types, and moves whole databases
//! in and out of a versioned interchange file set without breaking
//! foreign-key integrity.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use persistlite::{ColumnType, EntityRegistry, EntityType, PersistConfig, PersistManager};
//!
//! let registry = EntityRegistry::from_entities([
//!     EntityType::new("Account").column("name", ColumnType::Text),
//!     EntityType::new("Build")
//!         .column("number", ColumnType::Integer)
//!         .foreign_key("account", "Account"),
//! ])?;
//! let manager = PersistManager::open("app.db", PersistConfig::default(), registry)?;
//! manager.start()?;
//! manager.export_data("backup", 1000)?;
//! manager.import_data("backup")?;
//! # Ok::<(), persistlite::PersistError>(())
//! ```
//!
//! # Components
//!
//! - [`ordering`] - foreign-key dependency order of entity types
//! - [`schema`] - generated DDL split into creation, constraint and drop sets
//! - [`executor`] - fail-fast and best-effort statement execution
//! - [`version`] - stored data version detection
//! - [`export`] / [`import`] - batched interchange documents
//! - [`PersistManager`] - the lifecycle context tying them together

pub mod config;
pub mod context;
pub mod dialect;
pub mod errors;
pub mod executor;
pub mod export;
pub mod import;
pub mod interchange;
pub mod manager;
pub mod migration;
pub mod model;
pub mod naming;
pub mod ordering;
pub mod registry;
pub mod schema;
pub mod store;
pub mod unit_of_work;
pub mod version;

pub use config::PersistConfig;
pub use context::PersistContext;
pub use dialect::{Dialect, DialectKind, MysqlDialect, PostgresDialect, SqliteDialect};
pub use errors::{MismatchScope, PersistError};
pub use executor::{ExecutionPolicy, ExecutionReport, SqlExecutor};
pub use export::{DEFAULT_BATCH_SIZE, ExportSummary};
pub use import::ImportSummary;
pub use manager::{MigrationOutcome, PersistManager, StartOutcome};
pub use migration::{Migrator, StepMigrator};
pub use model::{ColumnType, EntityType};
pub use naming::{NamingStrategy, SnakeCaseNaming};
pub use ordering::{dependency_order, import_order};
pub use registry::EntityRegistry;
pub use schema::{SchemaScript, SqlCategory, SqlStatement};
pub use store::{EntityRecord, EntityStore};
pub use version::VersionState;
