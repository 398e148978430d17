use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::{
    config::PersistConfig,
    context::PersistContext,
    dialect::{DialectKind, SqliteDialect},
    errors::{MismatchScope, PersistError},
    executor::{ExecutionPolicy, ExecutionReport},
    export::{ExportSummary, export_data},
    import::{ImportSummary, import_data},
    interchange,
    migration::{Migrator, StepMigrator},
    naming::NamingStrategy,
    ordering::dependency_order,
    registry::EntityRegistry,
    schema::SchemaScript,
    version::{VersionState, check_version, write_data_version},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Created,
    Validated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub from_version: String,
    pub to_version: String,
    pub migrated: bool,
}

/// Every operation holds the connection for its whole duration. Concurrent
/// schema changes or imports from several processes are not supported.
pub struct PersistManager {
    conn: Mutex<Connection>,
    registry: EntityRegistry,
    config: PersistConfig,
    dialect: SqliteDialect,
    naming: Box<dyn NamingStrategy>,
    migrator: Box<dyn Migrator>,
}

impl PersistManager {
    pub fn open<P: AsRef<Path>>(
        path: P,
        config: PersistConfig,
        registry: EntityRegistry,
    ) -> Result<Self, PersistError> {
        let conn =
            Connection::open(path).map_err(|e| PersistError::connection(e.to_string()))?;
        Self::from_connection(conn, config, registry)
    }

    pub fn open_in_memory(
        config: PersistConfig,
        registry: EntityRegistry,
    ) -> Result<Self, PersistError> {
        let conn =
            Connection::open_in_memory().map_err(|e| PersistError::connection(e.to_string()))?;
        Self::from_connection(conn, config, registry)
    }

    fn from_connection(
        conn: Connection,
        config: PersistConfig,
        registry: EntityRegistry,
    ) -> Result<Self, PersistError> {
        config.validate()?;
        dependency_order(&registry)?;
        for (key, value) in &config.pragma_settings {
            conn.pragma_update(None, key, value)
                .map_err(|e| PersistError::connection(format!("pragma {key}: {e}")))?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
            naming: Box::new(config.naming()),
            migrator: Box::new(StepMigrator::new(config.data_version.clone())),
            registry,
            config,
            dialect: SqliteDialect,
        })
    }

    /// Replaces the migrator; its version becomes the application data version.
    pub fn with_migrator<M: Migrator + 'static>(mut self, migrator: M) -> Self {
        self.migrator = Box::new(migrator);
        self
    }

    pub fn with_naming<N: NamingStrategy + 'static>(mut self, naming: N) -> Self {
        self.naming = Box::new(naming);
        self
    }

    pub fn data_version(&self) -> &str {
        self.migrator.data_version()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    pub fn with_context<R, F>(&self, f: F) -> Result<R, PersistError>
    where
        F: FnOnce(&PersistContext<'_>) -> Result<R, PersistError>,
    {
        let conn = self.conn.lock();
        let ctx = PersistContext::new(&conn, &self.registry, &self.dialect, self.naming.as_ref());
        f(&ctx)
    }

    /// Creates the schema on an empty database or checks the stored version.
    ///
    /// A version mismatch is fatal: the operator must migrate an export of
    /// the database and import it instead.
    pub fn start(&self) -> Result<StartOutcome, PersistError> {
        let expected = self.data_version().to_string();
        self.with_context(|ctx| {
            info!("checking data version");
            match check_version(ctx, &expected)? {
                VersionState::Current => Ok(StartOutcome::Validated),
                VersionState::Mismatched { stored, expected } => Err(
                    PersistError::version_mismatch(MismatchScope::Database, stored, expected),
                ),
                VersionState::Uninitialized => {
                    info!("creating schema");
                    let script = ctx.script()?;
                    let executor = ctx.executor();
                    executor.execute(&script.creation, ExecutionPolicy::FailFast)?;
                    executor.execute(&script.constraints, ExecutionPolicy::FailFast)?;
                    write_data_version(ctx, &expected)?;
                    info!(version = %expected, "recorded data version");
                    Ok(StartOutcome::Created)
                }
            }
        })
    }

    pub fn status(&self) -> Result<VersionState, PersistError> {
        let expected = self.data_version().to_string();
        self.with_context(|ctx| check_version(ctx, &expected))
    }

    pub fn export_data<P: AsRef<Path>>(
        &self,
        dir: P,
        batch_size: usize,
    ) -> Result<ExportSummary, PersistError> {
        self.with_context(|ctx| export_data(ctx, dir.as_ref(), batch_size))
    }

    pub fn import_data<P: AsRef<Path>>(&self, dir: P) -> Result<ImportSummary, PersistError> {
        let expected = self.data_version().to_string();
        self.with_context(|ctx| import_data(ctx, dir.as_ref(), &expected))
    }

    pub fn apply_foreign_key_constraints(&self) -> Result<ExecutionReport, PersistError> {
        self.with_context(|ctx| ctx.apply_foreign_key_constraints())
    }

    pub fn drop_foreign_key_constraints(&self) -> Result<ExecutionReport, PersistError> {
        self.with_context(|ctx| ctx.drop_foreign_key_constraints())
    }

    /// Upgrades an exported file set in place to the application data version.
    pub fn migrate<P: AsRef<Path>>(&self, dir: P) -> Result<MigrationOutcome, PersistError> {
        let dir = dir.as_ref();
        let from_version = interchange::read_version(dir)?;
        let migrated = self.migrator.migrate(&from_version, dir)?;
        let to_version = self.data_version().to_string();
        if migrated {
            interchange::write_version(dir, &to_version)?;
            info!(from = %from_version, to = %to_version, "migrated data files");
        }
        Ok(MigrationOutcome {
            from_version,
            to_version,
            migrated,
        })
    }

    pub fn schema_script(&self, kind: DialectKind) -> Result<SchemaScript, PersistError> {
        let dialect = kind.dialect();
        SchemaScript::generate(&self.registry, dialect.as_ref(), self.naming.as_ref())
    }

    pub fn close(self) -> Result<(), PersistError> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| PersistError::connection(e.to_string()))
    }
}
