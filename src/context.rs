use rusqlite::Connection;

use crate::{
    dialect::Dialect,
    errors::PersistError,
    executor::{ExecutionPolicy, ExecutionReport, SqlExecutor},
    naming::NamingStrategy,
    registry::EntityRegistry,
    schema::SchemaScript,
};

/// Everything one lifecycle operation needs, borrowed for its duration.
#[derive(Clone, Copy)]
pub struct PersistContext<'a> {
    pub conn: &'a Connection,
    pub registry: &'a EntityRegistry,
    pub dialect: &'a dyn Dialect,
    pub naming: &'a dyn NamingStrategy,
}

impl<'a> PersistContext<'a> {
    pub fn new(
        conn: &'a Connection,
        registry: &'a EntityRegistry,
        dialect: &'a dyn Dialect,
        naming: &'a dyn NamingStrategy,
    ) -> Self {
        Self {
            conn,
            registry,
            dialect,
            naming,
        }
    }

    pub fn script(&self) -> Result<SchemaScript, PersistError> {
        SchemaScript::generate(self.registry, self.dialect, self.naming)
    }

    pub fn executor(&self) -> SqlExecutor<'a> {
        SqlExecutor::new(self.conn, self.dialect)
    }

    /// Creates all tables and indexes, without foreign-key constraints.
    pub fn create_tables(&self) -> Result<ExecutionReport, PersistError> {
        let script = self.script()?;
        self.executor()
            .execute(&script.creation, ExecutionPolicy::FailFast)
    }

    pub fn apply_foreign_key_constraints(&self) -> Result<ExecutionReport, PersistError> {
        let script = self.script()?;
        self.executor()
            .execute(&script.constraints, ExecutionPolicy::FailFast)
    }

    pub fn drop_foreign_key_constraints(&self) -> Result<ExecutionReport, PersistError> {
        let script = self.script()?;
        self.executor()
            .execute(&script.drop_constraints, ExecutionPolicy::BestEffort)
    }

    /// Drops every schema object, tolerating objects that are already gone.
    pub fn drop_all(&self) -> Result<ExecutionReport, PersistError> {
        let script = self.script()?;
        self.executor().execute(&script.drop, ExecutionPolicy::BestEffort)
    }

    pub fn table_name(&self, entity: &str) -> String {
        self.naming.table_name(entity)
    }
}
