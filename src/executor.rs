use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dialect::Dialect, errors::PersistError, schema::SqlStatement, unit_of_work::UnitOfWork,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Stop at the first failing statement, roll back and report it.
    FailFast,
    /// Log each failure and carry on with the next statement.
    BestEffort,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementFailure {
    pub statement: String,
    pub message: String,
    pub missing_object: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub executed: usize,
    pub failures: Vec<StatementFailure>,
}

impl ExecutionReport {
    pub fn attempted(&self) -> usize {
        self.executed + self.failures.len()
    }
}

pub struct SqlExecutor<'a> {
    conn: &'a Connection,
    dialect: &'a dyn Dialect,
}

impl<'a> SqlExecutor<'a> {
    pub fn new(conn: &'a Connection, dialect: &'a dyn Dialect) -> Self {
        Self { conn, dialect }
    }

    /// Executes `statements` in order. Under [`ExecutionPolicy::FailFast`] the
    /// whole list is one unit of work; under [`ExecutionPolicy::BestEffort`]
    /// every statement commits on its own so one failure cannot poison the rest.
    pub fn execute<'s, I>(
        &self,
        statements: I,
        policy: ExecutionPolicy,
    ) -> Result<ExecutionReport, PersistError>
    where
        I: IntoIterator<Item = &'s SqlStatement>,
    {
        match policy {
            ExecutionPolicy::FailFast => {
                UnitOfWork::begin(self.conn)?.run(|conn| {
                    let mut report = ExecutionReport::default();
                    for statement in statements {
                        debug!(category = %statement.category, sql = %statement.sql, "executing sql");
                        conn.execute_batch(&statement.sql)
                            .map_err(|e| PersistError::sql(&statement.sql, e.to_string()))?;
                        report.executed += 1;
                    }
                    Ok(report)
                })
            }
            ExecutionPolicy::BestEffort => {
                let mut report = ExecutionReport::default();
                for statement in statements {
                    debug!(category = %statement.category, sql = %statement.sql, "executing sql");
                    match self.conn.execute_batch(&statement.sql) {
                        Ok(()) => report.executed += 1,
                        Err(err) => {
                            let message = err.to_string();
                            let missing_object = self.dialect.is_missing_object(&message);
                            if missing_object {
                                debug!(sql = %statement.sql, error = %message, "object already absent");
                            } else {
                                warn!(sql = %statement.sql, error = %message, "error executing sql");
                            }
                            report.failures.push(StatementFailure {
                                statement: statement.sql.clone(),
                                message,
                                missing_object,
                            });
                        }
                    }
                }
                Ok(report)
            }
        }
    }
}
