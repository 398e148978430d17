use rusqlite::Connection;

use crate::errors::PersistError;

/// One atomic sequence of statements on a connection.
///
/// Rolls back on drop unless [`UnitOfWork::commit`] succeeded, so every exit
/// path of the caller releases the transaction.
pub struct UnitOfWork<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(conn: &'a Connection) -> Result<Self, PersistError> {
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| PersistError::connection(format!("unable to begin unit of work: {e}")))?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    pub fn conn(&self) -> &'a Connection {
        self.conn
    }

    pub fn commit(mut self) -> Result<(), PersistError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| PersistError::connection(format!("unable to commit unit of work: {e}")))?;
        self.committed = true;
        Ok(())
    }

    /// Runs `f` and commits its work; any error rolls everything back.
    pub fn run<F, R>(self, f: F) -> Result<R, PersistError>
    where
        F: FnOnce(&'a Connection) -> Result<R, PersistError>,
    {
        let result = f(self.conn)?;
        self.commit()?;
        Ok(result)
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
