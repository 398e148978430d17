use rusqlite::OptionalExtension;
use serde::Serialize;

use crate::{
    context::PersistContext,
    errors::PersistError,
    model::PRIMARY_KEY,
    registry::{VERSION_ENTITY, VERSION_FIELD},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VersionState {
    /// No version table: the schema has never been created.
    Uninitialized,
    Current,
    Mismatched { stored: String, expected: String },
}

/// Reads the stored data version, `None` when the version table is absent.
///
/// An empty or multi-row version table is a data format error: it is what an
/// interrupted restore leaves behind.
pub fn read_data_version(ctx: &PersistContext<'_>) -> Result<Option<String>, PersistError> {
    let table = ctx.table_name(VERSION_ENTITY);
    if !table_exists(ctx, &table)? {
        return Ok(None);
    }
    let sql = format!(
        "SELECT {} FROM {}",
        ctx.dialect.quote(&ctx.naming.column_name(VERSION_FIELD)),
        ctx.dialect.quote(&table)
    );
    let mut stmt = match ctx.conn.prepare(&sql) {
        Ok(stmt) => stmt,
        Err(err) if ctx.dialect.is_missing_object(&err.to_string()) => return Ok(None),
        Err(err) => return Err(PersistError::sql(sql, err.to_string())),
    };
    let versions: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect())
        .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
    match versions.as_slice() {
        [version] => Ok(Some(version.clone())),
        [] => Err(PersistError::data_format(
            "no data version found in database: this is normally caused by an unsuccessful \
             restore or upgrade, please clean the database and try again",
        )),
        _ => Err(PersistError::data_format(format!(
            "illegal data version format in database: {} version rows",
            versions.len()
        ))),
    }
}

pub fn check_version(
    ctx: &PersistContext<'_>,
    expected: &str,
) -> Result<VersionState, PersistError> {
    Ok(match read_data_version(ctx)? {
        None => VersionState::Uninitialized,
        Some(stored) if stored == expected => VersionState::Current,
        Some(stored) => VersionState::Mismatched {
            stored,
            expected: expected.to_string(),
        },
    })
}

/// Replaces the version row with `version`.
pub fn write_data_version(ctx: &PersistContext<'_>, version: &str) -> Result<(), PersistError> {
    let table = ctx.dialect.quote(&ctx.table_name(VERSION_ENTITY));
    let column = ctx.dialect.quote(&ctx.naming.column_name(VERSION_FIELD));
    let delete = format!("DELETE FROM {table}");
    ctx.conn
        .execute(&delete, [])
        .map_err(|e| PersistError::sql(&delete, e.to_string()))?;
    let insert = format!(
        "INSERT INTO {table}({}, {column}) VALUES(1, ?1)",
        ctx.dialect.quote(PRIMARY_KEY)
    );
    ctx.conn
        .execute(&insert, [version])
        .map_err(|e| PersistError::sql(&insert, e.to_string()))?;
    Ok(())
}

fn table_exists(ctx: &PersistContext<'_>, table: &str) -> Result<bool, PersistError> {
    ctx.conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
            [table],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(|e| PersistError::connection(e.to_string()))
}
