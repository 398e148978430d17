//! Row-level mapping between entity types and their tables.
//!
//! Rows travel as [`EntityRecord`]s: the primary key plus a flat map from
//! logical field name to JSON value. Foreign-key fields carry the referenced
//! primary key.

use rusqlite::{
    ErrorCode, ffi,
    types::{Value as SqlValue, ValueRef},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{
    context::PersistContext,
    errors::PersistError,
    model::{ColumnType, EntityType, PRIMARY_KEY},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityRecord {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    pub fn with<T: Into<String>, V: Into<Value>>(mut self, field: T, value: V) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}

struct FieldBinding<'e> {
    field: &'e str,
    column: String,
    column_type: ColumnType,
    nullable: bool,
}

pub struct EntityStore<'a> {
    ctx: PersistContext<'a>,
    entity: &'a EntityType,
    table: String,
    bindings: Vec<FieldBinding<'a>>,
}

impl<'a> EntityStore<'a> {
    pub fn new(ctx: PersistContext<'a>, entity: &'a EntityType) -> Self {
        let mut bindings: Vec<FieldBinding<'a>> = entity
            .columns
            .iter()
            .map(|c| FieldBinding {
                field: c.name.as_str(),
                column: ctx.naming.column_name(&c.name),
                column_type: c.column_type,
                nullable: c.nullable,
            })
            .collect();
        bindings.extend(entity.foreign_keys.iter().map(|fk| FieldBinding {
            field: fk.field.as_str(),
            column: ctx.naming.foreign_key_column(&fk.field),
            column_type: ColumnType::Integer,
            nullable: fk.nullable,
        }));
        Self {
            table: ctx.dialect.quote(&ctx.naming.table_name(&entity.name)),
            ctx,
            entity,
            bindings,
        }
    }

    pub fn entity(&self) -> &'a EntityType {
        self.entity
    }

    fn select_list(&self) -> String {
        std::iter::once(self.ctx.dialect.quote(PRIMARY_KEY))
            .chain(self.bindings.iter().map(|b| self.ctx.dialect.quote(&b.column)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn list_ids(&self) -> Result<Vec<i64>, PersistError> {
        let pk = self.ctx.dialect.quote(PRIMARY_KEY);
        let sql = format!("SELECT {pk} FROM {} ORDER BY {pk}", self.table);
        let mut stmt = self
            .ctx
            .conn
            .prepare_cached(&sql)
            .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(|e| PersistError::sql(&sql, e.to_string()))?);
        }
        Ok(ids)
    }

    pub fn count(&self) -> Result<usize, PersistError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        self.ctx
            .conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| PersistError::sql(&sql, e.to_string()))
    }

    /// Rows with `from_id <= id <= to_id`, ordered by id.
    pub fn load_range(&self, from_id: i64, to_id: i64) -> Result<Vec<EntityRecord>, PersistError> {
        let pk = self.ctx.dialect.quote(PRIMARY_KEY);
        let sql = format!(
            "SELECT {} FROM {} WHERE {pk} >= ?1 AND {pk} <= ?2 ORDER BY {pk}",
            self.select_list(),
            self.table
        );
        let mut stmt = self
            .ctx
            .conn
            .prepare_cached(&sql)
            .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
        let mut rows = stmt
            .query([from_id, to_id])
            .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| PersistError::sql(&sql, e.to_string()))? {
            let id: i64 = row
                .get(0)
                .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
            let mut record = EntityRecord::new(id);
            for (idx, binding) in self.bindings.iter().enumerate() {
                let raw = row
                    .get_ref(idx + 1)
                    .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
                let value = to_json(self.entity, binding, raw)?;
                record.fields.insert(binding.field.to_string(), value);
            }
            records.push(record);
        }
        Ok(records)
    }

    pub fn load_all(&self) -> Result<Vec<EntityRecord>, PersistError> {
        self.load_range(i64::MIN, i64::MAX)
    }

    pub fn get(&self, id: i64) -> Result<Option<EntityRecord>, PersistError> {
        Ok(self.load_range(id, id)?.pop())
    }

    /// Inserts a row preserving `record.id`. Never overwrites: an existing
    /// row with the same key is a [`PersistError::ReplicationConflict`].
    pub fn replicate(&self, record: &EntityRecord) -> Result<(), PersistError> {
        let mut values = vec![SqlValue::Integer(record.id)];
        values.extend(self.bind_values(record)?);
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {}({}) VALUES({})",
            self.table,
            self.select_list(),
            placeholders.join(", ")
        );
        let mut stmt = self
            .ctx
            .conn
            .prepare_cached(&sql)
            .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
        stmt.execute(rusqlite::params_from_iter(values))
            .map(|_| ())
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == ErrorCode::ConstraintViolation
                        && (err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                            || err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE) =>
                {
                    PersistError::replication_conflict(&self.entity.name, record.id, e.to_string())
                }
                other => PersistError::sql(&sql, other.to_string()),
            })
    }

    pub fn insert(&self, fields: &Map<String, Value>) -> Result<i64, PersistError> {
        let record = EntityRecord {
            id: 0,
            fields: fields.clone(),
        };
        let values = self.bind_values(&record)?;
        let columns: Vec<String> = self
            .bindings
            .iter()
            .map(|b| self.ctx.dialect.quote(&b.column))
            .collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            format!(
                "INSERT INTO {}({}) VALUES({})",
                self.table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        self.ctx
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| PersistError::sql(&sql, e.to_string()))?;
        Ok(self.ctx.conn.last_insert_rowid())
    }

    fn bind_values(&self, record: &EntityRecord) -> Result<Vec<SqlValue>, PersistError> {
        if let Some(unknown) = record
            .fields
            .keys()
            .find(|k| !self.bindings.iter().any(|b| b.field == k.as_str()))
        {
            return Err(PersistError::data_format(format!(
                "{} #{}: unknown field {unknown}",
                self.entity.name, record.id
            )));
        }
        self.bindings
            .iter()
            .map(|binding| to_sql(self.entity, record.id, binding, record.fields.get(binding.field)))
            .collect()
    }
}

fn to_json(
    entity: &EntityType,
    binding: &FieldBinding<'_>,
    raw: ValueRef<'_>,
) -> Result<Value, PersistError> {
    Ok(match (binding.column_type, raw) {
        (_, ValueRef::Null) => Value::Null,
        (ColumnType::Boolean, ValueRef::Integer(i)) => Value::Bool(i != 0),
        (ColumnType::Real, ValueRef::Integer(i)) => Value::from(i as f64),
        (_, ValueRef::Integer(i)) => Value::from(i),
        (_, ValueRef::Real(f)) => Number::from_f64(f).map(Value::Number).ok_or_else(|| {
            PersistError::data_format(format!(
                "{}.{}: non-finite real value",
                entity.name, binding.field
            ))
        })?,
        (_, ValueRef::Text(bytes)) => Value::String(
            std::str::from_utf8(bytes)
                .map_err(|e| {
                    PersistError::data_format(format!("{}.{}: {e}", entity.name, binding.field))
                })?
                .to_string(),
        ),
        (_, ValueRef::Blob(_)) => {
            return Err(PersistError::data_format(format!(
                "{}.{}: blob values are not supported",
                entity.name, binding.field
            )));
        }
    })
}

fn to_sql(
    entity: &EntityType,
    id: i64,
    binding: &FieldBinding<'_>,
    value: Option<&Value>,
) -> Result<SqlValue, PersistError> {
    let mismatch = |expected: &str| {
        PersistError::data_format(format!(
            "{} #{id}: field {} expects {expected}",
            entity.name, binding.field
        ))
    };
    let value = match value {
        None | Some(Value::Null) if binding.nullable => return Ok(SqlValue::Null),
        None | Some(Value::Null) => {
            return Err(PersistError::data_format(format!(
                "{} #{id}: missing required field {}",
                entity.name, binding.field
            )));
        }
        Some(value) => value,
    };
    match binding.column_type {
        ColumnType::Integer => value
            .as_i64()
            .map(SqlValue::Integer)
            .ok_or_else(|| mismatch("an integer")),
        ColumnType::Real => value
            .as_f64()
            .map(SqlValue::Real)
            .ok_or_else(|| mismatch("a number")),
        ColumnType::Text => value
            .as_str()
            .map(|s| SqlValue::Text(s.to_string()))
            .ok_or_else(|| mismatch("a string")),
        ColumnType::Boolean => value
            .as_bool()
            .map(|b| SqlValue::Integer(i64::from(b)))
            .ok_or_else(|| mismatch("a boolean")),
    }
}
