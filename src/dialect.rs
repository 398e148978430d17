use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::model::{ColumnType, PRIMARY_KEY};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// A table with its physical columns, primary key excluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<PhysicalColumn>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub name: String,
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub nullable: bool,
}

impl ForeignKeySpec {
    pub fn is_self_reference(&self) -> bool {
        self.table == self.referenced_table
    }
}

pub trait Dialect: Send + Sync {
    fn kind(&self) -> DialectKind;

    /// Whether the backend creates an index for every foreign-key column.
    fn auto_indexes_foreign_keys(&self) -> bool;

    /// Whether an error message reports a missing table, index or constraint.
    fn is_missing_object(&self, message: &str) -> bool;

    fn quote(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn column_type(&self, column_type: ColumnType) -> &'static str;

    fn primary_key_type(&self) -> &'static str;

    fn create_table(&self, table: &TableSpec) -> String {
        let mut parts = vec![format!(
            "{} {} NOT NULL",
            self.quote(PRIMARY_KEY),
            self.primary_key_type()
        )];
        for column in &table.columns {
            let null = if column.nullable { "" } else { " NOT NULL" };
            parts.push(format!(
                "{} {}{null}",
                self.quote(&column.name),
                self.column_type(column.column_type)
            ));
        }
        parts.push(format!("PRIMARY KEY ({})", self.quote(PRIMARY_KEY)));
        format!(
            "CREATE TABLE {} ({})",
            self.quote(&table.name),
            parts.join(", ")
        )
    }

    fn create_index(&self, index: &IndexSpec) -> String {
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote(c)).collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote(&index.name),
            self.quote(&index.table),
            columns.join(", ")
        )
    }

    fn add_foreign_key(&self, fk: &ForeignKeySpec) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&fk.table),
            self.quote(&fk.name),
            self.quote(&fk.column),
            self.quote(&fk.referenced_table),
            self.quote(PRIMARY_KEY)
        )
    }

    fn drop_foreign_key(&self, fk: &ForeignKeySpec) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote(&fk.table),
            self.quote(&fk.name)
        )
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote(table))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
}

impl DialectKind {
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            DialectKind::Sqlite => Box::new(SqliteDialect),
            DialectKind::Postgres => Box::new(PostgresDialect),
            DialectKind::Mysql => Box::new(MysqlDialect),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::Sqlite => "sqlite",
            DialectKind::Postgres => "postgres",
            DialectKind::Mysql => "mysql",
        })
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DialectKind::Sqlite),
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            other => Err(format!("unsupported dialect {other}")),
        }
    }
}

/// SQLite has no `ALTER TABLE .. ADD CONSTRAINT`. A foreign key is enforced
/// with triggers on the child and parent tables, and the existing child rows
/// are validated by a no-op update that fires the child trigger.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    fn violation(fk: &ForeignKeySpec) -> String {
        format!("SELECT RAISE(ABORT, 'foreign key violation: {}')", fk.name)
    }

    fn orphan_check(&self, fk: &ForeignKeySpec, row: &str) -> String {
        let column = self.quote(&fk.column);
        let pk = self.quote(PRIMARY_KEY);
        // A row may point at itself; it does not exist yet in BEFORE INSERT.
        let own_row = if fk.is_self_reference() {
            format!(" AND {row}.{column} IS NOT {row}.{pk}")
        } else {
            String::new()
        };
        format!(
            "{row}.{column} IS NOT NULL{own_row} AND NOT EXISTS (SELECT 1 FROM {} WHERE {pk} = {row}.{column})",
            self.quote(&fk.referenced_table),
        )
    }

    /// Triggers fire per row: a nullable self reference is cleared on delete
    /// so one statement can remove a parent together with its children.
    fn delete_trigger(&self, fk: &ForeignKeySpec, name: &str) -> String {
        let table = self.quote(&fk.table);
        let column = self.quote(&fk.column);
        let parent = self.quote(&fk.referenced_table);
        let pk = self.quote(PRIMARY_KEY);
        if fk.is_self_reference() && fk.nullable {
            return format!(
                "CREATE TRIGGER {name} AFTER DELETE ON {parent} FOR EACH ROW \
                 BEGIN UPDATE {table} SET {column} = NULL WHERE {column} = OLD.{pk}; END;"
            );
        }
        let own_row = if fk.is_self_reference() {
            format!(" AND {pk} <> OLD.{pk}")
        } else {
            String::new()
        };
        format!(
            "CREATE TRIGGER {name} BEFORE DELETE ON {parent} FOR EACH ROW \
             WHEN EXISTS (SELECT 1 FROM {table} WHERE {column} = OLD.{pk}{own_row}) \
             BEGIN {}; END;",
            Self::violation(fk)
        )
    }

    fn trigger_names(fk: &ForeignKeySpec) -> [String; 3] {
        [
            format!("{}_insert", fk.name),
            format!("{}_update", fk.name),
            format!("{}_delete", fk.name),
        ]
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn auto_indexes_foreign_keys(&self) -> bool {
        false
    }

    fn is_missing_object(&self, message: &str) -> bool {
        let message = message.to_ascii_lowercase();
        message.contains("no such table")
            || message.contains("no such index")
            || message.contains("no such trigger")
    }

    fn column_type(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    fn primary_key_type(&self) -> &'static str {
        "INTEGER"
    }

    fn add_foreign_key(&self, fk: &ForeignKeySpec) -> String {
        let [insert, update, delete] = Self::trigger_names(fk);
        let table = self.quote(&fk.table);
        let column = self.quote(&fk.column);
        let raise = Self::violation(fk);
        let new_orphan = self.orphan_check(fk, "NEW");
        format!(
            "CREATE TRIGGER {insert} BEFORE INSERT ON {table} FOR EACH ROW WHEN {new_orphan} BEGIN {raise}; END;\n\
             CREATE TRIGGER {update} BEFORE UPDATE OF {column} ON {table} FOR EACH ROW WHEN {new_orphan} BEGIN {raise}; END;\n\
             {delete}\n\
             UPDATE {table} SET {column} = {column} WHERE {column} IS NOT NULL;",
            insert = self.quote(&insert),
            update = self.quote(&update),
            delete = self.delete_trigger(fk, &self.quote(&delete)),
        )
    }

    fn drop_foreign_key(&self, fk: &ForeignKeySpec) -> String {
        Self::trigger_names(fk)
            .iter()
            .map(|name| format!("DROP TRIGGER IF EXISTS {};", self.quote(name)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn auto_indexes_foreign_keys(&self) -> bool {
        false
    }

    fn is_missing_object(&self, message: &str) -> bool {
        message.contains("does not exist")
    }

    fn column_type(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "BIGINT",
            ColumnType::Real => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    fn primary_key_type(&self) -> &'static str {
        "BIGINT"
    }
}

/// InnoDB creates an index for every foreign key on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn auto_indexes_foreign_keys(&self) -> bool {
        true
    }

    fn is_missing_object(&self, message: &str) -> bool {
        message.contains("doesn't exist")
            || message.contains("Unknown table")
            || message.contains("check that column/key exists")
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{ident}`")
    }

    fn column_type(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "BIGINT",
            ColumnType::Real => "DOUBLE",
            ColumnType::Text => "LONGTEXT",
            ColumnType::Boolean => "BIT",
        }
    }

    fn primary_key_type(&self) -> &'static str {
        "BIGINT"
    }

    fn drop_foreign_key(&self, fk: &ForeignKeySpec) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote(&fk.table),
            self.quote(&fk.name)
        )
    }
}
