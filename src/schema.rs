//! Generated DDL, classified by statement category.
//!
//! [`SchemaScript::generate`] turns the registry into four statement sets and
//! never touches a connection. Foreign-key constraints are kept apart from
//! table creation so that bulk loads can run without them and have them
//! applied afterwards.

use std::fmt;

use ahash::AHashSet;
use serde::Serialize;

use crate::{
    dialect::{Dialect, ForeignKeySpec, IndexSpec, PhysicalColumn, TableSpec},
    errors::PersistError,
    model::{ColumnType, EntityType, PRIMARY_KEY},
    naming::NamingStrategy,
    ordering::dependency_order,
    registry::EntityRegistry,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlCategory {
    CreateTable,
    CreateIndex,
    AddForeignKey,
    DropForeignKey,
    DropTable,
}

impl fmt::Display for SqlCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlCategory::CreateTable => "create-table",
            SqlCategory::CreateIndex => "create-index",
            SqlCategory::AddForeignKey => "add-foreign-key",
            SqlCategory::DropForeignKey => "drop-foreign-key",
            SqlCategory::DropTable => "drop-table",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SqlStatement {
    pub category: SqlCategory,
    pub table: String,
    pub sql: String,
}

impl SqlStatement {
    pub fn new<T: Into<String>, S: Into<String>>(category: SqlCategory, table: T, sql: S) -> Self {
        Self {
            category,
            table: table.into(),
            sql: sql.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchemaScript {
    /// Tables and indexes, without foreign-key constraints.
    pub creation: Vec<SqlStatement>,
    /// One statement per declared foreign-key field.
    pub constraints: Vec<SqlStatement>,
    pub drop_constraints: Vec<SqlStatement>,
    /// Constraint drops followed by table drops, dependents first.
    pub drop: Vec<SqlStatement>,
}

impl SchemaScript {
    pub fn generate(
        registry: &EntityRegistry,
        dialect: &dyn Dialect,
        naming: &dyn NamingStrategy,
    ) -> Result<Self, PersistError> {
        let order = dependency_order(registry)?;
        let mut script = SchemaScript::default();

        for entity in registry.entities() {
            let table = table_spec(entity, naming);
            script.creation.push(SqlStatement::new(
                SqlCategory::CreateTable,
                &table.name,
                dialect.create_table(&table),
            ));
        }

        for entity in registry.entities() {
            for index in index_specs(entity, naming) {
                if dialect.auto_indexes_foreign_keys()
                    && is_foreign_key_index(entity, &index, naming)
                {
                    continue;
                }
                script.creation.push(SqlStatement::new(
                    SqlCategory::CreateIndex,
                    &index.table,
                    dialect.create_index(&index),
                ));
            }
        }

        for entity in registry.entities() {
            for fk in foreign_key_specs(entity, registry, naming)? {
                script.constraints.push(SqlStatement::new(
                    SqlCategory::AddForeignKey,
                    &fk.table,
                    dialect.add_foreign_key(&fk),
                ));
                script.drop_constraints.push(SqlStatement::new(
                    SqlCategory::DropForeignKey,
                    &fk.table,
                    dialect.drop_foreign_key(&fk),
                ));
            }
        }

        script.drop.extend(script.drop_constraints.iter().cloned());
        for entity in order {
            let table = naming.table_name(&entity.name);
            script.drop.push(SqlStatement::new(
                SqlCategory::DropTable,
                &table,
                dialect.drop_table(&table),
            ));
        }
        Ok(script)
    }

    pub fn statements(&self, category: SqlCategory) -> Vec<&SqlStatement> {
        self.creation
            .iter()
            .chain(&self.constraints)
            .chain(&self.drop)
            .filter(|s| s.category == category)
            .collect()
    }

    /// Creation script including constraints, one statement per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for statement in self.creation.iter().chain(&self.constraints) {
            out.push_str(&statement.sql);
            if !statement.sql.ends_with(';') {
                out.push(';');
            }
            out.push('\n');
        }
        out
    }
}

pub fn table_spec(entity: &EntityType, naming: &dyn NamingStrategy) -> TableSpec {
    let mut columns: Vec<PhysicalColumn> = entity
        .columns
        .iter()
        .map(|c| PhysicalColumn {
            name: naming.column_name(&c.name),
            column_type: c.column_type,
            nullable: c.nullable,
        })
        .collect();
    columns.extend(entity.foreign_keys.iter().map(|fk| PhysicalColumn {
        name: naming.foreign_key_column(&fk.field),
        column_type: ColumnType::Integer,
        nullable: fk.nullable,
    }));
    TableSpec {
        name: naming.table_name(&entity.name),
        columns,
    }
}

/// Physical column for a logical field name: foreign-key fields map to their
/// key column.
pub fn physical_column(entity: &EntityType, field: &str, naming: &dyn NamingStrategy) -> String {
    if field == PRIMARY_KEY {
        return PRIMARY_KEY.to_string();
    }
    match entity.find_foreign_key(field) {
        Some(fk) => naming.foreign_key_column(&fk.field),
        None => naming.column_name(field),
    }
}

fn index_specs(entity: &EntityType, naming: &dyn NamingStrategy) -> Vec<IndexSpec> {
    let table = naming.table_name(&entity.name);
    let mut wanted: Vec<(Vec<String>, bool)> = entity
        .foreign_keys
        .iter()
        .map(|fk| (vec![naming.foreign_key_column(&fk.field)], false))
        .collect();
    for index in &entity.indexes {
        let columns = index
            .columns
            .iter()
            .map(|field| physical_column(entity, field, naming))
            .collect();
        wanted.push((columns, index.unique));
    }

    let mut seen = AHashSet::new();
    let mut specs = Vec::with_capacity(wanted.len());
    for (columns, unique) in wanted {
        let prefix = if unique { "uk" } else { "idx" };
        let name = format!("{prefix}_{table}_{}", columns.join("_"));
        if seen.insert(name.clone()) {
            specs.push(IndexSpec {
                name,
                table: table.clone(),
                columns,
                unique,
            });
        }
    }
    specs
}

fn is_foreign_key_index(
    entity: &EntityType,
    index: &IndexSpec,
    naming: &dyn NamingStrategy,
) -> bool {
    !index.unique
        && index.columns.len() == 1
        && entity
            .foreign_keys
            .iter()
            .any(|fk| naming.foreign_key_column(&fk.field) == index.columns[0])
}

fn foreign_key_specs(
    entity: &EntityType,
    registry: &EntityRegistry,
    naming: &dyn NamingStrategy,
) -> Result<Vec<ForeignKeySpec>, PersistError> {
    let table = naming.table_name(&entity.name);
    entity
        .foreign_keys
        .iter()
        .map(|fk| {
            let target = registry.require(&fk.references)?;
            let column = naming.foreign_key_column(&fk.field);
            Ok(ForeignKeySpec {
                name: format!("fk_{table}_{column}"),
                table: table.clone(),
                column,
                referenced_table: naming.table_name(&target.name),
                nullable: fk.nullable,
            })
        })
        .collect()
}
