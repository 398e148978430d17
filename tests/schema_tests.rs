use persistlite::{
    ColumnType, EntityRegistry, EntityType, MysqlDialect, PostgresDialect, SchemaScript,
    SnakeCaseNaming, SqlCategory, SqliteDialect,
};


fn generate(dialect: &dyn persistlite::Dialect) -> SchemaScript {
    SchemaScript::generate(&fixtures::ci_registry(), dialect, &SnakeCaseNaming::new()).unwrap()
}

fn foreign_key_count(registry: &EntityRegistry) -> usize {
    registry.entities().iter().map(|e| e.foreign_keys.len()).sum()
}

#[test]
fn test_creation_never_contains_constraints() {
    for script in [
        generate(&SqliteDialect),
        generate(&PostgresDialect),
        generate(&MysqlDialect),
    ] {
        assert!(script.creation.iter().all(|s| matches!(
            s.category,
            SqlCategory::CreateTable | SqlCategory::CreateIndex
        )));
        assert!(
            script
                .constraints
                .iter()
                .all(|s| s.category == SqlCategory::AddForeignKey)
        );
    }
}

#[test]
fn test_one_constraint_per_foreign_key_field() {
    let registry = fixtures::ci_registry();
    let script = generate(&PostgresDialect);
    assert_eq!(script.constraints.len(), foreign_key_count(&registry));
    assert_eq!(script.drop_constraints.len(), foreign_key_count(&registry));
    assert!(script.constraints.iter().any(|s| s.sql
        == "ALTER TABLE \"build\" ADD CONSTRAINT \"fk_build_project_id\" \
            FOREIGN KEY (\"project_id\") REFERENCES \"project\" (\"id\")"));
}

#[test]
fn test_tables_are_created_in_registration_order() {
    let script = generate(&SqliteDialect);
    let tables: Vec<&str> = script
        .statements(SqlCategory::CreateTable)
        .into_iter()
        .map(|s| s.table.as_str())
        .collect();
    assert_eq!(
        tables,
        ["data_version", "account", "project", "build", "build_step"]
    );
    assert_eq!(
        script.creation[1].sql,
        "CREATE TABLE \"account\" (\"id\" INTEGER NOT NULL, \"name\" TEXT NOT NULL, \
         \"email\" TEXT, \"admin\" INTEGER NOT NULL, PRIMARY KEY (\"id\"))"
    );
}

#[test]
fn test_foreign_key_columns_are_indexed_unless_backend_does_it() {
    let sqlite = generate(&SqliteDialect);
    let sqlite_indexes: Vec<&str> = sqlite
        .statements(SqlCategory::CreateIndex)
        .into_iter()
        .map(|s| s.sql.as_str())
        .collect();
    assert!(
        sqlite_indexes
            .iter()
            .any(|sql| sql.contains("\"idx_build_project_id\""))
    );

    let mysql = generate(&MysqlDialect);
    let mysql_indexes: Vec<&str> = mysql
        .statements(SqlCategory::CreateIndex)
        .into_iter()
        .map(|s| s.sql.as_str())
        .collect();
    assert!(!mysql_indexes.iter().any(|sql| sql.contains("idx_")));
    // Explicit unique indexes survive, including ones over key columns.
    assert!(
        mysql_indexes
            .iter()
            .any(|sql| sql.contains("`uk_build_project_id_number`"))
    );
    assert!(
        mysql_indexes
            .iter()
            .any(|sql| sql.contains("`uk_account_email`"))
    );
}

#[test]
fn test_explicit_index_matching_foreign_key_index_is_emitted_once() {
    let registry = EntityRegistry::from_entities([
        EntityType::new("Account"),
        EntityType::new("Build")
            .foreign_key("account", "Account")
            .index(["account"], false),
    ])
    .unwrap();
    let script = SchemaScript::generate(&registry, &SqliteDialect, &SnakeCaseNaming::new()).unwrap();
    let indexes = script.statements(SqlCategory::CreateIndex);
    assert_eq!(indexes.len(), 1);
    assert_eq!(
        indexes[0].sql,
        "CREATE INDEX \"idx_build_account_id\" ON \"build\" (\"account_id\")"
    );
}

#[test]
fn test_drop_removes_constraints_then_dependents_first() {
    let script = generate(&PostgresDialect);
    let constraint_count = script.drop_constraints.len();
    assert!(
        script.drop[..constraint_count]
            .iter()
            .all(|s| s.category == SqlCategory::DropForeignKey)
    );
    let tables: Vec<&str> = script.drop[constraint_count..]
        .iter()
        .map(|s| s.table.as_str())
        .collect();
    assert_eq!(
        tables,
        ["data_version", "build_step", "build", "project", "account"]
    );
}

#[test]
fn test_sqlite_constraints_are_trigger_scripts() {
    let script = generate(&SqliteDialect);
    let build_project = script
        .constraints
        .iter()
        .find(|s| s.sql.contains("fk_build_project_id_insert"))
        .expect("constraint for build.project");
    assert_eq!(build_project.table, "build");
    assert!(build_project.sql.contains("RAISE(ABORT"));
    assert!(
        script
            .drop_constraints
            .iter()
            .all(|s| s.sql.starts_with("DROP TRIGGER IF EXISTS"))
    );
}

#[test]
fn test_mysql_drops_foreign_keys_by_name() {
    let script = generate(&MysqlDialect);
    assert!(
        script
            .drop_constraints
            .iter()
            .any(|s| s.sql == "ALTER TABLE `project` DROP FOREIGN KEY `fk_project_owner_id`")
    );
}

#[test]
fn test_render_terminates_every_statement() {
    let registry =
        EntityRegistry::from_entities([EntityType::new("Agent").column("host", ColumnType::Text)])
            .unwrap();
    let script = SchemaScript::generate(&registry, &PostgresDialect, &SnakeCaseNaming::new()).unwrap();
    let rendered = script.render();
    assert_eq!(rendered.lines().count(), 2);
    assert!(rendered.lines().all(|line| line.ends_with(';')));
}

#[test]
fn test_table_prefix_applies_to_every_statement() {
    let script = SchemaScript::generate(
        &fixtures::ci_registry(),
        &PostgresDialect,
        &SnakeCaseNaming::with_prefix("ci_"),
    )
    .unwrap();
    assert!(
        script
            .creation
            .iter()
            .chain(&script.drop)
            .all(|s| s.table.starts_with("ci_"))
    );
}

#[test]
fn test_sqlite_nullable_self_reference_clears_children_on_delete() {
    let script = generate(&SqliteDialect);
    let parent = script
        .constraints
        .iter()
        .find(|s| s.sql.contains("fk_build_step_parent_id_delete"))
        .expect("constraint for build_step.parent");
    assert!(parent.sql.contains("AFTER DELETE ON \"build_step\""));
    assert!(parent.sql.contains("SET \"parent_id\" = NULL"));
    assert!(parent.sql.contains("NEW.\"parent_id\" IS NOT NEW.\"id\""));

    let build = script
        .constraints
        .iter()
        .find(|s| s.sql.contains("fk_build_step_build_id_delete"))
        .expect("constraint for build_step.build");
    assert!(build.sql.contains("BEFORE DELETE ON \"build\""));
}
