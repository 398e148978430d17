use persistlite::{
    PersistContext, PersistError, SnakeCaseNaming, SqliteDialect, VersionState,
    version::{check_version, read_data_version, write_data_version},
};
use rusqlite::Connection;


fn with_context<R>(conn: &Connection, f: impl FnOnce(&PersistContext<'_>) -> R) -> R {
    let registry = fixtures::ci_registry();
    let naming = SnakeCaseNaming::new();
    let ctx = PersistContext::new(conn, &registry, &SqliteDialect, &naming);
    f(&ctx)
}

#[test]
fn test_missing_version_table_means_uninitialized() {
    let conn = Connection::open_in_memory().unwrap();
    with_context(&conn, |ctx| {
        assert_eq!(read_data_version(ctx).unwrap(), None);
        assert_eq!(check_version(ctx, "1").unwrap(), VersionState::Uninitialized);
    });
}

#[test]
fn test_stored_version_is_compared_exactly() {
    let conn = Connection::open_in_memory().unwrap();
    with_context(&conn, |ctx| {
        ctx.create_tables().unwrap();
        write_data_version(ctx, "3").unwrap();
        assert_eq!(read_data_version(ctx).unwrap().as_deref(), Some("3"));
        assert_eq!(check_version(ctx, "3").unwrap(), VersionState::Current);
        assert_eq!(
            check_version(ctx, "3.0").unwrap(),
            VersionState::Mismatched {
                stored: "3".into(),
                expected: "3.0".into(),
            }
        );
    });
}

#[test]
fn test_writing_replaces_previous_version() {
    let conn = Connection::open_in_memory().unwrap();
    with_context(&conn, |ctx| {
        ctx.create_tables().unwrap();
        write_data_version(ctx, "1").unwrap();
        write_data_version(ctx, "2").unwrap();
        assert_eq!(read_data_version(ctx).unwrap().as_deref(), Some("2"));
    });
}

#[test]
fn test_empty_version_table_is_a_data_format_error() {
    let conn = Connection::open_in_memory().unwrap();
    with_context(&conn, |ctx| {
        ctx.create_tables().unwrap();
        match check_version(ctx, "1") {
            Err(PersistError::DataFormatError(message)) => {
                assert!(message.contains("no data version"), "{message}");
            }
            other => panic!("expected data format error, got {other:?}"),
        }
    });
}

#[test]
fn test_several_version_rows_are_a_data_format_error() {
    let conn = Connection::open_in_memory().unwrap();
    with_context(&conn, |ctx| {
        ctx.create_tables().unwrap();
        conn.execute_batch(
            "INSERT INTO data_version(id, version) VALUES (1, '1'), (2, '2')",
        )
        .unwrap();
        assert!(matches!(
            read_data_version(ctx),
            Err(PersistError::DataFormatError(_))
        ));
    });
}

#[test]
fn test_version_table_lookup_ignores_case() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE DATA_VERSION (id INTEGER PRIMARY KEY, version TEXT NOT NULL);\
         INSERT INTO DATA_VERSION VALUES (1, '5');",
    )
    .unwrap();
    with_context(&conn, |ctx| {
        assert_eq!(check_version(ctx, "5").unwrap(), VersionState::Current);
    });
}
