use persistlite::{
    ExecutionPolicy, PersistError, SqlCategory, SqlExecutor, SqlStatement, SqliteDialect,
};
use rusqlite::Connection;

fn statement(category: SqlCategory, table: &str, sql: &str) -> SqlStatement {
    SqlStatement::new(category, table, sql)
}

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn test_best_effort_continues_past_missing_objects() {
    let conn = Connection::open_in_memory().unwrap();
    let executor = SqlExecutor::new(&conn, &SqliteDialect);
    let statements = [
        statement(SqlCategory::CreateTable, "agent", "CREATE TABLE agent (id INTEGER)"),
        statement(SqlCategory::DropTable, "ghost", "DROP TABLE ghost"),
        statement(SqlCategory::CreateTable, "queue", "CREATE TABLE queue (id INTEGER)"),
    ];
    let report = executor
        .execute(&statements, ExecutionPolicy::BestEffort)
        .unwrap();
    assert_eq!(report.executed, 2);
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].statement, "DROP TABLE ghost");
    assert!(report.failures[0].missing_object);
    assert!(table_exists(&conn, "agent"));
    assert!(table_exists(&conn, "queue"));
}

#[test]
fn test_best_effort_flags_other_failures() {
    let conn = Connection::open_in_memory().unwrap();
    let executor = SqlExecutor::new(&conn, &SqliteDialect);
    let statements = [
        statement(SqlCategory::CreateTable, "agent", "CREATE TABLE agent (id INTEGER)"),
        statement(SqlCategory::CreateTable, "agent", "CREATE TABLE agent (id INTEGER)"),
    ];
    let report = executor
        .execute(&statements, ExecutionPolicy::BestEffort)
        .unwrap();
    assert_eq!(report.executed, 1);
    assert!(!report.failures[0].missing_object);
    assert!(report.failures[0].message.contains("already exists"));
}

#[test]
fn test_fail_fast_stops_and_rolls_back() {
    let conn = Connection::open_in_memory().unwrap();
    let executor = SqlExecutor::new(&conn, &SqliteDialect);
    let statements = [
        statement(SqlCategory::CreateTable, "agent", "CREATE TABLE agent (id INTEGER)"),
        statement(SqlCategory::DropTable, "ghost", "DROP TABLE ghost"),
        statement(SqlCategory::CreateTable, "queue", "CREATE TABLE queue (id INTEGER)"),
    ];
    let err = executor
        .execute(&statements, ExecutionPolicy::FailFast)
        .unwrap_err();
    match err {
        PersistError::SqlExecutionError { statement, message } => {
            assert_eq!(statement, "DROP TABLE ghost");
            assert!(message.contains("no such table"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!table_exists(&conn, "agent"));
    assert!(!table_exists(&conn, "queue"));
}

#[test]
fn test_fail_fast_commits_on_success() {
    let conn = Connection::open_in_memory().unwrap();
    let executor = SqlExecutor::new(&conn, &SqliteDialect);
    let statements = [
        statement(SqlCategory::CreateTable, "agent", "CREATE TABLE agent (id INTEGER)"),
        statement(
            SqlCategory::CreateIndex,
            "agent",
            "CREATE INDEX idx_agent_id ON agent (id)",
        ),
    ];
    let report = executor
        .execute(&statements, ExecutionPolicy::FailFast)
        .unwrap();
    assert_eq!(report.executed, 2);
    assert!(report.failures.is_empty());
    assert!(table_exists(&conn, "agent"));
    // The connection is back in autocommit mode.
    assert!(conn.is_autocommit());
}

#[test]
fn test_empty_statement_list_is_a_no_op() {
    let conn = Connection::open_in_memory().unwrap();
    let executor = SqlExecutor::new(&conn, &SqliteDialect);
    let report = executor
        .execute(&Vec::<SqlStatement>::new(), ExecutionPolicy::FailFast)
        .unwrap();
    assert_eq!(report.attempted(), 0);
}
