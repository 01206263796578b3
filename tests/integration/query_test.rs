//! Query execution integration tests.
//!
//! Tests SQL execution and projection of result sets into display text.

use std::sync::Arc;

use db_browser::config::{ConnectionConfig, ConnectionParams};
use db_browser::connection::ConnectionManager;
use db_browser::error::BrowserError;
use db_browser::status::RecordingReporter;
use pretty_assertions::assert_eq;

async fn sqlite_session() -> (ConnectionManager, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::new());
    let mut manager = ConnectionManager::new(reporter.clone());
    manager
        .connect(&ConnectionParams::sqlite_memory())
        .await
        .unwrap();
    (manager, reporter)
}

async fn seed_staff(manager: &ConnectionManager) {
    manager
        .execute(
            "CREATE TABLE staff (
                id SMALLINT, name VARCHAR(9), dept SMALLINT,
                manager BOOLEAN, years SMALLINT, comm REAL
            )",
        )
        .await
        .unwrap();
    manager
        .execute(
            "INSERT INTO staff VALUES
                (30, 'Marenghi', 38, 1, 5, NULL),
                (10, 'Sanders', 20, 1, 7, NULL),
                (20, 'Pernal', 20, 0, 8, 612.45)",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_execute_simple_select() {
    let (manager, _) = sqlite_session().await;

    let table = manager.execute("SELECT 1 AS X").await.unwrap();

    assert_eq!(table.column_names, vec!["X"]);
    assert_eq!(table.rows, vec![vec!["1"]]);
}

#[tokio::test]
async fn test_rows_keep_statement_order() {
    let (manager, _) = sqlite_session().await;
    seed_staff(&manager).await;

    let table = manager
        .execute("SELECT id, name FROM staff ORDER BY id")
        .await
        .unwrap();

    assert_eq!(
        table.rows,
        vec![
            vec!["10", "Sanders"],
            vec!["20", "Pernal"],
            vec!["30", "Marenghi"],
        ]
    );
}

#[tokio::test]
async fn test_boolean_and_null_projection() {
    let (manager, reporter) = sqlite_session().await;
    seed_staff(&manager).await;

    let table = manager
        .execute("SELECT name, manager, comm FROM staff ORDER BY id")
        .await
        .unwrap();

    assert_eq!(
        table.rows,
        vec![
            vec!["Sanders", "true", "NULL"],
            vec!["Pernal", "false", "612.45"],
            vec!["Marenghi", "true", "NULL"],
        ]
    );
    assert!(reporter.diagnostics().is_empty());
}

#[tokio::test]
async fn test_decimal_truncates_and_clob_is_sentinel() {
    let (manager, reporter) = sqlite_session().await;
    manager
        .execute(
            "CREATE TABLE emp_resume (
                empno CHAR(6), salary DECIMAL(9,2), bonus NUMERIC(9,2), resume CLOB(5K)
            )",
        )
        .await
        .unwrap();
    manager
        .execute(
            "INSERT INTO emp_resume VALUES
                ('000130', 38250.50, 12.75, 'Resume: Delores M. Quintana'),
                ('000140', 28420.00, NULL, NULL)",
        )
        .await
        .unwrap();

    let table = manager
        .execute("SELECT empno, salary, bonus, resume FROM emp_resume ORDER BY empno")
        .await
        .unwrap();

    assert_eq!(
        table.rows,
        vec![
            vec!["000130", "38250", "12", "CLOB"],
            vec!["000140", "28420", "NULL", "NULL"],
        ]
    );
    assert!(reporter.diagnostics().is_empty());
}

#[tokio::test]
async fn test_joined_tables_use_declared_types() {
    let (manager, _) = sqlite_session().await;
    seed_staff(&manager).await;
    manager
        .execute("CREATE TABLE pay (staff_id SMALLINT, salary DECIMAL(7,2))")
        .await
        .unwrap();
    manager
        .execute("INSERT INTO pay VALUES (10, 18357.50), (20, 18171.25)")
        .await
        .unwrap();

    let table = manager
        .execute("SELECT s.name, p.salary FROM staff s JOIN pay p ON p.staff_id = s.id ORDER BY s.id")
        .await
        .unwrap();

    assert_eq!(
        table.rows,
        vec![vec!["Sanders", "18357"], vec!["Pernal", "18171"]]
    );
}

#[tokio::test]
async fn test_two_result_sets_in_one_text_is_query_error() {
    let (manager, _) = sqlite_session().await;

    let result = manager.execute("SELECT 1 AS A; SELECT 'x' AS B, 'y' AS C").await;

    assert!(matches!(result, Err(BrowserError::Query(_))));
}

#[tokio::test]
async fn test_every_row_has_one_cell_per_column() {
    let (manager, _) = sqlite_session().await;
    seed_staff(&manager).await;

    let table = manager.execute("SELECT * FROM staff").await.unwrap();

    assert_eq!(table.column_count(), 6);
    assert_eq!(table.row_count(), 3);
    assert!(table.rows.iter().all(|row| row.len() == 6));
}

#[tokio::test]
async fn test_empty_result_has_header() {
    let (manager, _) = sqlite_session().await;
    seed_staff(&manager).await;

    let table = manager
        .execute("SELECT id, name FROM staff WHERE dept = 99")
        .await
        .unwrap();

    assert_eq!(table.column_names, vec!["id", "name"]);
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_malformed_sql_is_query_error() {
    let (manager, reporter) = sqlite_session().await;

    let result = manager.execute("SELEKT * FROM staff").await;

    assert!(matches!(result, Err(BrowserError::Query(_))));
    assert!(reporter
        .statuses()
        .contains(&"Error: Error executing the query.".to_string()));

    let table = manager.execute("SELECT 2 AS Y").await.unwrap();
    assert_eq!(table.rows, vec![vec!["2"]]);
}

#[tokio::test]
async fn test_list_tables() {
    let (manager, _) = sqlite_session().await;
    seed_staff(&manager).await;
    manager
        .execute("CREATE TABLE dept (deptno SMALLINT)")
        .await
        .unwrap();

    assert_eq!(manager.list_tables().await.unwrap(), vec!["dept", "staff"]);
}

#[tokio::test]
async fn test_postgres_typed_projection() {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let params = ConnectionConfig::from_connection_string(&url)
        .unwrap()
        .to_params()
        .unwrap();

    let mut manager = ConnectionManager::new(Arc::new(RecordingReporter::new()));
    manager.connect(&params).await.unwrap();

    let table = manager
        .execute(
            "SELECT 7::smallint AS s, -52750.99::numeric(9,2) AS salary, \
             1.5::real AS r, 'HAAS'::char(6) AS name, \
             TIMESTAMP '2012-08-23 10:15:30.5' AS ts, TIME '08:30:00' AS t",
        )
        .await
        .unwrap();

    assert_eq!(
        table.rows,
        vec![vec![
            "7",
            "-52750",
            "1.5",
            "HAAS  ",
            "2012-08-23 10:15:30.500",
            "08:30:00",
        ]]
    );

    manager.close().await;
}
