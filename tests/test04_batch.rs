#![cfg(feature = "sqlite")]

mod common;

use async_sql::prelude::*;
use common::connector;

const EMP_DDL: &str = "CREATE TABLE emp (id INTEGER PRIMARY KEY, name VARCHAR(50) UNIQUE NOT NULL)";

async fn names(conn: &Connection) -> Result<Vec<String>, SqlClientError> {
    let rs = conn.query("SELECT name FROM emp ORDER BY id").await?;
    rs.rows()
        .map(|row| -> Result<String, SqlClientError> {
            Ok(row.get_str("name")?.unwrap_or_default().to_string())
        })
        .collect()
}

#[tokio::test]
async fn batch_with_params_runs_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("batch_params").connect().await?;
    conn.execute(EMP_DDL).await?;

    let outcome = conn
        .batch_with_params(
            "INSERT INTO emp (name) VALUES (?)",
            vec![params!["joe"], params!["jane"]],
        )
        .await?;
    assert!(outcome.is_complete());
    assert_eq!(outcome.counts(), vec![1, 1]);
    assert_eq!(names(&conn).await?, vec!["joe", "jane"]);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn batch_of_statements() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("batch_plain").connect().await?;
    conn.execute(EMP_DDL).await?;

    let outcome = conn
        .batch(vec![
            "INSERT INTO emp (NAME) VALUES ('JOE')".into(),
            "INSERT INTO emp (NAME) VALUES ('JANE')".into(),
            "UPDATE emp SET name = lower(name)".into(),
        ])
        .await?;
    assert_eq!(outcome.counts(), vec![1, 1, 2]);
    assert_eq!(names(&conn).await?, vec!["joe", "jane"]);

    let empty = conn.batch(Vec::new()).await?;
    assert!(empty.is_empty() && empty.is_complete());

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn failing_entry_truncates_batch() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("batch_fail").connect().await?;
    conn.execute(EMP_DDL).await?;

    let outcome = conn
        .batch_with_params(
            "INSERT INTO emp (name) VALUES (?)",
            vec![params!["joe"], params!["joe"], params!["jane"]],
        )
        .await?;
    assert_eq!(outcome.len(), 1);
    let truncation = outcome.truncated.as_ref().ok_or("batch should stop")?;
    assert_eq!(truncation.index, 1);
    assert!(matches!(
        truncation.error,
        SqlClientError::BackendError { .. }
    ));
    // entries before the failure were applied; later ones never ran
    assert_eq!(names(&conn).await?, vec!["joe"]);
    assert!(outcome.into_result().is_err());

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn mismatched_parameter_set_runs_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("batch_mismatch").connect().await?;
    conn.execute(EMP_DDL).await?;

    assert!(matches!(
        conn.batch_with_params(
            "INSERT INTO emp (name) VALUES (?)",
            vec![params!["joe"], params!["jane", "extra"]],
        )
        .await,
        Err(SqlClientError::ParameterMismatch {
            expected: 1,
            actual: 2
        })
    ));
    assert!(names(&conn).await?.is_empty());

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn batch_inside_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("batch_tx").connect().await?;
    conn.execute(EMP_DDL).await?;

    conn.set_auto_commit(false).await?;
    let outcome = conn
        .batch_with_params(
            "INSERT INTO emp (name) VALUES (?)",
            vec![params!["joe"], params!["jane"]],
        )
        .await?;
    assert!(outcome.is_complete());
    conn.rollback().await?;
    assert!(names(&conn).await?.is_empty());

    conn.close().await?;
    Ok(())
}
