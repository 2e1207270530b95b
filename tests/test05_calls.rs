#![cfg(feature = "sqlite")]

mod common;

use async_sql::prelude::*;
use async_sql::sqlite::build_result_set;
use chrono::{Duration, Local};
use common::unique_db_path;
use rusqlite::types::Value;

fn connector(prefix: &str) -> SqliteConnector {
    SqliteConnector::builder(unique_db_path(prefix))
        .routine("new_customer", |conn, args| {
            let updated = conn.execute(
                "INSERT INTO customers (first, last) VALUES (?1, ?2)",
                rusqlite::params_from_iter(args.iter()),
            )?;
            Ok(RoutineOutput {
                updated: updated as u64,
                ..RoutineOutput::default()
            })
        })
        .routine("customer_lastname", |conn, args| {
            let last = conn
                .query_row(
                    "SELECT last FROM customers WHERE first = ?1",
                    [&args[0]],
                    |row| row.get::<_, Value>(0),
                )
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(Value::Null),
                    other => Err(other),
                })?;
            Ok(RoutineOutput {
                outputs: vec![last],
                ..RoutineOutput::default()
            })
        })
        .routine("one_hour_ago", |conn, _args| {
            let mut stmt =
                conn.prepare("SELECT datetime('now', 'localtime', '-1 hour') AS ts")?;
            Ok(RoutineOutput {
                result_set: Some(build_result_set(&mut stmt, &[])?),
                ..RoutineOutput::default()
            })
        })
        .routine("double_it", |_conn, args| match &args[0] {
            Value::Integer(i) => Ok(RoutineOutput {
                outputs: vec![Value::Integer(i * 2)],
                ..RoutineOutput::default()
            }),
            _ => Err(SqlClientError::backend("double_it expects an integer")),
        })
        .routine("bad_output", |_conn, _args| {
            Ok(RoutineOutput {
                outputs: vec![Value::Text("not a number".into())],
                ..RoutineOutput::default()
            })
        })
        .build()
}

async fn with_customers(prefix: &str) -> Result<Connection, SqlClientError> {
    let conn = connector(prefix).connect().await?;
    conn.execute("CREATE TABLE customers (first VARCHAR(50), last VARCHAR(50))")
        .await?;
    Ok(conn)
}

#[tokio::test]
async fn procedure_with_in_params() -> Result<(), Box<dyn std::error::Error>> {
    let conn = with_customers("call_in").await?;

    let outcome = conn
        .call_with_params(
            "{ call new_customer(?, ?) }",
            params!["John", "Doe"],
            Vec::new(),
        )
        .await?;
    assert_eq!(outcome.updated, 1);
    assert!(outcome.outputs.is_empty());
    assert!(outcome.result_set.is_none());

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn procedure_with_out_param() -> Result<(), Box<dyn std::error::Error>> {
    let conn = with_customers("call_out").await?;
    conn.call_with_params("{ call new_customer(?, ?) }", params!["John", "Doe"], Vec::new())
        .await?;

    let outcome = conn
        .call_with_params(
            "{ call customer_lastname(?, ?) }",
            params!["John"],
            vec![None, Some("VARCHAR".parse()?)],
        )
        .await?;
    assert_eq!(outcome.outputs, vec![SqlValue::Text("Doe".into())]);

    let missing = conn
        .call_spec(
            CallSpec::new("{ call customer_lastname(?, ?) }")
                .input("Nobody")
                .output(SqlType::Varchar),
        )
        .await?;
    assert_eq!(missing.outputs, vec![SqlValue::Null]);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn in_out_param_is_overwritten() -> Result<(), Box<dyn std::error::Error>> {
    let conn = with_customers("call_inout").await?;
    let outcome = conn
        .call_spec(CallSpec::new("{ call double_it(?) }").in_out(21, SqlType::Integer))
        .await?;
    assert_eq!(outcome.outputs, vec![SqlValue::Int(42)]);

    // the same routine through positional lists
    let listed = conn
        .call_with_params("{ call double_it(?) }", params![5], vec![Some(SqlType::Integer)])
        .await?;
    assert_eq!(listed.outputs, vec![SqlValue::Int(10)]);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn routine_returning_a_result_set() -> Result<(), Box<dyn std::error::Error>> {
    let conn = with_customers("call_rs").await?;
    let outcome = conn.call("{ call one_hour_ago() }").await?;
    let rs = outcome.result_set.ok_or("expected a result set")?;
    let ts = rs.row(0)?.get_timestamp("ts")?.ok_or("expected a timestamp")?;

    let expected = Local::now().naive_local() - Duration::hours(1);
    assert!((expected - ts).num_seconds().abs() < 60);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn unregistered_name_is_a_scalar_function() -> Result<(), Box<dyn std::error::Error>> {
    let conn = with_customers("call_scalar").await?;
    let outcome = conn
        .call_with_params("{ call upper(?) }", params!["fox"], Vec::new())
        .await?;
    let rs = outcome.result_set.ok_or("expected a result set")?;
    assert_eq!(rs.results(), &[vec![SqlValue::Text("FOX".into())]]);

    assert!(matches!(
        conn.call_with_params("{ call upper(?) }", Vec::new(), vec![Some(SqlType::Varchar)])
            .await,
        Err(SqlClientError::BackendError { .. })
    ));

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn call_errors() -> Result<(), Box<dyn std::error::Error>> {
    let conn = with_customers("call_errors").await?;

    assert!(matches!(
        conn.call_with_params("{ call new_customer(?, ?) }", params!["John"], Vec::new())
            .await,
        Err(SqlClientError::ParameterMismatch {
            expected: 2,
            actual: 1
        })
    ));
    assert!(matches!(
        conn.call_spec(CallSpec::new("{ call bad_output(?) }").output(SqlType::Integer))
            .await,
        Err(SqlClientError::DecodeError(_))
    ));
    assert!(matches!(
        conn.call_spec(CallSpec::new("{ call double_it(?) }").in_out("x", SqlType::Integer))
            .await,
        Err(SqlClientError::BackendError { .. })
    ));
    assert!(matches!(
        "CURSOR".parse::<SqlType>(),
        Err(SqlClientError::UnsupportedType(_))
    ));

    conn.close().await?;
    Ok(())
}
