#![cfg(feature = "sqlite")]

mod common;

use async_sql::prelude::*;
use chrono::NaiveDate;
use common::{connector, people};
use serde_json::json;

#[tokio::test]
async fn query_people() -> Result<(), Box<dyn std::error::Error>> {
    let conn = people(&connector("people_all")).await?;

    let rs = conn
        .query("SELECT ID, FNAME, LNAME, SHOE_SIZE from PEOPLE")
        .await?;
    assert_eq!(rs.column_names(), &["ID", "FNAME", "LNAME", "SHOE_SIZE"]);
    assert_eq!(rs.len(), 4);
    for row in rs.rows() {
        assert_eq!(row.len(), 4);
        assert!(row.get_i64("ID")?.is_some());
    }
    let last = rs.row(3)?;
    assert_eq!(last.get_str("FNAME")?, Some("Bill"));
    assert_eq!(last.get(3)?, &SqlValue::Int(11));
    assert!(matches!(
        rs.row(4),
        Err(SqlClientError::IndexOutOfRange { index: 4, len: 4 })
    ));
    assert!(matches!(
        last.get_by_name("MIDDLE"),
        Err(SqlClientError::UnknownColumn(_))
    ));

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn query_with_params_filters() -> Result<(), Box<dyn std::error::Error>> {
    let conn = people(&connector("people_filter")).await?;

    let rs = conn
        .query_with_params(
            "SELECT ID, FNAME, LNAME, SHOE_SIZE from PEOPLE WHERE LNAME=? AND SHOE_SIZE > ? ORDER BY ID",
            params!["Fox", 9],
        )
        .await?;
    let names: Vec<_> = rs
        .rows()
        .map(|row| row.get_str("FNAME").map(|s| s.map(str::to_owned)))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, vec![Some("Abe".to_string()), Some("Ann".to_string())]);

    let empty = conn
        .query_with_params("SELECT FNAME FROM PEOPLE WHERE LNAME=?", params!["Nobody"])
        .await?;
    assert!(empty.is_empty());
    assert_eq!(empty.column_names(), &["FNAME"]);

    // placeholder inside a literal is not a parameter
    let literal = conn
        .query_with_params("SELECT '?' AS Q, ? AS P", params![1])
        .await?;
    assert_eq!(
        literal.to_json_rows(),
        vec![json!({"Q": "?", "P": 1})]
    );

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn update_reports_counts_and_keys() -> Result<(), Box<dyn std::error::Error>> {
    let conn = people(&connector("people_update")).await?;

    let inserted = conn
        .update("INSERT INTO PEOPLE VALUES (null, 'john', 'smith', 9)")
        .await?;
    assert_eq!(inserted.updated, 1);
    assert_eq!(inserted.keys, vec![SqlValue::Int(5)]);

    let updated = conn
        .update_with_params("UPDATE PEOPLE SET SHOE_SIZE = 10 WHERE LNAME=?", params!["Fox"])
        .await?;
    assert_eq!(updated.updated, 3);
    assert!(updated.keys.is_empty());

    let none = conn
        .update_with_params("DELETE FROM PEOPLE WHERE LNAME=?", params!["Nobody"])
        .await?;
    assert_eq!(none.updated, 0);

    let rs = conn
        .query("SELECT DISTINCT SHOE_SIZE FROM PEOPLE WHERE LNAME='Fox'")
        .await?;
    assert_eq!(rs.results(), &[vec![SqlValue::Int(10)]]);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn values_decode_by_declared_type() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("typed").connect().await?;
    conn.execute(
        "CREATE TABLE typed (
            flag BOOLEAN,
            amount DOUBLE,
            payload BLOB,
            created TIMESTAMP,
            note TEXT
        )",
    )
    .await?;
    let created = NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|d| d.and_hms_opt(9, 15, 30))
        .ok_or("bad date")?;
    conn.update_with_params(
        "INSERT INTO typed VALUES (?, ?, ?, ?, ?)",
        params![true, 2.5, vec![0_u8, 1, 2], created, None::<String>],
    )
    .await?;

    let rs = conn.query("SELECT * FROM typed").await?;
    let row = rs.row(0)?;
    assert_eq!(row.get_bool("flag")?, Some(true));
    assert_eq!(row.get_f64("amount")?, Some(2.5));
    assert_eq!(row.get_bytes("payload")?, Some(&[0_u8, 1, 2][..]));
    assert_eq!(row.get_timestamp("created")?, Some(created));
    assert_eq!(row.get_str("note")?, None);
    assert_eq!(row.get_by_name("note")?, &SqlValue::Null);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn json_params_are_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let conn = people(&connector("json_params")).await?;
    let params = SqlValue::list_from_json(&json!(["Fox", 9]))?;
    let rs = conn
        .query_with_params(
            "SELECT FNAME FROM PEOPLE WHERE LNAME=? AND SHOE_SIZE > ? ORDER BY ID",
            params,
        )
        .await?;
    assert_eq!(rs.len(), 2);

    assert!(matches!(
        SqlValue::list_from_json(&json!([{"nested": true}])),
        Err(SqlClientError::UnsupportedType(_))
    ));
    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn keys_only_for_generated_rowids() -> Result<(), Box<dyn std::error::Error>> {
    let conn = connector("keys_generated").connect().await?;
    conn.execute(
        "CREATE TABLE a (id INTEGER PRIMARY KEY, v TEXT);
         CREATE TABLE w (k TEXT PRIMARY KEY, v TEXT) WITHOUT ROWID;
         CREATE TABLE u (id INTEGER PRIMARY KEY, n INT);",
    )
    .await?;

    let first = conn.update("INSERT INTO a (id, v) VALUES (77, 'y')").await?;
    assert_eq!(first.keys, vec![SqlValue::Int(77)]);

    let without_rowid = conn.update("INSERT INTO w (k, v) VALUES ('x', 'y')").await?;
    assert_eq!(without_rowid.updated, 1);
    assert!(without_rowid.keys.is_empty());

    let seeded = conn.update("INSERT INTO u (id, n) VALUES (5, 1)").await?;
    assert_eq!(seeded.keys, vec![SqlValue::Int(5)]);
    let next = conn.update("INSERT INTO a (v) VALUES ('z')").await?;
    assert_eq!(next.keys, vec![SqlValue::Int(78)]);

    let upsert = conn
        .update("INSERT INTO u (id, n) VALUES (5, 2) ON CONFLICT(id) DO UPDATE SET n = n + 1")
        .await?;
    assert_eq!(upsert.updated, 1);
    assert!(upsert.keys.is_empty());

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn join_needs_distinct_column_names() -> Result<(), Box<dyn std::error::Error>> {
    let conn = people(&connector("people_join")).await?;

    match conn
        .query("SELECT a.ID, b.ID FROM PEOPLE a JOIN PEOPLE b ON a.ID = b.ID")
        .await
    {
        Err(SqlClientError::DecodeError(msg)) => assert!(msg.contains("AS"), "{msg}"),
        other => panic!("expected DecodeError, got {other:?}"),
    }

    let rs = conn
        .query("SELECT a.ID, b.ID AS OTHER_ID FROM PEOPLE a JOIN PEOPLE b ON a.ID = b.ID")
        .await?;
    assert_eq!(rs.column_names(), &["ID", "OTHER_ID"]);
    assert_eq!(rs.len(), 4);

    conn.close().await?;
    Ok(())
}
