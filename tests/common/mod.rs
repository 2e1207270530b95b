#![allow(dead_code)]

use async_sql::prelude::*;
use tempfile::tempdir;

pub const PEOPLE_DDL: &str = "CREATE TABLE PEOPLE (
    ID INTEGER PRIMARY KEY,
    FNAME VARCHAR(255),
    LNAME VARCHAR(255),
    SHOE_SIZE INT
);";

pub const PEOPLE_ROWS: &str = "
INSERT INTO PEOPLE (FNAME, LNAME, SHOE_SIZE) VALUES ('Mary', 'Fox', 8);
INSERT INTO PEOPLE (FNAME, LNAME, SHOE_SIZE) VALUES ('Abe', 'Fox', 10);
INSERT INTO PEOPLE (FNAME, LNAME, SHOE_SIZE) VALUES ('Ann', 'Fox', 12);
INSERT INTO PEOPLE (FNAME, LNAME, SHOE_SIZE) VALUES ('Bill', 'Lynx', 11);
";

pub fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

pub fn connector(prefix: &str) -> SqliteConnector {
    SqliteConnector::builder(unique_db_path(prefix)).build()
}

/// Open a connection with the PEOPLE table created and seeded.
pub async fn people(connector: &SqliteConnector) -> Result<Connection, SqlClientError> {
    let conn = connector.connect().await?;
    conn.execute(PEOPLE_DDL).await?;
    conn.execute(PEOPLE_ROWS).await?;
    Ok(conn)
}
