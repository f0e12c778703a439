//! Table-level sink operations
//!
//! Every operation takes `&mut SqliteConnection`, so it runs equally on the
//! sink's own connection or inside a transaction (`&mut *tx`).

use sqlx::sqlite::SqliteConnection;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use super::value::SqlValue;
use crate::error::{IngestError, Result};
use crate::schema::{quote_ident, ColumnDef, Record, TableSchema};

/// SQLite's default limit on bound parameters per statement
pub const MAX_BIND_PARAMETERS: usize = 32_766;

/// Upper bound on rows per multi-row `INSERT`
const MAX_ROWS_PER_STATEMENT: usize = 500;

/// A row from `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    /// 1-based position within the primary key, 0 if not part of it
    pub pk_position: i64,
}

/// A row from `PRAGMA foreign_key_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    pub from: String,
    pub table: String,
    pub to: Option<String>,
}

/// A row from `PRAGMA foreign_key_check`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: Option<i64>,
    pub parent: String,
}

pub async fn drop_table_if_exists(conn: &mut SqliteConnection, table: &str) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn create_table(conn: &mut SqliteConnection, schema: &TableSchema) -> Result<()> {
    let sql = schema.create_sql();
    debug!(table = %schema.name, sql = %sql, "Creating table");
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

pub async fn add_column(conn: &mut SqliteConnection, table: &str, column: &ColumnDef) -> Result<()> {
    debug!(table = %table, column = %column.name, "Adding column");
    sqlx::query(&format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        column.definition_sql()
    ))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

pub async fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<ColumnInfo>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ColumnInfo {
                name: row.try_get("name")?,
                declared_type: row.try_get("type")?,
                pk_position: row.try_get("pk")?,
            })
        })
        .collect()
}

pub async fn foreign_keys(conn: &mut SqliteConnection, table: &str) -> Result<Vec<ForeignKeyInfo>> {
    let rows = sqlx::query(&format!("PRAGMA foreign_key_list({})", quote_ident(table)))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ForeignKeyInfo {
                from: row.try_get("from")?,
                table: row.try_get("table")?,
                to: row.try_get("to")?,
            })
        })
        .collect()
}

pub async fn foreign_key_violations(conn: &mut SqliteConnection) -> Result<Vec<ForeignKeyViolation>> {
    let rows = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ForeignKeyViolation {
                table: row.try_get("table")?,
                rowid: row.try_get("rowid")?,
                parent: row.try_get("parent")?,
            })
        })
        .collect()
}

/// Insert records by column name, in multi-row batches
///
/// Keys a record does not carry are bound as NULL; keys outside `columns` are
/// ignored, so callers add new columns first.
pub async fn insert_records(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[String],
    records: &[Record],
) -> Result<u64> {
    if columns.is_empty() || records.is_empty() {
        return Ok(0);
    }

    let rows_per_chunk = (MAX_BIND_PARAMETERS / columns.len()).clamp(1, MAX_ROWS_PER_STATEMENT);
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut inserted = 0;
    for chunk in records.chunks(rows_per_chunk) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", quote_ident(table), column_list));

        query_builder.push_values(chunk, |mut b, record| {
            for column in columns {
                let value = record
                    .get(column)
                    .map(SqlValue::from_json)
                    .unwrap_or(SqlValue::Null);
                value.push_bind(&mut b);
            }
        });

        inserted += query_builder.build().execute(&mut *conn).await?.rows_affected();
    }

    debug!(table = %table, rows = inserted, "Inserted records");
    Ok(inserted)
}

/// Insert equally wide rows positionally, in multi-row batches
pub async fn insert_rows(conn: &mut SqliteConnection, table: &str, rows: Vec<Vec<SqlValue>>) -> Result<u64> {
    let width = match rows.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => return Ok(0),
    };
    let rows_per_chunk = (MAX_BIND_PARAMETERS / width).clamp(1, MAX_ROWS_PER_STATEMENT);

    let mut inserted = 0;
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {} ", quote_ident(table)));
        query_builder.push_values(rows.by_ref().take(rows_per_chunk), |mut b, row| {
            for value in row {
                value.push_bind(&mut b);
            }
        });
        inserted += query_builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

/// Insert one row positionally and return its rowid
pub async fn insert_row(conn: &mut SqliteConnection, table: &str, values: Vec<SqlValue>) -> Result<i64> {
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!("INSERT INTO {} VALUES ({})", quote_ident(table), placeholders);

    let mut query = sqlx::query(&sql);
    for value in values {
        query = value.bind(query);
    }
    Ok(query.execute(&mut *conn).await?.last_insert_rowid())
}

/// Insert one row into the named columns and return its rowid
pub async fn insert_named(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[&str],
    values: Vec<SqlValue>,
) -> Result<i64> {
    let column_list = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list,
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for value in values {
        query = value.bind(query);
    }
    Ok(query.execute(&mut *conn).await?.last_insert_rowid())
}

/// Insert `(key, value)` or, when the key exists, set only `value_column`
///
/// # Errors
/// [`IngestError::UnknownColumn`] when the table lacks either column.
pub async fn upsert_column(
    conn: &mut SqliteConnection,
    table: &str,
    key_column: &str,
    value_column: &str,
    key: SqlValue,
    value: SqlValue,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {table} ({key}, {col}) VALUES (?, ?) \
         ON CONFLICT ({key}) DO UPDATE SET {col} = excluded.{col}",
        table = quote_ident(table),
        key = quote_ident(key_column),
        col = quote_ident(value_column),
    );

    let query = value.bind(key.bind(sqlx::query(&sql)));
    match query.execute(&mut *conn).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(err)) if err.message().contains("no column named") => {
            let column = if err.message().contains(key_column) { key_column } else { value_column };
            Err(IngestError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        },
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::Affinity;
    use crate::storage::SqliteSink;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn schema(name: &str, columns: &[&str]) -> TableSchema {
        TableSchema {
            name: name.to_string(),
            columns: columns.iter().map(|c| ColumnDef::text(*c)).collect(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_insert_and_introspect() {
        let mut sink = SqliteSink::open_in_memory().await.unwrap();
        let conn = sink.connection();

        let mut programs = schema("programs", &["program_code", "schedule_code"]);
        programs.primary_key = Some(vec!["program_code".into(), "schedule_code".into()]);
        programs.foreign_keys = vec![(
            "schedule_code".into(),
            "schedules".into(),
            "schedule_code".into(),
        )];
        create_table(conn, &programs).await.unwrap();
        assert!(table_exists(conn, "programs").await.unwrap());
        assert!(!table_exists(conn, "missing").await.unwrap());

        let columns = table_columns(conn, "programs").await.unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["program_code", "schedule_code"]);
        assert_eq!(columns[1].pk_position, 2);

        let fks = foreign_keys(conn, "programs").await.unwrap();
        assert_eq!(
            fks,
            vec![ForeignKeyInfo {
                from: "schedule_code".into(),
                table: "schedules".into(),
                to: Some("schedule_code".into()),
            }]
        );

        let records = vec![
            record(json!({"program_code": "GE", "schedule_code": "4429"})),
            record(json!({"program_code": "PL"})),
        ];
        let columns = vec!["program_code".to_string(), "schedule_code".to_string()];
        assert_eq!(insert_records(conn, "programs", &columns, &records).await.unwrap(), 2);

        let nulls: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM programs WHERE schedule_code IS NULL")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(nulls, 1);
    }

    #[tokio::test]
    async fn test_insert_records_chunks_large_batches() {
        let mut sink = SqliteSink::open_in_memory().await.unwrap();
        let conn = sink.connection();
        create_table(conn, &schema("wide", &["a", "b", "c"])).await.unwrap();

        let records: Vec<Record> = (0..1_234)
            .map(|i| record(json!({"a": i, "b": i * 2, "c": format!("row {i}")})))
            .collect();
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(insert_records(conn, "wide", &columns, &records).await.unwrap(), 1_234);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wide")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1_234);
    }

    #[tokio::test]
    async fn test_add_column_and_drop() {
        let mut sink = SqliteSink::open_in_memory().await.unwrap();
        let conn = sink.connection();
        create_table(conn, &schema("t", &["a"])).await.unwrap();
        add_column(conn, "t", &ColumnDef::new("b", Affinity::Integer)).await.unwrap();

        let columns = table_columns(conn, "t").await.unwrap();
        assert_eq!(columns[1].name, "b");
        assert_eq!(columns[1].declared_type, "INTEGER");

        drop_table_if_exists(conn, "t").await.unwrap();
        drop_table_if_exists(conn, "t").await.unwrap();
        assert!(!table_exists(conn, "t").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_row_returns_rowid() {
        let mut sink = SqliteSink::open_in_memory().await.unwrap();
        let conn = sink.connection();
        create_table(conn, &schema("t", &["a", "b"])).await.unwrap();

        let first = insert_row(conn, "t", vec!["x".into(), SqlValue::Null]).await.unwrap();
        let second = insert_named(conn, "t", &["b"], vec!["y".into()]).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_insert_rows_positional() {
        let mut sink = SqliteSink::open_in_memory().await.unwrap();
        let conn = sink.connection();
        create_table(conn, &schema("t", &["a", "b"])).await.unwrap();

        let rows: Vec<Vec<SqlValue>> = (0..1_100)
            .map(|i| vec![SqlValue::Integer(i), SqlValue::Null])
            .collect();
        assert_eq!(insert_rows(conn, "t", rows).await.unwrap(), 1_100);
        assert_eq!(insert_rows(conn, "t", Vec::new()).await.unwrap(), 0);

        let nulls: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t WHERE b IS NULL")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(nulls, 1_100);
    }

    #[tokio::test]
    async fn test_upsert_column_merges() {
        let mut sink = SqliteSink::open_in_memory().await.unwrap();
        sink.execute_script(
            "CREATE TABLE racf_med_chart (pbs_code TEXT PRIMARY KEY, med_chart_electronic TEXT, med_chart_paper TEXT);",
        )
        .await
        .unwrap();
        let conn = sink.connection();

        upsert_column(conn, "racf_med_chart", "pbs_code", "med_chart_electronic", "1234A".into(), "Y".into())
            .await
            .unwrap();
        upsert_column(conn, "racf_med_chart", "pbs_code", "med_chart_paper", "1234A".into(), "N".into())
            .await
            .unwrap();

        let row: (String, String, String) = sqlx::query_as("SELECT * FROM racf_med_chart")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(row, ("1234A".into(), "Y".into(), "N".into()));

        let err = upsert_column(conn, "racf_med_chart", "pbs_code", "med_chart_fax", "1".into(), "Y".into())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnknownColumn { ref column, .. } if column == "med_chart_fax"));
    }
}
