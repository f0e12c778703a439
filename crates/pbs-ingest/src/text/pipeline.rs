//! Text extract import pipeline
//!
//! 1. Open the archive and verify every entry's checksum
//! 2. Detect the single date suffix and check every declared file is present
//! 3. Create `pbs-{suffix}.sqlite3` and run the schema script
//! 4. Import each declared file in its own transaction
//! 5. Refresh planner statistics

use std::path::PathBuf;

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info, instrument, warn};

use super::archive::{detect_date_suffix, ArchiveReader};
use super::files::{FileDeclaration, TEXT_FILES};
use super::parser::{ParseStrategy, RowPlan};
use crate::common::DateSuffix;
use crate::config::TextConfig;
use crate::error::{IngestError, Result};
use crate::schema::{Affinity, ColumnDef, TableSchema};
use crate::storage::{table, SqlValue, SqliteSink};

/// Schema script used when none is supplied
pub const BUNDLED_SCHEMA: &str = include_str!("../../sql/schema-text.sql");

/// Rows buffered before a batched positional insert
const INSERT_BATCH_SIZE: usize = 500;

/// Result of a complete text import
#[derive(Debug, Clone)]
pub struct TextImportResult {
    pub database: PathBuf,
    pub date_suffix: String,
    /// Rows parsed per file
    pub files: Vec<(String, u64)>,
}

impl TextImportResult {
    pub fn total_rows(&self) -> u64 {
        self.files.iter().map(|(_, rows)| rows).sum()
    }
}

/// Run the text import end to end
#[instrument(skip(config), fields(archive = %config.archive.display()))]
pub async fn run_text_import(config: TextConfig) -> Result<TextImportResult> {
    config.validate()?;

    let mut archive = ArchiveReader::open(&config.archive)?;
    archive.verify_integrity()?;

    let names = archive.entry_names();
    let suffix = detect_date_suffix(&archive.label(), names.iter().map(String::as_str))?;
    info!(date_suffix = %suffix, "Detected date suffix");

    for file in TEXT_FILES {
        let name = file.file_name(suffix.as_str());
        if !archive.contains(&name) {
            return Err(IngestError::MissingArchiveEntry {
                archive: archive.label(),
                entry: name,
            });
        }
    }

    let script = match &config.schema_script {
        Some(path) => std::fs::read_to_string(path)?,
        None => BUNDLED_SCHEMA.to_string(),
    };

    std::fs::create_dir_all(&config.output_dir)?;
    let database = config.database_path(suffix.as_str());
    let mut sink = SqliteSink::open(&database, true).await?;
    sink.execute_script(&script).await?;

    let mut files = Vec::with_capacity(TEXT_FILES.len());
    for file in TEXT_FILES {
        match import_file(&mut sink, &mut archive, file, &suffix).await {
            Ok(rows) => files.push((file.file_name(suffix.as_str()), rows)),
            Err(e) => {
                if let Err(close_err) = sink.close().await {
                    warn!(error = %close_err, "Failed to close database after import error");
                }
                return Err(e);
            },
        }
    }

    sink.analyze().await?;
    sink.close().await?;

    let result = TextImportResult {
        database,
        date_suffix: suffix.to_string(),
        files,
    };
    info!(
        database = %result.database.display(),
        rows = result.total_rows(),
        "Successfully generated database"
    );
    Ok(result)
}

/// Parse one archive entry and apply it in a single transaction
#[instrument(skip(sink, archive, file, suffix), fields(file = %file.file_name(suffix.as_str())))]
pub async fn import_file(
    sink: &mut SqliteSink,
    archive: &mut ArchiveReader,
    file: &FileDeclaration,
    suffix: &DateSuffix,
) -> Result<u64> {
    let name = file.file_name(suffix.as_str());
    let lines = archive.open_lines(&name)?;
    let plan = file.strategy.plan(&name, lines)?;

    let mut tx = sink.begin().await?;
    prepare_tables(&mut tx, &file.strategy, plan.header(), plan.field_count()).await?;

    let mut rows = 0;
    let mut pending: Vec<Vec<SqlValue>> = Vec::new();
    let mut pending_table = None;

    for row in plan {
        let row = row?;
        rows += 1;

        if let RowPlan::Insert { table, values } = row {
            pending_table = Some(table);
            pending.push(values.into_iter().map(SqlValue::from).collect());
            if pending.len() >= INSERT_BATCH_SIZE {
                table::insert_rows(&mut tx, table, std::mem::take(&mut pending)).await?;
            }
            continue;
        }
        apply_row(&mut tx, row).await?;
    }

    if let Some(table) = pending_table {
        table::insert_rows(&mut tx, table, pending).await?;
    }

    tx.commit().await?;
    info!(rows, "Imported file");
    Ok(rows)
}

/// Create any destination table the schema script did not define
async fn prepare_tables(
    conn: &mut SqliteConnection,
    strategy: &ParseStrategy,
    header: &[String],
    field_count: usize,
) -> Result<()> {
    match strategy {
        ParseStrategy::Delimited { table, .. } => {
            if field_count == 0 {
                warn!(table = %table, "Empty file, no table created");
            } else if !table::table_exists(conn, table).await? {
                let header: Vec<&str> = header.iter().map(String::as_str).collect();
                table::create_table(conn, &TableSchema::from_header(table, &header, field_count)).await?;
            }
        },
        ParseStrategy::FanOut(layout) => {
            if !table::table_exists(conn, layout.primary_table).await? {
                let mut columns = vec![ColumnDef::new(layout.id_column, Affinity::Integer)];
                columns.extend(layout.primary_columns.iter().map(|c| ColumnDef::text(*c)));
                let schema = TableSchema {
                    name: layout.primary_table.to_string(),
                    columns,
                    primary_key: Some(vec![layout.id_column.to_string()]),
                    foreign_keys: Vec::new(),
                };
                table::create_table(conn, &schema).await?;
            }
            for group in layout.related {
                if !table::table_exists(conn, group.table).await? {
                    let schema = TableSchema {
                        name: group.table.to_string(),
                        columns: vec![
                            ColumnDef::new(group.parent_column, Affinity::Integer),
                            ColumnDef::text(group.code_column),
                        ],
                        primary_key: None,
                        foreign_keys: vec![(
                            group.parent_column.to_string(),
                            layout.primary_table.to_string(),
                            layout.id_column.to_string(),
                        )],
                    };
                    table::create_table(conn, &schema).await?;
                }
            }
        },
        ParseStrategy::UpsertColumn {
            table,
            key_column,
            value_column,
            ..
        } => {
            if !table::table_exists(conn, table).await? {
                let schema = TableSchema {
                    name: table.to_string(),
                    columns: vec![ColumnDef::text(*key_column), ColumnDef::text(*value_column)],
                    primary_key: Some(vec![key_column.to_string()]),
                    foreign_keys: Vec::new(),
                };
                table::create_table(conn, &schema).await?;
            } else {
                let columns = table::table_columns(conn, table).await?;
                if !columns.iter().any(|c| c.name == *key_column) {
                    return Err(IngestError::UnknownColumn {
                        table: table.to_string(),
                        column: key_column.to_string(),
                    });
                }
                if !columns.iter().any(|c| c.name == *value_column) {
                    table::add_column(conn, table, &ColumnDef::text(*value_column)).await?;
                }
            }
        },
    }
    Ok(())
}

async fn apply_row(conn: &mut SqliteConnection, row: RowPlan) -> Result<()> {
    match row {
        RowPlan::Insert { table, values } => {
            table::insert_row(conn, table, values.into_iter().map(SqlValue::from).collect()).await?;
        },
        RowPlan::InsertWithRelated {
            table,
            columns,
            values,
            related,
        } => {
            let id = table::insert_named(conn, table, columns, values.into_iter().map(SqlValue::from).collect())
                .await?;
            for child in related {
                table::insert_named(
                    conn,
                    child.table,
                    &[child.parent_column, child.code_column],
                    vec![SqlValue::Integer(id), SqlValue::Text(child.code)],
                )
                .await?;
            }
            debug!(table, id, "Inserted row with related rows");
        },
        RowPlan::Upsert {
            table,
            key_column,
            value_column,
            key,
            value,
        } => {
            table::upsert_column(conn, table, key_column, value_column, key.into(), value.into()).await?;
        },
    }
    Ok(())
}
