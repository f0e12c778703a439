//! API import pipeline
//!
//! 1. Build the dependency graph of the declared tables (fails fast on cycles)
//! 2. Resolve the latest schedule
//! 3. Load every table in parent-first order into `pbs-{effective date}.sqlite3`
//! 4. Report foreign key violations and refresh planner statistics

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use super::client::{PbsApiClient, TableSource};
use super::tables::{API_TABLES, SCHEDULES_ENDPOINT};
use super::version_discovery::resolve_latest_schedule;
use crate::config::ApiConfig;
use crate::error::Result;
use crate::schema::inference::INFERENCE_SAMPLE_SIZE;
use crate::schema::{DependencyGraph, Record, TableDeclaration, TableSchema};
use crate::storage::{table, SqliteSink};

/// Loads declared tables in dependency order
pub struct Loader<'a> {
    graph: DependencyGraph<'a>,
    preloaded: HashMap<&'static str, Vec<Record>>,
}

impl<'a> Loader<'a> {
    pub fn new(declarations: &'a [TableDeclaration]) -> Result<Self> {
        Ok(Self {
            graph: DependencyGraph::build(declarations)?,
            preloaded: HashMap::new(),
        })
    }

    /// Supply a table's records up front instead of fetching them
    pub fn with_preloaded(mut self, endpoint: &'static str, records: Vec<Record>) -> Self {
        self.preloaded.insert(endpoint, records);
        self
    }

    pub fn graph(&self) -> &DependencyGraph<'a> {
        &self.graph
    }

    /// Fetch and load every declared table
    ///
    /// Any failure aborts the run; tables already loaded stay as they are and
    /// the next run recreates them.
    pub async fn run<S: TableSource + ?Sized>(
        &self,
        source: &mut S,
        sink: &mut SqliteSink,
        schedule_code: &str,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        for declaration in self.graph.load_order() {
            let fetched;
            let records: &[Record] = match self.preloaded.get(declaration.endpoint) {
                Some(records) => records,
                None => {
                    let scope = declaration.scoped.then_some(schedule_code);
                    fetched = source.fetch(declaration.endpoint, scope).await?.into_records();
                    &fetched
                },
            };

            let rows = load_table(sink, declaration, records).await?;
            summary.tables.push((declaration.table_name(), rows));
        }

        let violations = sink.foreign_key_violations().await?;
        for violation in &violations {
            warn!(
                table = %violation.table,
                rowid = ?violation.rowid,
                parent = %violation.parent,
                "Foreign key violation"
            );
        }
        summary.foreign_key_violations = violations.len();

        sink.analyze().await?;
        Ok(summary)
    }
}

/// Drop, recreate and fill one table inside a single transaction
#[instrument(skip(sink, declaration, records), fields(table = %declaration.table_name()))]
pub async fn load_table(
    sink: &mut SqliteSink,
    declaration: &TableDeclaration,
    records: &[Record],
) -> Result<u64> {
    let (sample, rest) = records.split_at(records.len().min(INFERENCE_SAMPLE_SIZE));
    let mut schema = TableSchema::infer(declaration, sample);

    let mut tx = sink.begin().await?;
    table::drop_table_if_exists(&mut tx, &schema.name).await?;
    table::create_table(&mut tx, &schema).await?;

    for column in schema.missing_columns(rest) {
        table::add_column(&mut tx, &schema.name, &column).await?;
        schema.columns.push(column);
    }

    let columns: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
    let rows = table::insert_records(&mut tx, &schema.name, &columns, records).await?;
    tx.commit().await?;

    info!(rows, columns = columns.len(), "Loaded table");
    Ok(rows)
}

/// Rows loaded per table
#[derive(Debug, Default, Clone)]
pub struct LoadSummary {
    pub tables: Vec<(String, u64)>,
    pub foreign_key_violations: usize,
}

impl LoadSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }

    pub fn rows_for(&self, table: &str) -> Option<u64> {
        self.tables.iter().find(|(name, _)| name == table).map(|(_, rows)| *rows)
    }
}

/// Result of a complete API import
#[derive(Debug, Clone)]
pub struct ApiImportResult {
    pub database: PathBuf,
    pub schedule_code: String,
    pub effective_date: String,
    pub summary: LoadSummary,
}

/// Run the API import end to end
#[instrument(skip(config), fields(base_url = %config.base_url))]
pub async fn run_api_import(config: ApiConfig) -> Result<ApiImportResult> {
    config.validate()?;

    let loader = Loader::new(API_TABLES)?;
    let mut client = PbsApiClient::new(config.clone())?;
    let schedules = resolve_latest_schedule(&mut client).await?;

    let effective_date = schedules.latest.effective_date_label();
    let database = config.database_path(&effective_date);
    if let Some(dir) = database.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut sink = SqliteSink::open(&database, true).await?;
    let loader = loader.with_preloaded(SCHEDULES_ENDPOINT, schedules.records());

    info!(tables = loader.graph().len(), "Downloading tables");
    let summary = loader
        .run(&mut client, &mut sink, &schedules.latest.code)
        .await?;
    sink.close().await?;

    info!(
        database = %database.display(),
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        "Successfully generated database"
    );

    Ok(ApiImportResult {
        database,
        schedule_code: schedules.latest.code,
        effective_date,
        summary,
    })
}
