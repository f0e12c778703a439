//! Schema-on-write
//!
//! Destination tables are not declared column by column. Their columns come
//! from the records themselves: the first [`INFERENCE_SAMPLE_SIZE`] records fix
//! the initial set, in first-seen key order, and any column first seen later is
//! added on the fly. Declared key columns are always present.

use serde_json::Value;

use super::declaration::{Relationship, TableDeclaration};
use super::{quote_ident, Record};

/// Number of records inspected before the destination table is created
pub const INFERENCE_SAMPLE_SIZE: usize = 100;

/// SQLite column affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Real,
    Text,
}

impl Affinity {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Text => "TEXT",
        }
    }

    /// Affinity of a single value; `None` for JSON null
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Affinity::Integer),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Affinity::Integer),
            Value::Number(_) => Some(Affinity::Real),
            Value::String(_) | Value::Array(_) | Value::Object(_) => Some(Affinity::Text),
        }
    }

    /// Widen two observed affinities to one that holds both
    pub fn widen(self, other: Affinity) -> Affinity {
        match (self, other) {
            (Affinity::Text, _) | (_, Affinity::Text) => Affinity::Text,
            (Affinity::Integer, Affinity::Integer) => Affinity::Integer,
            _ => Affinity::Real,
        }
    }
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A destination column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub affinity: Affinity,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, affinity: Affinity) -> Self {
        Self {
            name: name.into(),
            affinity,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, Affinity::Text)
    }

    pub fn definition_sql(&self) -> String {
        format!("{} {}", quote_ident(&self.name), self.affinity)
    }
}

/// Structure of one destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Option<Vec<String>>,
    /// Enforced foreign keys: `(column, parent table, parent column)`
    pub foreign_keys: Vec<(String, String, String)>,
}

impl TableSchema {
    /// Infer the schema of a declared table from a sample of its records
    ///
    /// Declared key columns that no record carries are appended as TEXT, so
    /// the result is always a superset of the declaration's key columns, even
    /// for an empty sample.
    pub fn infer(declaration: &TableDeclaration, sample: &[Record]) -> Self {
        let mut columns = infer_columns(sample);
        for key in declaration.key_columns() {
            if !columns.iter().any(|c| c.name == key) {
                columns.push(ColumnDef::text(key));
            }
        }

        let foreign_keys = declaration
            .relationships()
            .filter_map(|relationship| match relationship {
                Relationship::Enforced {
                    column,
                    references,
                    referenced_column,
                } => Some((
                    column.to_string(),
                    super::declaration::table_name(references),
                    referenced_column.to_string(),
                )),
                Relationship::Documented { .. } => None,
            })
            .collect();

        Self {
            name: declaration.table_name(),
            columns,
            primary_key: declaration
                .primary_key
                .map(|pk| pk.iter().map(|c| c.to_string()).collect()),
            foreign_keys,
        }
    }

    /// A table of TEXT columns named from a header line
    ///
    /// Header names are reduced to identifier characters; positions beyond the
    /// header, blank names and repeated names get a generated `field_N` name,
    /// suffixed `_2`, `_3`... when the header already uses it.
    pub fn from_header(table: &str, header: &[&str], field_count: usize) -> Self {
        let names: Vec<String> = header
            .iter()
            .take(field_count)
            .map(|raw| sanitize_column_name(raw))
            .collect();

        let mut columns: Vec<ColumnDef> = Vec::with_capacity(field_count);
        for position in 0..field_count {
            let name = match names.get(position) {
                Some(name) if !name.is_empty() && !taken(name, &columns) => name.clone(),
                _ => {
                    // Generated names also avoid header names further along
                    let base = format!("field_{}", position + 1);
                    let mut name = base.clone();
                    let mut attempt = 1;
                    while taken(&name, &columns) || names.iter().skip(position).any(|n| *n == name) {
                        attempt += 1;
                        name = format!("{}_{}", base, attempt);
                    }
                    name
                },
            };
            columns.push(ColumnDef::text(name));
        }

        Self {
            name: table.to_string(),
            columns,
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Columns carried by `records` that this schema lacks, with inferred affinity
    pub fn missing_columns(&self, records: &[Record]) -> Vec<ColumnDef> {
        infer_columns(records)
            .into_iter()
            .filter(|column| !self.has_column(&column.name))
            .collect()
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::definition_sql).collect();

        if let Some(pk) = &self.primary_key {
            let cols: Vec<String> = pk.iter().map(|c| quote_ident(c)).collect();
            parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }

        for (column, parent, parent_column) in &self.foreign_keys {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident(column),
                quote_ident(parent),
                quote_ident(parent_column)
            ));
        }

        format!("CREATE TABLE {} ({})", quote_ident(&self.name), parts.join(", "))
    }
}

/// Columns in first-seen key order, each widened across every non-null value
pub fn infer_columns(records: &[Record]) -> Vec<ColumnDef> {
    let mut columns: Vec<(String, Option<Affinity>)> = Vec::new();

    for record in records {
        for (key, value) in record {
            let observed = Affinity::of_value(value);
            match columns.iter_mut().find(|(name, _)| name == key) {
                Some((_, affinity)) => {
                    *affinity = match (*affinity, observed) {
                        (Some(a), Some(b)) => Some(a.widen(b)),
                        (a, b) => a.or(b),
                    };
                },
                None => columns.push((key.clone(), observed)),
            }
        }
    }

    columns
        .into_iter()
        .map(|(name, affinity)| ColumnDef::new(name, affinity.unwrap_or(Affinity::Text)))
        .collect()
}

fn taken(name: &str, columns: &[ColumnDef]) -> bool {
    columns.iter().any(|c| c.name == name)
}

fn sanitize_column_name(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    while name.contains("__") {
        name = name.replace("__", "_");
    }
    let name = name.trim_matches('_');
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::declaration::ForeignKeyDeclaration as Fk;
    use serde_json::json;

    fn records(values: Value) -> Vec<Record> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    static ITEMS: TableDeclaration = TableDeclaration::new(
        "item-pricing-events",
        None,
        &[
            Fk::new(&["schedule_code"], "schedules"),
            Fk::new(&["li_item_id", "schedule_code"], "items"),
        ],
    );

    #[test]
    fn test_affinity_widening() {
        let sample = records(json!([
            {"a": 1, "b": 1, "c": "x", "d": null, "e": true, "f": [1, 2]},
            {"a": 2, "b": 2.5, "c": 3, "d": null, "e": false, "f": null},
        ]));
        let columns = infer_columns(&sample);
        let affinities: Vec<_> = columns.iter().map(|c| (c.name.as_str(), c.affinity)).collect();
        assert_eq!(
            affinities,
            vec![
                ("a", Affinity::Integer),
                ("b", Affinity::Real),
                ("c", Affinity::Text),
                ("d", Affinity::Text),
                ("e", Affinity::Integer),
                ("f", Affinity::Text),
            ]
        );
    }

    #[test]
    fn test_first_seen_order_across_records() {
        let sample = records(json!([{"b": 1}, {"a": 1, "b": 2}, {"c": 1}]));
        let names: Vec<_> = infer_columns(&sample).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_infer_adds_missing_key_columns() {
        let sample = records(json!([{"li_item_id": "1", "price": 10.5}]));
        let schema = TableSchema::infer(&ITEMS, &sample);
        assert_eq!(schema.name, "item_pricing_events");
        assert_eq!(schema.column_names(), vec!["li_item_id", "price", "schedule_code"]);
        assert!(schema.primary_key.is_none());
    }

    #[test]
    fn test_infer_empty_sample_keeps_keys() {
        let schema = TableSchema::infer(&ITEMS, &[]);
        assert_eq!(schema.column_names(), vec!["schedule_code", "li_item_id"]);
    }

    #[test]
    fn test_create_sql_only_enforces_single_column_keys() {
        static PROGRAMS: TableDeclaration = TableDeclaration::new(
            "programs",
            Some(&["program_code", "schedule_code"]),
            &[Fk::new(&["schedule_code"], "schedules")],
        );
        let sample = records(json!([{"program_code": "GE", "schedule_code": 4429}]));
        let sql = TableSchema::infer(&PROGRAMS, &sample).create_sql();
        assert_eq!(
            sql,
            "CREATE TABLE \"programs\" (\"program_code\" TEXT, \"schedule_code\" INTEGER, \
             PRIMARY KEY (\"program_code\", \"schedule_code\"), \
             FOREIGN KEY (\"schedule_code\") REFERENCES \"schedules\" (\"schedule_code\"))"
        );

        let compound = TableSchema::infer(&ITEMS, &[]).create_sql();
        assert_eq!(compound.matches("FOREIGN KEY").count(), 1);
        assert!(!compound.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_foreign_key_targets_sql_table_name() {
        static INDICATIONS: TableDeclaration = TableDeclaration::new(
            "indications",
            None,
            &[Fk::new(&["indication_prescribing_txt_id"], "prescribing-texts")
                .to_columns(&["prescribing_txt_id"])],
        );
        let schema = TableSchema::infer(&INDICATIONS, &[]);
        assert_eq!(
            schema.foreign_keys,
            vec![(
                "indication_prescribing_txt_id".to_string(),
                "prescribing_texts".to_string(),
                "prescribing_txt_id".to_string()
            )]
        );
    }

    #[test]
    fn test_missing_columns() {
        let schema = TableSchema::infer(&ITEMS, &records(json!([{"li_item_id": "1"}])));
        let later = records(json!([{"li_item_id": "2", "note": "late", "count": 3}]));
        assert_eq!(
            schema.missing_columns(&later),
            vec![ColumnDef::text("note"), ColumnDef::new("count", Affinity::Integer)]
        );
    }

    #[test]
    fn test_from_header() {
        let schema = TableSchema::from_header(
            "safety_net_20_day_rule",
            &["PBS Code", "Item-Code", "pbs code"],
            4,
        );
        assert_eq!(
            schema.column_names(),
            vec!["pbs_code", "item_code", "field_3", "field_4"]
        );
        assert!(schema.columns.iter().all(|c| c.affinity == Affinity::Text));
    }

    #[test]
    fn test_from_header_generated_names_stay_unique() {
        let schema = TableSchema::from_header("continued_dispensing", &["field_2", ""], 2);
        assert_eq!(schema.column_names(), vec!["field_2", "field_2_2"]);

        let schema = TableSchema::from_header("links", &["", "field_1", "field_1_2"], 4);
        assert_eq!(
            schema.column_names(),
            vec!["field_1_3", "field_1", "field_1_2", "field_4"]
        );
    }

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("  Drug Name (generic) "), "drug_name_generic");
        assert_eq!(sanitize_column_name("20day"), "_20day");
        assert_eq!(sanitize_column_name("***"), "");
    }
}
