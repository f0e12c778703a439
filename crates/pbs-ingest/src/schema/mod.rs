//! Table declarations, their dependency graph, and schema-on-write inference
//!
//! - [`declaration`]: static `(table, primary key, foreign keys)` declarations
//! - [`graph`]: parent-before-child load order computed from foreign keys
//! - [`inference`]: destination table structure derived from loaded records

pub mod declaration;
pub mod graph;
pub mod inference;

pub use declaration::{ForeignKeyDeclaration, Relationship, TableDeclaration};
pub use graph::DependencyGraph;
pub use inference::{Affinity, ColumnDef, TableSchema};

/// One decoded unit of source data: column name to scalar value
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Quote an SQL identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("items"), "\"items\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
