//! Static table declarations
//!
//! A declaration names a remote dataset, the primary key its rows satisfy (if
//! any), and the foreign keys that tie it to other datasets. Only foreign keys
//! with a single local column can be written into SQLite DDL; compound ones
//! are kept as documented relationships so the dependency graph and schema
//! introspection still see them.

/// A declared foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyDeclaration {
    /// Local columns, in order
    pub columns: &'static [&'static str],
    /// Endpoint name of the referenced table
    pub references: &'static str,
    /// Referenced columns; `None` means the same names as `columns`
    pub referenced_columns: Option<&'static [&'static str]>,
}

impl ForeignKeyDeclaration {
    pub const fn new(columns: &'static [&'static str], references: &'static str) -> Self {
        Self {
            columns,
            references,
            referenced_columns: None,
        }
    }

    /// Reference differently named columns in the parent table
    pub const fn to_columns(mut self, referenced_columns: &'static [&'static str]) -> Self {
        self.referenced_columns = Some(referenced_columns);
        self
    }

    /// Columns on the referenced side
    pub fn target_columns(&self) -> &'static [&'static str] {
        self.referenced_columns.unwrap_or(self.columns)
    }

    /// Classify this key by whether SQLite DDL can express it
    pub fn relationship(&self) -> Relationship {
        match (self.columns, self.target_columns()) {
            ([column], [target]) => Relationship::Enforced {
                column: *column,
                references: self.references,
                referenced_column: *target,
            },
            _ => Relationship::Documented {
                columns: self.columns,
                references: self.references,
                referenced_columns: self.target_columns(),
            },
        }
    }
}

/// A foreign key as the sink will treat it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// Single-column key, written into the table DDL
    Enforced {
        column: &'static str,
        references: &'static str,
        referenced_column: &'static str,
    },
    /// Compound key, recorded but not enforced by the sink
    Documented {
        columns: &'static [&'static str],
        references: &'static str,
        referenced_columns: &'static [&'static str],
    },
}

impl Relationship {
    pub fn references(&self) -> &'static str {
        match self {
            Relationship::Enforced { references, .. } | Relationship::Documented { references, .. } => {
                *references
            },
        }
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, Relationship::Enforced { .. })
    }
}

/// A dataset to be loaded as one destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDeclaration {
    /// Remote endpoint name, e.g. `item-pricing-events`
    pub endpoint: &'static str,
    /// Primary key columns, or `None` where the source data has no unique key
    pub primary_key: Option<&'static [&'static str]>,
    /// Declared foreign keys
    pub foreign_keys: &'static [ForeignKeyDeclaration],
    /// Whether requests are filtered to the current generation
    pub scoped: bool,
}

impl TableDeclaration {
    pub const fn new(
        endpoint: &'static str,
        primary_key: Option<&'static [&'static str]>,
        foreign_keys: &'static [ForeignKeyDeclaration],
    ) -> Self {
        Self {
            endpoint,
            primary_key,
            foreign_keys,
            scoped: true,
        }
    }

    /// Request every generation instead of the current one
    pub const fn unscoped(mut self) -> Self {
        self.scoped = false;
        self
    }

    /// SQL table name: hyphens would need quoting everywhere, so use underscores
    pub fn table_name(&self) -> String {
        table_name(self.endpoint)
    }

    pub fn relationships(&self) -> impl Iterator<Item = Relationship> + '_ {
        self.foreign_keys.iter().map(ForeignKeyDeclaration::relationship)
    }

    /// Every local column named by the primary key or a foreign key, deduplicated
    pub fn key_columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = Vec::new();
        let declared = self
            .primary_key
            .unwrap_or(&[])
            .iter()
            .chain(self.foreign_keys.iter().flat_map(|fk| fk.columns.iter()));
        for column in declared {
            if !columns.contains(column) {
                columns.push(*column);
            }
        }
        columns
    }
}

/// Convert an endpoint name to its SQL table name
pub fn table_name(endpoint: &str) -> String {
    endpoint.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    static ITEMS: TableDeclaration = TableDeclaration::new(
        "item-pricing-events",
        None,
        &[
            ForeignKeyDeclaration::new(&["schedule_code"], "schedules"),
            ForeignKeyDeclaration::new(&["li_item_id", "schedule_code"], "items"),
        ],
    );

    #[test]
    fn test_table_name() {
        assert_eq!(ITEMS.table_name(), "item_pricing_events");
    }

    #[test]
    fn test_relationship_kinds() {
        let relationships: Vec<_> = ITEMS.relationships().collect();
        assert_eq!(
            relationships[0],
            Relationship::Enforced {
                column: "schedule_code",
                references: "schedules",
                referenced_column: "schedule_code",
            }
        );
        assert!(!relationships[1].is_enforced());
        assert_eq!(relationships[1].references(), "items");
    }

    #[test]
    fn test_renamed_target_column() {
        let fk = ForeignKeyDeclaration::new(&["prescribing_text_id"], "prescribing-texts")
            .to_columns(&["prescribing_txt_id"]);
        assert_eq!(
            fk.relationship(),
            Relationship::Enforced {
                column: "prescribing_text_id",
                references: "prescribing-texts",
                referenced_column: "prescribing_txt_id",
            }
        );
    }

    #[test]
    fn test_key_columns_deduplicated() {
        assert_eq!(ITEMS.key_columns(), vec!["schedule_code", "li_item_id"]);
    }

    #[test]
    fn test_unscoped() {
        let schedules = TableDeclaration::new("schedules", Some(&["schedule_code"]), &[]).unscoped();
        assert!(!schedules.scoped);
        assert!(ITEMS.scoped);
    }
}
