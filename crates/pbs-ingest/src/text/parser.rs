//! Parse strategies for the text extract files
//!
//! The extracts are not uniform: delimiters differ between files (and
//! sometimes between a file's header and body), some headers have the wrong
//! number of fields, one file packs repeated note/caution codes into each row,
//! and two files each supply one column of the same logical row. Each file is
//! bound to one [`ParseStrategy`].
//!
//! Parsing does no I/O. [`ParseStrategy::plan`] turns a line stream into a lazy
//! sequence of [`RowPlan`]s, which the pipeline applies to the database.

use std::ops::Range;

use crate::error::{IngestError, Result};

/// Placeholder marking an unused code slot in fan-out rows
pub const EMPTY_SLOT: &str = "0";

/// A group of code slots in a fan-out row, each stored as a related row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedCodes {
    pub table: &'static str,
    /// Column holding the primary row's id
    pub parent_column: &'static str,
    pub code_column: &'static str,
    pub fields: Range<usize>,
}

/// Layout of a row that expands into one primary row plus related rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutLayout {
    pub delimiter: char,
    /// Exact number of fields every body row must have
    pub field_count: usize,
    pub primary_table: &'static str,
    /// Integer primary key of the primary table (an alias of its rowid)
    pub id_column: &'static str,
    pub primary_columns: &'static [&'static str],
    /// Field positions copied to `primary_columns`, in order
    pub primary_fields: &'static [usize],
    pub related: &'static [RelatedCodes],
}

/// The pharmacy PBS item table: fields 0, 1, 6 and 7 describe the item, 8-22
/// are note codes and 23-27 caution codes. The fields in between are empty
/// leftovers of an older layout.
pub const AUTHORITIES_LAYOUT: FanOutLayout = FanOutLayout {
    delimiter: '\t',
    field_count: 28,
    primary_table: "authorities_items",
    id_column: "id",
    primary_columns: &["item_code", "restriction_code", "authority_type", "authority_method"],
    primary_fields: &[0, 1, 6, 7],
    related: &[
        RelatedCodes {
            table: "authorities_notes",
            parent_column: "authority_id",
            code_column: "note_code",
            fields: 8..23,
        },
        RelatedCodes {
            table: "authorities_cautions",
            parent_column: "authority_id",
            code_column: "caution_code",
            fields: 23..28,
        },
    ],
};

/// How one file's lines become rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStrategy {
    /// One row per line, inserted positionally
    Delimited {
        table: &'static str,
        delimiter: char,
        /// Header delimiter when it differs from the body's
        header_delimiter: Option<char>,
        /// Field count overriding the header's, for files with a broken header
        field_count: Option<usize>,
    },
    /// One primary row plus related rows per line
    FanOut(FanOutLayout),
    /// `(key, value)` lines merged into `value_column` of the row with that key
    UpsertColumn {
        table: &'static str,
        key_column: &'static str,
        value_column: &'static str,
        delimiter: char,
    },
}

impl ParseStrategy {
    /// Delimited file whose header uses the same delimiter
    pub const fn delimited(table: &'static str, delimiter: char) -> Self {
        ParseStrategy::Delimited {
            table,
            delimiter,
            header_delimiter: None,
            field_count: None,
        }
    }

    pub const fn tab_delimited(table: &'static str) -> Self {
        Self::delimited(table, '\t')
    }

    /// Tables this strategy writes to
    pub fn tables(&self) -> Vec<&'static str> {
        match self {
            ParseStrategy::Delimited { table, .. } | ParseStrategy::UpsertColumn { table, .. } => {
                vec![*table]
            },
            ParseStrategy::FanOut(layout) => std::iter::once(layout.primary_table)
                .chain(layout.related.iter().map(|r| r.table))
                .collect(),
        }
    }

    fn header_delimiter(&self) -> char {
        match self {
            ParseStrategy::Delimited {
                delimiter,
                header_delimiter,
                ..
            } => header_delimiter.unwrap_or(*delimiter),
            ParseStrategy::FanOut(layout) => layout.delimiter,
            ParseStrategy::UpsertColumn { delimiter, .. } => *delimiter,
        }
    }

    /// Consume the header line and return a lazy plan for the body
    ///
    /// `file` names the source in [`IngestError::MalformedRecord`] errors.
    pub fn plan<I>(&self, file: &str, lines: I) -> Result<Plan<'_, I::IntoIter>>
    where
        I: IntoIterator<Item = Result<String>>,
    {
        let mut lines = lines.into_iter();
        let header = match lines.next() {
            Some(line) => split_fields(&line?, self.header_delimiter()),
            None => Vec::new(),
        };

        let field_count = match self {
            ParseStrategy::Delimited { field_count, .. } => field_count.unwrap_or(header.len()),
            ParseStrategy::FanOut(layout) => layout.field_count,
            ParseStrategy::UpsertColumn { .. } => 2,
        };

        Ok(Plan {
            strategy: self,
            file: file.to_string(),
            header,
            field_count,
            lines,
            line: 1,
            blank_line: None,
        })
    }
}

/// One database write derived from one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPlan {
    /// Positional insert of exactly the table's field count; `None` is NULL
    Insert {
        table: &'static str,
        values: Vec<Option<String>>,
    },
    /// Insert a primary row, then each related row carrying its id
    InsertWithRelated {
        table: &'static str,
        columns: &'static [&'static str],
        values: Vec<String>,
        related: Vec<RelatedRow>,
    },
    Upsert {
        table: &'static str,
        key_column: &'static str,
        value_column: &'static str,
        key: String,
        value: String,
    },
}

/// A related row waiting for its primary row's id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedRow {
    pub table: &'static str,
    pub parent_column: &'static str,
    pub code_column: &'static str,
    pub code: String,
}

/// Lazy body parse of one file
pub struct Plan<'s, I> {
    strategy: &'s ParseStrategy,
    file: String,
    header: Vec<String>,
    field_count: usize,
    lines: I,
    line: usize,
    /// First empty line since the last row; only allowed if nothing follows
    blank_line: Option<usize>,
}

impl<I> Plan<'_, I> {
    /// Header fields, trimmed
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Fields per body row
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    fn malformed(&self, reason: String) -> IngestError {
        IngestError::malformed_record(&self.file, self.line, reason)
    }

    fn plan_row(&self, fields: Vec<String>) -> Result<RowPlan> {
        match self.strategy {
            ParseStrategy::Delimited { table, .. } => {
                if fields.len() != self.field_count {
                    return Err(self.malformed(format!(
                        "expected {} fields, found {}",
                        self.field_count,
                        fields.len()
                    )));
                }
                Ok(RowPlan::Insert {
                    table: *table,
                    values: fields.into_iter().map(Some).collect(),
                })
            },
            ParseStrategy::FanOut(layout) => {
                if fields.len() != layout.field_count {
                    return Err(self.malformed(format!(
                        "expected {} fields, found {}",
                        layout.field_count,
                        fields.len()
                    )));
                }

                let values = layout.primary_fields.iter().map(|&i| fields[i].clone()).collect();
                let related = layout
                    .related
                    .iter()
                    .flat_map(|group| {
                        fields[group.fields.clone()]
                            .iter()
                            .filter(|code| code.as_str() != EMPTY_SLOT)
                            .map(move |code| RelatedRow {
                                table: group.table,
                                parent_column: group.parent_column,
                                code_column: group.code_column,
                                code: code.clone(),
                            })
                    })
                    .collect();

                Ok(RowPlan::InsertWithRelated {
                    table: layout.primary_table,
                    columns: layout.primary_columns,
                    values,
                    related,
                })
            },
            ParseStrategy::UpsertColumn {
                table,
                key_column,
                value_column,
                ..
            } => match <[String; 2]>::try_from(fields) {
                Ok([key, value]) => Ok(RowPlan::Upsert {
                    table: *table,
                    key_column: *key_column,
                    value_column: *value_column,
                    key,
                    value,
                }),
                Err(fields) => Err(self.malformed(format!("expected 2 fields, found {}", fields.len()))),
            },
        }
    }
}

impl<I> Iterator for Plan<'_, I>
where
    I: Iterator<Item = Result<String>>,
{
    type Item = Result<RowPlan>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.line += 1;
            if line.is_empty() {
                self.blank_line.get_or_insert(self.line);
                continue;
            }
            if let Some(blank) = self.blank_line.take() {
                return Some(Err(IngestError::malformed_record(
                    &self.file,
                    blank,
                    "blank line before end of file",
                )));
            }

            let delimiter = match self.strategy {
                ParseStrategy::Delimited { delimiter, .. }
                | ParseStrategy::UpsertColumn { delimiter, .. } => *delimiter,
                ParseStrategy::FanOut(layout) => layout.delimiter,
            };
            return Some(self.plan_row(split_fields(&line, delimiter)));
        }
    }
}

/// Split on `delimiter`, then trim each field
///
/// The line itself is never trimmed first, so leading and trailing empty
/// fields survive.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|field| field.trim().to_string()).collect()
}
