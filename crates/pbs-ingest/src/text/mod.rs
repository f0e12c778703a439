//! PBS text extract import
//!
//! Loads the monthly zip of delimited text files into SQLite.
//!
//! - [`archive`]: zip access, integrity check and date suffix detection
//! - [`parser`]: per-file [`ParseStrategy`] turning lines into [`RowPlan`]s
//! - [`files`]: the files imported and how each is parsed
//! - [`pipeline`]: [`run_text_import`]

pub mod archive;
pub mod files;
pub mod parser;
pub mod pipeline;

pub use archive::{detect_date_suffix, ArchiveReader, Lines};
pub use files::{FileDeclaration, TEXT_FILES};
pub use parser::{split_fields, FanOutLayout, ParseStrategy, Plan, RelatedCodes, RelatedRow, RowPlan, AUTHORITIES_LAYOUT};
pub use pipeline::{import_file, run_text_import, TextImportResult, BUNDLED_SCHEMA};
