//! Files imported from the text extract archive, in import order

use super::parser::{ParseStrategy, AUTHORITIES_LAYOUT};

/// Placeholder in a name template for the archive's date suffix
pub const SUFFIX_PLACEHOLDER: &str = "{}";

/// One archive entry and how to parse it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDeclaration {
    /// Entry name, with `{}` standing for the date suffix where there is one
    pub name_template: &'static str,
    pub strategy: ParseStrategy,
}

impl FileDeclaration {
    pub const fn new(name_template: &'static str, strategy: ParseStrategy) -> Self {
        Self {
            name_template,
            strategy,
        }
    }

    /// Concrete entry name for a date suffix
    pub fn file_name(&self, date_suffix: &str) -> String {
        self.name_template.replace(SUFFIX_PLACEHOLDER, date_suffix)
    }
}

pub static TEXT_FILES: &[FileDeclaration] = &[
    FileDeclaration::new("amt_{}.txt", ParseStrategy::delimited("amt", '!')),
    FileDeclaration::new("atc_{}.txt", ParseStrategy::delimited("atc", '!')),
    FileDeclaration::new("CautionExtract_{}.txt", ParseStrategy::tab_delimited("cautions")),
    FileDeclaration::new("cd_{}.txt", ParseStrategy::tab_delimited("continued_dispensing")),
    FileDeclaration::new("DI_{}.txt", ParseStrategy::tab_delimited("dispensing_incentive")),
    FileDeclaration::new("drug_{}.txt", ParseStrategy::delimited("drugs", '!')),
    FileDeclaration::new("LinkExtract_{}.txt", ParseStrategy::tab_delimited("links")),
    FileDeclaration::new(
        "med-chart-electronic.txt",
        ParseStrategy::UpsertColumn {
            table: "racf_med_chart",
            key_column: "pbs_code",
            value_column: "med_chart_electronic",
            delimiter: '\t',
        },
    ),
    FileDeclaration::new(
        "med-chart-paper.txt",
        ParseStrategy::UpsertColumn {
            table: "racf_med_chart",
            key_column: "pbs_code",
            value_column: "med_chart_paper",
            delimiter: '\t',
        },
    ),
    FileDeclaration::new("mnfr_{}.txt", ParseStrategy::delimited("manufacturers", '!')),
    FileDeclaration::new("NoteExtract_{}.txt", ParseStrategy::tab_delimited("notes")),
    FileDeclaration::new(
        "Pharmacy_PBS_Item_Table_{}.txt",
        ParseStrategy::FanOut(AUTHORITIES_LAYOUT),
    ),
    // Header is comma separated, body is tab separated
    FileDeclaration::new(
        "Prescriber_type_{}.txt",
        ParseStrategy::Delimited {
            table: "prescriber_types",
            delimiter: '\t',
            header_delimiter: Some(','),
            field_count: None,
        },
    ),
    FileDeclaration::new(
        "RestrictionExtractDelimited_{}.txt",
        ParseStrategy::tab_delimited("restrictions"),
    ),
    // Header has the wrong number of fields
    FileDeclaration::new(
        "sn20dr_{}.txt",
        ParseStrategy::Delimited {
            table: "safety_net_20_day_rule",
            delimiter: '\t',
            header_delimiter: None,
            field_count: Some(3),
        },
    ),
    FileDeclaration::new("streamlined_{}.txt", ParseStrategy::tab_delimited("streamlined_authorities")),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(TEXT_FILES[0].file_name("20240601"), "amt_20240601.txt");
        let paper = TEXT_FILES
            .iter()
            .find(|f| f.name_template.starts_with("med-chart-paper"))
            .map(|f| f.file_name("20240601"));
        assert_eq!(paper.as_deref(), Some("med-chart-paper.txt"));
    }

    #[test]
    fn test_declared_files() {
        assert_eq!(TEXT_FILES.len(), 16);
        let dated = TEXT_FILES
            .iter()
            .filter(|f| f.name_template.contains(SUFFIX_PLACEHOLDER))
            .count();
        assert_eq!(dated, 14);
    }
}
