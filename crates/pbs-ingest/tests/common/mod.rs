//! Shared helpers for the pipeline integration tests

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::ConnectOptions;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SUFFIX: &str = "20240601";

/// Write a zip archive of `(name, content)` entries
pub fn write_archive(path: &Path, entries: &[(String, String)]) {
    let mut writer = ZipWriter::new(File::create(path).expect("create archive"));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(name.as_str(), options).expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish archive");
}

/// A fan-out row: item fields, then note and caution code slots
pub fn authority_row(item: &str, notes: &[&str], cautions: &[&str]) -> String {
    let mut fields: Vec<String> = vec![
        item.to_string(),
        "R100".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        "Streamlined".to_string(),
        "Telephone".to_string(),
    ];
    for slot in 0..15 {
        fields.push(notes.get(slot).unwrap_or(&"0").to_string());
    }
    for slot in 0..5 {
        fields.push(cautions.get(slot).unwrap_or(&"0").to_string());
    }
    fields.join("\t")
}

/// A complete, well-formed extract for `suffix`
pub fn extract_entries(suffix: &str) -> Vec<(String, String)> {
    let dated = |prefix: &str| format!("{}_{}.txt", prefix, suffix);
    vec![
        (dated("amt"), "AMT_CODE!DESCRIPTION\nA1!Tablet\nA2!Capsule\n".to_string()),
        (dated("atc"), "ATC_CODE!ATC_DESCRIPTION\nN02!Analgesics\n".to_string()),
        (dated("CautionExtract"), "CAUTION_CODE\tCAUTION_TEXT\nC1\tTake with food\n".to_string()),
        (dated("cd"), "PBS_CODE\tCD_FLAG\n1234K\tY\n".to_string()),
        (dated("DI"), "PBS_CODE\tDI_FEE\n1234K\t4.54\n".to_string()),
        (dated("drug"), "PBS_CODE!DRUG_NAME\n1234K!paracetamol\n5678L!ibuprofen\n".to_string()),
        (dated("LinkExtract"), "PBS_CODE\tNOTE_CODE\n1234K\tN1\n".to_string()),
        (
            "med-chart-electronic.txt".to_string(),
            "PBS_CODE\tVALUE\n1234K\tY\n5678L\tN\n".to_string(),
        ),
        (
            "med-chart-paper.txt".to_string(),
            "PBS_CODE\tVALUE\n1234K\tN\n9999Z\tY\n".to_string(),
        ),
        (dated("mnfr"), "MNFR_CODE!MNFR_NAME\nAF!Acme Pharma\n".to_string()),
        (dated("NoteExtract"), "NOTE_CODE\tNOTE_TEXT\nN1\tSee notes\n".to_string()),
        (
            dated("Pharmacy_PBS_Item_Table"),
            format!(
                "ITEM\tRESTRICTION\tTYPE\tMETHOD\n{}\n{}\n",
                authority_row("1234K", &["N1"], &["C1"]),
                authority_row("5678L", &[], &[]),
            ),
        ),
        (
            dated("Prescriber_type"),
            "PBS_CODE,PRESCRIBER_TYPE\n1234K\tMedical\n5678L\tDental\n".to_string(),
        ),
        (
            dated("RestrictionExtractDelimited"),
            "RES_CODE\tRES_TEXT\nR100\tChronic pain\n".to_string(),
        ),
        (dated("sn20dr"), "PBS_CODE\tFLAG\n1234K\tY\t20\n".to_string()),
        (dated("streamlined"), "RES_CODE\tAUTH_CODE\nR100\t9001\n".to_string()),
    ]
}

/// Replace the content of one entry
pub fn with_entry(mut entries: Vec<(String, String)>, name: &str, content: &str) -> Vec<(String, String)> {
    match entries.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => entry.1 = content.to_string(),
        None => entries.push((name.to_string(), content.to_string())),
    }
    entries
}

/// Open an output database for inspection
pub async fn open_database(path: &Path) -> SqliteConnection {
    SqliteConnectOptions::new()
        .filename(path)
        .connect()
        .await
        .expect("open output database")
}

pub async fn count_rows(conn: &mut SqliteConnection, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(conn)
        .await
        .expect("count rows")
}

pub async fn table_names(conn: &mut SqliteConnection) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(conn)
        .await
        .expect("list tables")
}

/// Every `.sqlite3` file in `dir`
pub fn databases_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("read output dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "sqlite3"))
        .collect()
}
