//! Text extract archive access
//!
//! The monthly extract is a zip of delimited text files, most named
//! `<Prefix>_<YYYYMMDD>.txt`. All dated entries must share one date.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::common::DateSuffix;
use crate::error::{IngestError, Result};

const DATE_SUFFIX_PATTERN: &str = r"^[A-Za-z_]+_([0-9]{8})\.txt$";

/// An opened extract archive
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        debug!(path = %path.display(), entries = archive.len(), "Opened archive");
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Archive path for diagnostics
    pub fn label(&self) -> String {
        self.path.display().to_string()
    }

    pub fn entry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Read every entry to the end so the zip reader checks its CRC
    ///
    /// # Errors
    /// [`IngestError::CorruptArchiveEntry`] naming the first bad entry.
    pub fn verify_integrity(&mut self) -> Result<()> {
        for index in 0..self.archive.len() {
            let mut entry = self.archive.by_index(index).map_err(|_| IngestError::CorruptArchiveEntry {
                archive: self.path.display().to_string(),
                entry: format!("#{}", index),
            })?;
            let name = entry.name().to_string();
            io::copy(&mut entry, &mut io::sink()).map_err(|_| IngestError::CorruptArchiveEntry {
                archive: self.path.display().to_string(),
                entry: name.clone(),
            })?;
            debug!(entry = %name, "Entry verified");
        }
        info!(archive = %self.path.display(), entries = self.archive.len(), "Archive integrity verified");
        Ok(())
    }

    /// Stream the lines of one entry
    ///
    /// # Errors
    /// [`IngestError::MissingArchiveEntry`] when no entry has that name.
    pub fn open_lines(&mut self, name: &str) -> Result<Lines<BufReader<impl Read + '_>>> {
        let label = self.label();
        match self.archive.by_name(name) {
            Ok(entry) => Ok(Lines::new(BufReader::new(entry))),
            Err(ZipError::FileNotFound) => Err(IngestError::MissingArchiveEntry {
                archive: label,
                entry: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }
}

/// Lines of a text stream without their `\n` / `\r\n` terminators
///
/// Bytes that are not valid UTF-8 are read as Windows-1252.
pub struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Lines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                Some(Ok(pbs_common::decompression::decode_text(&self.buf).into_owned()))
            },
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Find the one date suffix shared by the dated entry names
///
/// # Errors
/// [`IngestError::AmbiguousOrMissingGeneration`] unless exactly one distinct
/// suffix is found.
pub fn detect_date_suffix<'a, I>(archive: &str, names: I) -> Result<DateSuffix>
where
    I: IntoIterator<Item = &'a str>,
{
    let pattern = Regex::new(DATE_SUFFIX_PATTERN)?;
    let suffixes: BTreeSet<&str> = names
        .into_iter()
        .filter_map(|name| pattern.captures(name))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let ambiguous = || IngestError::AmbiguousOrMissingGeneration {
        archive: archive.to_string(),
        found: suffixes.iter().map(|s| s.to_string()).collect(),
    };

    match suffixes.iter().next() {
        Some(suffix) if suffixes.len() == 1 => DateSuffix::parse(suffix).ok_or_else(ambiguous),
        _ => Err(ambiguous()),
    }
}
