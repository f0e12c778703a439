//! Data release ("generation") identifiers
//!
//! Both sources publish data in complete releases. The API names a release by
//! its schedule code and effective date; the text extracts embed an
//! eight-digit date suffix in every file name. Either way, exactly one
//! generation is chosen per run, and it names the output database.

use chrono::NaiveDate;

use crate::error::{IngestError, Result};

/// Common interface for a data release identifier
pub trait Generation {
    /// Opaque identifier used to scope requests and name outputs
    fn identifier(&self) -> &str;

    /// Date from which the release is in effect
    fn effective_date(&self) -> NaiveDate;
}

impl<T: Generation + ?Sized> Generation for &T {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn effective_date(&self) -> NaiveDate {
        (**self).effective_date()
    }
}

/// Pick the generation with the latest effective date
///
/// Ties go to the candidate that arrived last, matching a stable sort by date
/// followed by taking the final element.
///
/// # Errors
/// [`IngestError::NoDataAvailable`] when `candidates` is empty.
pub fn latest_generation<T, I>(candidates: I) -> Result<T>
where
    T: Generation,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .fold(None, |best: Option<T>, candidate| match best {
            Some(current) if current.effective_date() > candidate.effective_date() => {
                Some(current)
            },
            _ => Some(candidate),
        })
        .ok_or(IngestError::NoDataAvailable)
}

/// A date suffix of the form `YYYYMMDD`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSuffix {
    raw: String,
    date: NaiveDate,
}

impl DateSuffix {
    /// Parse an eight-digit suffix such as `20240601`
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
        Some(Self {
            raw: raw.to_string(),
            date,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Generation for DateSuffix {
    fn identifier(&self) -> &str {
        &self.raw
    }

    fn effective_date(&self) -> NaiveDate {
        self.date
    }
}

impl std::fmt::Display for DateSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
