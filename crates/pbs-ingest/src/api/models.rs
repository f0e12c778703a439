//! Response payloads of the PBS data API

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::common::Generation;
use crate::error::{IngestError, Result};
use crate::schema::Record;

/// Envelope wrapping every successful response
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    #[serde(rename = "_meta", default)]
    pub meta: Option<ApiMeta>,
    pub data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMeta {
    pub total_records: Option<u64>,
}

impl ApiEnvelope {
    /// Parse a decoded response body
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| IngestError::malformed_payload(format!("invalid response envelope: {}", e)))
    }

    pub fn total_records(&self) -> Option<u64> {
        self.meta.as_ref().and_then(|m| m.total_records)
    }

    /// The data rows as records; every row must be a JSON object
    pub fn into_records(self) -> Result<Vec<Record>> {
        self.data
            .into_iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Object(record) => Ok(record),
                other => Err(IngestError::malformed_payload(format!(
                    "data[{}] is not an object: {}",
                    i, other
                ))),
            })
            .collect()
    }
}

/// One entry of the `schedules` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub code: String,
    pub effective_date: NaiveDate,
    /// The row as returned, stored unchanged in the `schedules` table
    pub record: Record,
}

impl Schedule {
    /// Read the code and effective date out of a `schedules` row
    ///
    /// `schedule_code` is accepted as a JSON number or string;
    /// `effective_date` must start with `YYYY-MM-DD`.
    pub fn from_record(record: Record) -> Result<Self> {
        let code = match record.get("schedule_code") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            other => {
                return Err(IngestError::malformed_payload(format!(
                    "schedule without a usable schedule_code: {:?}",
                    other
                )))
            },
        };

        let effective_date = record
            .get("effective_date")
            .and_then(Value::as_str)
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| {
                IngestError::malformed_payload(format!(
                    "schedule {} has no valid effective_date",
                    code
                ))
            })?;

        Ok(Self {
            code,
            effective_date,
            record,
        })
    }

    /// Effective date as used in output file names
    pub fn effective_date_label(&self) -> String {
        self.effective_date.format("%Y-%m-%d").to_string()
    }
}

impl Generation for Schedule {
    fn identifier(&self) -> &str {
        &self.code
    }

    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_parse_envelope() {
        let envelope = ApiEnvelope::parse(
            r#"{"_meta": {"total_records": 2}, "data": [{"a": 1}, {"a": 2}], "_links": []}"#,
        )
        .unwrap();
        assert_eq!(envelope.total_records(), Some(2));
        assert_eq!(envelope.into_records().unwrap().len(), 2);
    }

    #[test]
    fn test_envelope_rejects_non_object_rows() {
        let envelope = ApiEnvelope::parse(r#"{"data": [1]}"#).unwrap();
        assert!(envelope.total_records().is_none());
        assert!(matches!(
            envelope.into_records(),
            Err(IngestError::MalformedPayload(_))
        ));
        assert!(ApiEnvelope::parse("<html>").is_err());
    }

    #[test]
    fn test_schedule_from_record() {
        let schedule = Schedule::from_record(record(
            json!({"schedule_code": 4429, "effective_date": "2024-06-01", "effective_month": "JUNE"}),
        ))
        .unwrap();
        assert_eq!(schedule.code, "4429");
        assert_eq!(schedule.effective_date_label(), "2024-06-01");
        assert_eq!(schedule.record.len(), 3);

        let schedule = Schedule::from_record(record(
            json!({"schedule_code": "B", "effective_date": "2024-06-01T00:00:00"}),
        ))
        .unwrap();
        assert_eq!(schedule.identifier(), "B");
    }

    #[test]
    fn test_schedule_from_bad_record() {
        assert!(Schedule::from_record(record(json!({"effective_date": "2024-06-01"}))).is_err());
        assert!(Schedule::from_record(record(json!({"schedule_code": "A"}))).is_err());
        assert!(Schedule::from_record(record(
            json!({"schedule_code": "A", "effective_date": "June 2024"})
        ))
        .is_err());
    }
}
