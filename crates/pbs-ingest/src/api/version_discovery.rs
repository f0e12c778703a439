//! Current schedule discovery
//!
//! The `schedules` endpoint lists every published schedule. The one with the
//! latest effective date scopes the rest of the run.

use tracing::info;

use super::client::TableSource;
use super::models::Schedule;
use super::tables::SCHEDULES_ENDPOINT;
use crate::common::latest_generation;
use crate::error::Result;
use crate::schema::Record;

/// The schedule list and the schedule selected from it
#[derive(Debug, Clone)]
pub struct ScheduleList {
    pub latest: Schedule,
    pub schedules: Vec<Schedule>,
}

impl ScheduleList {
    /// Build from `schedules` rows and select the latest
    ///
    /// # Errors
    /// - [`crate::IngestError::NoDataAvailable`] for an empty list
    /// - [`crate::IngestError::MalformedPayload`] for a row without a code or date
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let schedules = records
            .into_iter()
            .map(Schedule::from_record)
            .collect::<Result<Vec<_>>>()?;
        let latest = latest_generation(schedules.iter())?.clone();
        Ok(Self { latest, schedules })
    }

    /// Rows for the `schedules` table, as returned by the API
    pub fn records(&self) -> Vec<Record> {
        self.schedules.iter().map(|s| s.record.clone()).collect()
    }
}

/// Fetch the schedule list and select the current schedule
pub async fn resolve_latest_schedule<S: TableSource + ?Sized>(source: &mut S) -> Result<ScheduleList> {
    info!("Getting list of active schedules");
    let records = source.fetch(SCHEDULES_ENDPOINT, None).await?.into_records();
    let list = ScheduleList::from_records(records)?;

    info!(
        schedule_code = %list.latest.code,
        effective_date = %list.latest.effective_date,
        schedules = list.schedules.len(),
        "Latest schedule resolved"
    );
    Ok(list)
}
