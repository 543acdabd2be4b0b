//! Conversion between stored visit timestamps and local calendar dates.
//!
//! Visit dates are written as 12:00:00.000 UTC of the chosen day and read
//! back in the viewer's zone. Any offset from -12:00 up to (but not
//! including) +12:00 maps the stored instant back onto the same day.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};

pub const VISIT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateNormalizer {
    offset: Option<FixedOffset>,
}

impl DateNormalizer {
    /// Uses the system time zone.
    pub fn local() -> Self {
        Self { offset: None }
    }

    pub fn fixed(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    pub fn to_local_date(&self, stored: &DateTime<Utc>) -> NaiveDate {
        match self.offset {
            Some(offset) => stored.with_timezone(&offset).date_naive(),
            None => stored.with_timezone(&Local).date_naive(),
        }
    }

    pub fn to_local_date_string(&self, stored: &DateTime<Utc>) -> String {
        format_visit_date(self.to_local_date(stored))
    }

    pub fn to_submission_timestamp(
        &self,
        local_date: &str,
    ) -> Result<DateTime<Utc>, chrono::ParseError> {
        let date = NaiveDate::parse_from_str(local_date.trim(), VISIT_DATE_FORMAT)?;
        Ok(noon_utc(date))
    }

    pub fn today(&self) -> NaiveDate {
        self.to_local_date(&Utc::now())
    }
}

pub fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::default()) + Duration::hours(12);
    Utc.from_utc_datetime(&naive)
}

pub fn format_visit_date(date: NaiveDate) -> String {
    date.format(VISIT_DATE_FORMAT).to_string()
}
