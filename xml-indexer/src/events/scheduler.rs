//! Daily indexing schedule.

use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Weekday};

use crate::errors::EventBusError;

/// Interval between scheduled runs.
pub const SCHEDULE_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// When automatic indexing of all collections runs.
///
/// Days of the week are numbered 1 (Sunday) to 7 (Saturday). No days means
/// every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingSchedule {
    start_time: NaiveTime,
    days_of_week: Option<Vec<u8>>,
}

impl IndexingSchedule {
    pub fn new(start_time: NaiveTime, days_of_week: Option<Vec<u8>>) -> Result<Self, EventBusError> {
        if let Some(days) = &days_of_week {
            if let Some(day) = days.iter().find(|d| !(1..=7).contains(*d)) {
                return Err(EventBusError::invalid_schedule(format!(
                    "Value must be an integer from 1 to 7 but found {}",
                    day
                )));
            }
        }
        Ok(Self {
            start_time,
            days_of_week: days_of_week.filter(|days| !days.is_empty()),
        })
    }

    /// Parse a schedule from its textual form.
    ///
    /// # Arguments
    ///
    /// * `start_time` - Time of day in 24 hour `H:mm` form, e.g. `0:35` or `23:35`
    /// * `days_of_week` - Comma separated days, e.g. `1,3,5`; `None` or blank
    ///   for every day
    ///
    /// # Example
    ///
    /// ```
    /// use xml_indexer::events::IndexingSchedule;
    ///
    /// let schedule = IndexingSchedule::parse("2:15", Some("1, 7")).unwrap();
    /// assert_eq!(schedule.days_of_week(), Some(&[1, 7][..]));
    /// ```
    pub fn parse(start_time: &str, days_of_week: Option<&str>) -> Result<Self, EventBusError> {
        let time = NaiveTime::parse_from_str(start_time.trim(), "%H:%M").map_err(|e| {
            EventBusError::invalid_schedule(format!(
                "Error parsing start time '{}': {}",
                start_time, e
            ))
        })?;

        let days = match days_of_week.map(str::trim).filter(|d| !d.is_empty()) {
            None => None,
            Some(list) => Some(
                list.split(',')
                    .map(|day| {
                        day.trim().parse::<u8>().map_err(|_| {
                            EventBusError::invalid_schedule(format!(
                                "Error parsing days of week: '{}' is not an integer",
                                day.trim()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Self::new(time, days)
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn days_of_week(&self) -> Option<&[u8]> {
        self.days_of_week.as_deref()
    }

    /// First run at or after `now`: today at the start time, or tomorrow if
    /// that moment has already passed.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.start_time);
        if today < now {
            today + TimeDelta::days(1)
        } else {
            today
        }
    }

    /// Whether a tick falling on `weekday` should start indexing.
    pub fn should_run_on(&self, weekday: Weekday) -> bool {
        match &self.days_of_week {
            None => true,
            Some(days) => days
                .iter()
                .any(|d| u32::from(*d) == weekday.number_from_sunday()),
        }
    }

    /// Human readable list of the days the schedule runs on.
    pub fn describe_days(&self) -> String {
        match &self.days_of_week {
            None => "all days".to_string(),
            Some(days) => {
                let names: Vec<&str> = days.iter().map(|d| day_name(*d)).collect();
                format!("these days of the week: {}", names.join(", "))
            }
        }
    }
}

fn day_name(day: u8) -> &'static str {
    match day {
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        _ => "Saturday",
    }
}
