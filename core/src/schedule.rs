use crate::errors::JobValidationError;
use crate::utils::ordinal;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use std::fmt::{Display, Formatter};

#[allow(unused_imports)]
use crate::scheduler::JobScheduler;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// [`ScheduleOptions`] is the raw recurrence description attached to a job's options, exactly as
/// configuration code wrote it. Nothing is checked at construction, the batch runner validates
/// it into a [`Schedule`] right before the job is scheduled
///
/// # Fields
/// - ``recurrence`` one of ``daily``, ``weekly`` or ``monthly`` (case-insensitive, trimmed)
/// - ``day`` the day of the week (1 = Monday … 7 = Sunday) for weekly recurrences or the day of
///   the month (1-31) for monthly ones, ignored for daily recurrences
/// - ``time`` an ``hh:mm`` or ``hh:mm:ss`` string in local time
///
/// # Constructor(s)
/// [`ScheduleOptions::daily`], [`ScheduleOptions::weekly`] and [`ScheduleOptions::monthly`]
/// cover the three recurrence kinds, rust's struct initialization works as well
///
/// # See Also
/// - [`Schedule`]
/// - [`crate::job::JobOptions`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleOptions {
    pub recurrence: String,
    pub day: Option<i64>,
    pub time: String,
}

impl ScheduleOptions {
    pub fn daily(time: impl Into<String>) -> Self {
        Self {
            recurrence: "daily".to_string(),
            day: None,
            time: time.into(),
        }
    }

    pub fn weekly(day: i64, time: impl Into<String>) -> Self {
        Self {
            recurrence: "weekly".to_string(),
            day: Some(day),
            time: time.into(),
        }
    }

    pub fn monthly(day: i64, time: impl Into<String>) -> Self {
        Self {
            recurrence: "monthly".to_string(),
            day: Some(day),
            time: time.into(),
        }
    }
}

/// The recurrence kind of a validated [`Schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    /// ``day`` follows ISO numbering, 1 = Monday … 7 = Sunday
    Weekly { day: u32 },
    Monthly { day: u32 },
}

/// [`Schedule`] is a validated recurrence, the [`JobScheduler`] evaluates it once per second
/// against the local wall clock via [`Schedule::matches`]
///
/// # Constructor(s)
/// Only through [`TryFrom<&ScheduleOptions>`], which performs every range check and reports
/// the first violation as a [`JobValidationError`]
///
/// # See Also
/// - [`ScheduleOptions`]
/// - [`JobScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    recurrence: Recurrence,
    time: NaiveTime,
}

impl Schedule {
    pub fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Checks whether the schedule fires at the local wall-clock second ``at``
    ///
    /// # Arguments
    /// ``at`` is a local date and time, sub-second precision is ignored
    ///
    /// # Returns
    /// ``true`` when the hour, minute and second equal the schedule's time and, for weekly
    /// and monthly recurrences, the day of the week or of the month equals the schedule's day.
    /// A monthly day that a month does not have never matches in that month
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        let same_time = at.hour() == self.time.hour()
            && at.minute() == self.time.minute()
            && at.second() == self.time.second();

        if !same_time {
            return false;
        }

        match self.recurrence {
            Recurrence::Daily => true,
            Recurrence::Weekly { day } => at.weekday().number_from_monday() == day,
            Recurrence::Monthly { day } => at.day() == day,
        }
    }

    /// Whether some months are skipped entirely, which is the case for monthly days past 28
    pub fn skips_some_months(&self) -> bool {
        matches!(self.recurrence, Recurrence::Monthly { day } if day > 28)
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let time = self.time.format("%H:%M:%S");
        match self.recurrence {
            Recurrence::Daily => write!(f, "daily at {time}"),
            Recurrence::Weekly { day } => {
                let name = WEEKDAY_NAMES
                    .get(day.saturating_sub(1) as usize)
                    .copied()
                    .unwrap_or("?");
                write!(f, "weekly on {name} at {time}")
            }
            Recurrence::Monthly { day } => {
                write!(f, "on the {} of each month at {time}", ordinal(day))
            }
        }
    }
}

impl TryFrom<&ScheduleOptions> for Schedule {
    type Error = JobValidationError;

    fn try_from(options: &ScheduleOptions) -> Result<Self, Self::Error> {
        let recurrence = options.recurrence.trim().to_lowercase();
        if recurrence.is_empty() {
            return Err(JobValidationError::MissingRecurrence);
        }

        if !matches!(recurrence.as_str(), "daily" | "weekly" | "monthly") {
            return Err(JobValidationError::UnknownRecurrence(
                options.recurrence.clone(),
            ));
        }

        if options.time.trim().is_empty() {
            return Err(JobValidationError::MissingTime);
        }

        let time = parse_time(&options.time)
            .ok_or_else(|| JobValidationError::InvalidTime(options.time.clone()))?;

        let recurrence = match recurrence.as_str() {
            "weekly" => {
                let day = options.day.ok_or(JobValidationError::MissingDay)?;
                if !(1..=7).contains(&day) {
                    return Err(JobValidationError::WeekDayOutOfRange(day));
                }
                Recurrence::Weekly { day: day as u32 }
            }
            "monthly" => {
                let day = options.day.ok_or(JobValidationError::MissingDay)?;
                if !(1..=31).contains(&day) {
                    return Err(JobValidationError::MonthDayOutOfRange(day));
                }
                Recurrence::Monthly { day: day as u32 }
            }
            _ => Recurrence::Daily,
        };

        Ok(Self { recurrence, time })
    }
}

/// Parses ``hh:mm`` or ``hh:mm:ss``, an omitted second means ``:00``
fn parse_time(raw: &str) -> Option<NaiveTime> {
    let components = raw.trim().split(':').collect::<Vec<_>>();
    if !(2..=3).contains(&components.len()) {
        return None;
    }

    let mut values = [0u32; 3];
    for (value, component) in values.iter_mut().zip(&components) {
        if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        *value = component.parse().ok()?;
    }

    NaiveTime::from_hms_opt(values[0], values[1], values[2])
}
