//! Wall-clock triggers for the three report cadences.
//!
//! Each trigger is a cron expression (seconds first, as `tokio-cron-scheduler`
//! reads them) evaluated in the offset of the instant it is asked about.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use cron::Schedule;
use time::{Duration, OffsetDateTime};

use crate::calendar::PeriodKind;
use crate::error::DateError;

/// When each report runs, in the configured local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// 06:00, Tuesday to Saturday (covers the previous business day).
    Daily,
    /// Saturday 06:15.
    Weekly,
    /// 06:00 on the first day of the month.
    Monthly,
}

impl Trigger {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn kind(self) -> PeriodKind {
        match self {
            Self::Daily => PeriodKind::Daily,
            Self::Weekly => PeriodKind::Weekly,
            Self::Monthly => PeriodKind::Monthly,
        }
    }

    pub const fn cron(self) -> &'static str {
        match self {
            Self::Daily => "0 0 6 * * Tue-Sat",
            Self::Weekly => "0 15 6 * * Sat",
            Self::Monthly => "0 0 6 1 * *",
        }
    }

    fn schedule(self) -> Result<Schedule, DateError> {
        Schedule::from_str(self.cron()).map_err(|error| DateError::InvalidSchedule {
            expression: self.cron(),
            reason: error.to_string(),
        })
    }

    /// First firing strictly after `now`, in `now`'s offset.
    pub fn next_after(self, now: OffsetDateTime) -> Result<OffsetDateTime, DateError> {
        let out_of_range = || DateError::OutOfRange {
            value: now.date().to_string(),
            days: 0,
        };
        let offset = FixedOffset::east_opt(now.offset().whole_seconds()).ok_or_else(out_of_range)?;
        let local = DateTime::from_timestamp(now.unix_timestamp(), now.nanosecond())
            .ok_or_else(out_of_range)?
            .with_timezone(&offset);

        let next = self
            .schedule()?
            .after(&local)
            .next()
            .ok_or_else(out_of_range)?;
        OffsetDateTime::from_unix_timestamp(next.timestamp())
            .map(|at| at.to_offset(now.offset()))
            .map_err(|_| out_of_range())
    }

    /// Whether the expression fires exactly at `at`, to the second.
    pub fn fires_at(self, at: OffsetDateTime) -> Result<bool, DateError> {
        let at = at.replace_nanosecond(0).map_err(|_| DateError::OutOfRange {
            value: at.date().to_string(),
            days: 0,
        })?;
        Ok(self.next_after(at - Duration::SECOND)? == at)
    }
}

/// Earliest upcoming trigger. Ties go to the cadence listed first.
pub fn next_trigger(now: OffsetDateTime) -> Result<(Trigger, OffsetDateTime), DateError> {
    let mut best: Option<(Trigger, OffsetDateTime)> = None;
    for trigger in Trigger::ALL {
        let at = trigger.next_after(now)?;
        if best.map_or(true, |(_, current)| at < current) {
            best = Some((trigger, at));
        }
    }
    best.ok_or_else(|| DateError::OutOfRange {
        value: now.date().to_string(),
        days: 0,
    })
}

/// Every trigger that fires exactly at `at`.
pub fn due_at(at: OffsetDateTime) -> Result<Vec<Trigger>, DateError> {
    let mut due = Vec::new();
    for trigger in Trigger::ALL {
        if trigger.fires_at(at)? {
            due.push(trigger);
        }
    }
    Ok(due)
}
