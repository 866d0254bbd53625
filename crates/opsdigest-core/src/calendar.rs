//! Local calendar arithmetic for reporting periods.
//!
//! Every value here is a plain calendar date. Nothing is ever routed through a
//! timestamp parser, so a date string can never drift by a day because of the
//! process timezone. "Today" is supplied by a [`Clock`], which keeps the
//! period functions pure and testable.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, OffsetDateTime, UtcOffset, Weekday};

use crate::error::DateError;

/// A calendar date with no time-of-day or offset component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDate(Date);

impl LocalDate {
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, DateError> {
        let invalid = || DateError::InvalidDate {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    /// Parses `YYYY-MM-DD` by splitting on `-` into integer components.
    pub fn parse(input: &str) -> Result<Self, DateError> {
        let invalid = || DateError::InvalidDate {
            value: input.to_owned(),
        };

        let mut parts = input.trim().split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;
        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }

    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> Month {
        self.0.month()
    }

    pub fn day(self) -> u8 {
        self.0.day()
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    /// Shifts the date by a signed number of days.
    pub fn add_days(self, days: i64) -> Result<Self, DateError> {
        self.0
            .checked_add(time::Duration::days(days))
            .map(Self)
            .ok_or_else(|| DateError::OutOfRange {
                value: self.to_string(),
                days,
            })
    }

    pub fn next_day(self) -> Result<Self, DateError> {
        self.add_days(1)
    }

    pub fn first_of_month(self) -> Self {
        // Day 1 is valid for every month.
        Self(self.0.replace_day(1).unwrap_or(self.0))
    }

    /// Number of days from `self` to `other`; negative when `other` is earlier.
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).whole_days()
    }
}

impl Display for LocalDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for LocalDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LocalDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocalDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Source of "now" in local calendar terms.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> LocalDate {
        LocalDate(self.now().date())
    }
}

/// Wall clock pinned to a fixed UTC offset.
///
/// The offset is resolved once at startup so that reading the clock never
/// depends on the process timezone database while worker threads are alive.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub const fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Clock frozen at a given local date and time, for tests and backfills.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: OffsetDateTime,
}

impl FixedClock {
    pub const fn new(now: OffsetDateTime) -> Self {
        Self { now }
    }

    /// Midnight of `date` at UTC.
    pub fn on(date: LocalDate) -> Self {
        Self {
            now: date.into_inner().midnight().assume_utc(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.now
    }
}

/// Today's local date shifted by `offset_days`, formatted `YYYY-MM-DD`.
pub fn format_date(clock: &dyn Clock, offset_days: i64) -> Result<String, DateError> {
    clock
        .today()
        .add_days(offset_days)
        .map(|date| date.to_string())
}

/// Every date from `start` to `end` inclusive, ascending.
pub fn date_range(start: &str, end: &str) -> Result<Vec<String>, DateError> {
    let start = LocalDate::parse(start)?;
    let end = LocalDate::parse(end)?;
    Ok(dates_between(start, end)?
        .into_iter()
        .map(|date| date.to_string())
        .collect())
}

/// Typed counterpart of [`date_range`].
pub fn dates_between(start: LocalDate, end: LocalDate) -> Result<Vec<LocalDate>, DateError> {
    if start > end {
        return Err(DateError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let mut dates = Vec::with_capacity(start.days_until(end) as usize + 1);
    let mut current = start;
    while current <= end {
        dates.push(current);
        if current == end {
            break;
        }
        current = current.next_day()?;
    }
    Ok(dates)
}

/// Inclusive date bounds of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub start: LocalDate,
    pub end: LocalDate,
}

/// Monday to Friday of the ISO week before the current one.
pub fn last_week_range(clock: &dyn Clock) -> Result<DateBounds, DateError> {
    let today = clock.today();
    // number_from_monday() maps Sunday to 7, so Sunday belongs to the week
    // that started six days earlier.
    let back_to_monday = i64::from(today.weekday().number_from_monday()) - 1;
    let current_monday = today.add_days(-back_to_monday)?;
    let start = current_monday.add_days(-7)?;
    let end = start.add_days(4)?;
    Ok(DateBounds { start, end })
}

/// First and last day of the previous calendar month, plus its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthRange {
    pub start: LocalDate,
    pub end: LocalDate,
    pub month_label: String,
}

pub fn last_month_range(clock: &dyn Clock, locale: Locale) -> Result<MonthRange, DateError> {
    let first_of_current = clock.today().first_of_month();
    let end = first_of_current.add_days(-1)?;
    let start = end.first_of_month();
    Ok(MonthRange {
        start,
        end,
        month_label: locale.month_label(start),
    })
}

/// Formats `YYYY-MM-DDT00:00:00Z` without consulting any timezone data.
pub fn iso_midnight_utc(date: LocalDate) -> String {
    format!("{date}T00:00:00Z")
}

/// Language used for human-facing period labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pt-br" | "pt_br" | "pt" => Some(Self::PtBr),
            "en-us" | "en_us" | "en" => Some(Self::EnUs),
            _ => None,
        }
    }

    pub fn month_label(self, date: LocalDate) -> String {
        let index = usize::from(u8::from(date.month())) - 1;
        match self {
            Self::PtBr => format!("{} de {}", PT_BR_MONTHS[index], date.year()),
            Self::EnUs => format!("{} {}", EN_US_MONTHS[index], date.year()),
        }
    }
}

const PT_BR_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

const EN_US_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Reporting cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl Display for PeriodKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous local-date range plus the label shown to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub kind: PeriodKind,
    pub start: LocalDate,
    pub end: LocalDate,
    pub label: String,
}

impl Period {
    pub fn new(
        kind: PeriodKind,
        start: LocalDate,
        end: LocalDate,
        label: impl Into<String>,
    ) -> Result<Self, DateError> {
        if start > end {
            return Err(DateError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            kind,
            start,
            end,
            label: label.into(),
        })
    }

    pub fn single_day(date: LocalDate) -> Self {
        Self {
            kind: PeriodKind::Daily,
            start: date,
            end: date,
            label: date.to_string(),
        }
    }

    pub fn previous_day(clock: &dyn Clock) -> Result<Self, DateError> {
        Ok(Self::single_day(clock.today().add_days(-1)?))
    }

    pub fn last_week(clock: &dyn Clock) -> Result<Self, DateError> {
        let bounds = last_week_range(clock)?;
        Self::new(
            PeriodKind::Weekly,
            bounds.start,
            bounds.end,
            format!("{} até {}", bounds.start, bounds.end),
        )
    }

    pub fn last_month(clock: &dyn Clock, locale: Locale) -> Result<Self, DateError> {
        let range = last_month_range(clock, locale)?;
        Self::new(PeriodKind::Monthly, range.start, range.end, range.month_label)
    }

    pub fn for_kind(kind: PeriodKind, clock: &dyn Clock, locale: Locale) -> Result<Self, DateError> {
        match kind {
            PeriodKind::Daily => Self::previous_day(clock),
            PeriodKind::Weekly => Self::last_week(clock),
            PeriodKind::Monthly => Self::last_month(clock, locale),
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn dates(&self) -> Result<Vec<LocalDate>, DateError> {
        dates_between(self.start, self.end)
    }

    pub fn day_count(&self) -> i64 {
        self.start.days_until(self.end) + 1
    }

    /// Label used to name the spreadsheet artifact.
    pub fn artifact_label(&self) -> String {
        match self.kind {
            PeriodKind::Weekly => format!("semana_{}_a_{}", self.start, self.end),
            PeriodKind::Daily | PeriodKind::Monthly => self.label.clone(),
        }
    }
}
