//! Period calculus: pure conversions between calendar dates and the period
//! identifiers of each fidelity.
//!
//! | Fidelity  | Format       | Example      |
//! |-----------|--------------|--------------|
//! | daily     | `YYYY-MM-DD` | `2025-01-15` |
//! | weekly    | `YYYY-Www`   | `2025-W03`   |
//! | monthly   | `YYYY-MM`    | `2025-01`    |
//! | quarterly | `YYYY-Qn`    | `2025-Q1`    |
//! | h1-h2     | `YYYY-Hn`    | `2025-H1`    |
//! | yearly    | `YYYY`       | `2025`       |
//!
//! Weekly periods follow ISO-8601 week numbering: week 1 is the week that
//! contains the year's first Thursday, so late-December and early-January
//! dates may belong to the neighbouring ISO year.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, Weekday};

use crate::error::PeriodError;

// ── Fidelity ──

/// Summary granularity, ordered finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    #[serde(rename = "h1-h2")]
    HalfYearly,
    Yearly,
}

impl Fidelity {
    pub const ALL: [Fidelity; 6] = [
        Fidelity::Daily,
        Fidelity::Weekly,
        Fidelity::Monthly,
        Fidelity::Quarterly,
        Fidelity::HalfYearly,
        Fidelity::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Fidelity::Daily => "daily",
            Fidelity::Weekly => "weekly",
            Fidelity::Monthly => "monthly",
            Fidelity::Quarterly => "quarterly",
            Fidelity::HalfYearly => "h1-h2",
            Fidelity::Yearly => "yearly",
        }
    }

    /// Position in the hierarchy, 0 for daily.
    pub fn rank(self) -> usize {
        self as usize
    }

    /// The next finer fidelity this one is distilled from. `None` for daily,
    /// which is built directly from collected data.
    pub fn source(self) -> Option<Fidelity> {
        match self {
            Fidelity::Daily => None,
            Fidelity::Weekly => Some(Fidelity::Daily),
            Fidelity::Monthly => Some(Fidelity::Weekly),
            Fidelity::Quarterly => Some(Fidelity::Monthly),
            Fidelity::HalfYearly => Some(Fidelity::Quarterly),
            Fidelity::Yearly => Some(Fidelity::HalfYearly),
        }
    }

    /// Human-readable period format, used in error messages.
    pub fn expected_format(self) -> &'static str {
        match self {
            Fidelity::Daily => "YYYY-MM-DD",
            Fidelity::Weekly => "YYYY-Www",
            Fidelity::Monthly => "YYYY-MM",
            Fidelity::Quarterly => "YYYY-Qn",
            Fidelity::HalfYearly => "YYYY-H1 or YYYY-H2",
            Fidelity::Yearly => "YYYY",
        }
    }

    /// Title-case label for rendered output.
    pub fn label(self) -> &'static str {
        match self {
            Fidelity::Daily => "Daily",
            Fidelity::Weekly => "Weekly",
            Fidelity::Monthly => "Monthly",
            Fidelity::Quarterly => "Quarterly",
            Fidelity::HalfYearly => "Half-Yearly",
            Fidelity::Yearly => "Yearly",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Fidelity::Daily => &DAILY_RE,
            Fidelity::Weekly => &WEEKLY_RE,
            Fidelity::Monthly => &MONTHLY_RE,
            Fidelity::Quarterly => &QUARTERLY_RE,
            Fidelity::HalfYearly => &HALF_RE,
            Fidelity::Yearly => &YEARLY_RE,
        }
    }
}

impl fmt::Display for Fidelity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fidelity {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Fidelity::Daily),
            "weekly" => Ok(Fidelity::Weekly),
            "monthly" => Ok(Fidelity::Monthly),
            "quarterly" => Ok(Fidelity::Quarterly),
            "h1-h2" | "half-yearly" => Ok(Fidelity::HalfYearly),
            "yearly" => Ok(Fidelity::Yearly),
            _ => Err(PeriodError::UnknownFidelity(s.to_string())),
        }
    }
}

// ── Patterns ──

static DAILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static WEEKLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{2})$").unwrap());
static MONTHLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(0[1-9]|1[0-2])$").unwrap());
static QUARTERLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static HALF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-H([12])$").unwrap());
static YEARLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").unwrap());

// ── Date range ──

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).whole_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", format_date(self.start), format_date(self.end))
    }
}

// ── Dates ──

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Strictly parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<Date, PeriodError> {
    let invalid = || PeriodError::InvalidDate(s.to_string());
    let caps = DAILY_RE.captures(s).ok_or_else(invalid)?;
    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u8 = caps[2].parse().map_err(|_| invalid())?;
    let day: u8 = caps[3].parse().map_err(|_| invalid())?;
    calendar_date(year, month, day).ok_or_else(invalid)
}

/// Serde adapter storing a [`Date`] as a `YYYY-MM-DD` string.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

fn calendar_date(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<Date> {
    let (next_year, next_month) = match month {
        Month::December => (year.checked_add(1)?, Month::January),
        m => (year, m.next()),
    };
    Date::from_calendar_date(next_year, next_month, 1)
        .ok()?
        .previous_day()
}

/// Shift by whole months, clamping the day to the target month's length.
fn add_months(date: Date, months: i32) -> Option<Date> {
    let index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 + months;
    let year = index.div_euclid(12);
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
    let last = last_day_of_month(year, month)?;
    Date::from_calendar_date(year, month, date.day().min(last.day())).ok()
}

/// Move `date` by `steps` units of `fidelity`.
fn shift(fidelity: Fidelity, date: Date, steps: i32) -> Option<Date> {
    let steps64 = i64::from(steps);
    match fidelity {
        Fidelity::Daily => date.checked_add(Duration::days(steps64)),
        Fidelity::Weekly => date.checked_add(Duration::weeks(steps64)),
        Fidelity::Monthly => add_months(date, steps),
        Fidelity::Quarterly => add_months(date, steps * 3),
        Fidelity::HalfYearly => add_months(date, steps * 6),
        Fidelity::Yearly => add_months(date, steps * 12),
    }
}

fn month_span(year: i32, first_month: u8, months: i32) -> Option<DateRange> {
    let start = calendar_date(year, first_month, 1)?;
    let end = add_months(start, months)?.previous_day()?;
    Some(DateRange::new(start, end))
}

// ── Periods ──

/// Validate `period` against the fidelity's exact format and return its
/// inclusive date range. Never coerces: anything that does not match the
/// pattern, or names a week/day that does not exist, is rejected.
pub fn parse_period(fidelity: Fidelity, period: &str) -> Result<DateRange, PeriodError> {
    let invalid = || PeriodError::InvalidPeriodFormat {
        fidelity,
        period: period.to_string(),
        expected: fidelity.expected_format(),
    };
    let caps = fidelity.pattern().captures(period).ok_or_else(invalid)?;
    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let part = |i: usize| -> Result<u8, PeriodError> {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)
    };

    let range = match fidelity {
        Fidelity::Daily => calendar_date(year, part(2)?, part(3)?).map(|d| DateRange::new(d, d)),
        Fidelity::Weekly => Date::from_iso_week_date(year, part(2)?, Weekday::Monday)
            .ok()
            .and_then(|start| {
                let end = start.checked_add(Duration::days(6))?;
                Some(DateRange::new(start, end))
            }),
        Fidelity::Monthly => month_span(year, part(2)?, 1),
        Fidelity::Quarterly => month_span(year, (part(2)? - 1) * 3 + 1, 3),
        Fidelity::HalfYearly => month_span(year, (part(2)? - 1) * 6 + 1, 6),
        Fidelity::Yearly => month_span(year, 1, 12),
    };
    range.ok_or_else(invalid)
}

/// Identifier of the `fidelity` period containing `date`.
pub fn period_for_date(date: Date, fidelity: Fidelity) -> String {
    let year = date.year();
    let month = u8::from(date.month());
    match fidelity {
        Fidelity::Daily => format_date(date),
        Fidelity::Weekly => {
            let (iso_year, week, _) = date.to_iso_week_date();
            format!("{iso_year:04}-W{week:02}")
        }
        Fidelity::Monthly => format!("{year:04}-{month:02}"),
        Fidelity::Quarterly => format!("{year:04}-Q{}", (month - 1) / 3 + 1),
        Fidelity::HalfYearly => format!("{year:04}-H{}", if month <= 6 { 1 } else { 2 }),
        Fidelity::Yearly => format!("{year:04}"),
    }
}

fn neighbour(fidelity: Fidelity, period: &str, steps: i32) -> Result<String, PeriodError> {
    let range = parse_period(fidelity, period)?;
    let shifted = shift(fidelity, range.start, steps).ok_or(PeriodError::OutOfRange)?;
    Ok(period_for_date(shifted, fidelity))
}

/// The period immediately before `period` at the same fidelity.
pub fn previous_period(fidelity: Fidelity, period: &str) -> Result<String, PeriodError> {
    neighbour(fidelity, period, -1)
}

/// The period immediately after `period` at the same fidelity.
pub fn next_period(fidelity: Fidelity, period: &str) -> Result<String, PeriodError> {
    neighbour(fidelity, period, 1)
}

/// Static hierarchy lookup; see [`Fidelity::source`].
pub fn source_fidelity(fidelity: Fidelity) -> Option<Fidelity> {
    fidelity.source()
}

/// Source-fidelity periods covering `period`, in calendar order, without
/// duplicates. Empty for daily.
///
/// Walks the range in source-sized steps from the start date, then adds the
/// period containing the end date: a month whose last days fall in a week the
/// 7-day walk stepped over is still fully covered.
pub fn source_periods(fidelity: Fidelity, period: &str) -> Result<Vec<String>, PeriodError> {
    let Some(source) = fidelity.source() else {
        return Ok(Vec::new());
    };
    let range = parse_period(fidelity, period)?;

    let mut periods: Vec<String> = Vec::new();
    let mut push = |p: String| {
        if !periods.contains(&p) {
            periods.push(p);
        }
    };
    let mut cursor = range.start;
    while cursor <= range.end {
        push(period_for_date(cursor, source));
        cursor = shift(source, cursor, 1).ok_or(PeriodError::OutOfRange)?;
    }
    push(period_for_date(range.end, source));
    Ok(periods)
}
