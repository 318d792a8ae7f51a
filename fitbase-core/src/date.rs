//! Date operand grammar
//!
//! Date filters accept literal days, symbolic days relative to "today", and
//! tagged array forms such as `["daysAgo", 3]` or `["exactDay", "2024-01-01"]`.
//! The `isWithin` operator takes a named period or a day count.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Symbolic day relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeDay {
    Today,
    Tomorrow,
    Yesterday,
    OneWeekAgo,
    OneWeekFromNow,
    OneMonthAgo,
    OneMonthFromNow,
}

impl RelativeDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeDay::Today => "today",
            RelativeDay::Tomorrow => "tomorrow",
            RelativeDay::Yesterday => "yesterday",
            RelativeDay::OneWeekAgo => "oneWeekAgo",
            RelativeDay::OneWeekFromNow => "oneWeekFromNow",
            RelativeDay::OneMonthAgo => "oneMonthAgo",
            RelativeDay::OneMonthFromNow => "oneMonthFromNow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(RelativeDay::Today),
            "tomorrow" => Some(RelativeDay::Tomorrow),
            "yesterday" => Some(RelativeDay::Yesterday),
            "oneWeekAgo" => Some(RelativeDay::OneWeekAgo),
            "oneWeekFromNow" => Some(RelativeDay::OneWeekFromNow),
            "oneMonthAgo" => Some(RelativeDay::OneMonthAgo),
            "oneMonthFromNow" => Some(RelativeDay::OneMonthFromNow),
            _ => None,
        }
    }

    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            RelativeDay::Today => today,
            RelativeDay::Tomorrow => add_days(today, 1),
            RelativeDay::Yesterday => sub_days(today, 1),
            RelativeDay::OneWeekAgo => sub_days(today, 7),
            RelativeDay::OneWeekFromNow => add_days(today, 7),
            RelativeDay::OneMonthAgo => today.checked_sub_months(Months::new(1)).unwrap_or(today),
            RelativeDay::OneMonthFromNow => {
                today.checked_add_months(Months::new(1)).unwrap_or(today)
            }
        }
    }
}

/// Operand of a date comparison (`=`, `!=`, `<`, `>`, `<=`, `>=`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOperand {
    Relative(RelativeDay),
    ExactDay(NaiveDate),
    ExactTimestamp(DateTime<Utc>),
    DaysAgo(u32),
    DaysFromNow(u32),
}

impl DateOperand {
    /// Parse a JSON operand. Array forms are `(tag, magnitudeOrDate)` pairs
    /// whose tag must be one of `exactDay`, `exactTimestamp`, `daysAgo`,
    /// `daysFromNow`.
    pub fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => {
                if let Some(relative) = RelativeDay::parse(s) {
                    return Ok(DateOperand::Relative(relative));
                }
                parse_iso_day(s)
                    .map(DateOperand::ExactDay)
                    .ok_or_else(|| format!("unknown relative date or ISO day: {}", s))
            }
            Value::Array(items) => {
                let (tag, arg) = tagged_pair(items)?;
                match tag {
                    "exactDay" => {
                        let s = arg.as_str().ok_or("exactDay expects a date string")?;
                        parse_iso_day(s)
                            .map(DateOperand::ExactDay)
                            .ok_or_else(|| format!("invalid ISO day: {}", s))
                    }
                    "exactTimestamp" => {
                        let s = arg.as_str().ok_or("exactTimestamp expects a timestamp string")?;
                        DateTime::parse_from_rfc3339(s)
                            .map(|ts| DateOperand::ExactTimestamp(ts.with_timezone(&Utc)))
                            .map_err(|e| format!("invalid timestamp {}: {}", s, e))
                    }
                    "daysAgo" => day_count(arg).map(DateOperand::DaysAgo),
                    "daysFromNow" => day_count(arg).map(DateOperand::DaysFromNow),
                    other => Err(format!("unknown date form: {}", other)),
                }
            }
            other => Err(format!("expected a date string or tagged array, got {}", kind_name(other))),
        }
    }

    /// Resolve to a calendar day relative to `today`.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            DateOperand::Relative(relative) => relative.resolve(today),
            DateOperand::ExactDay(day) => *day,
            DateOperand::ExactTimestamp(ts) => ts.date_naive(),
            DateOperand::DaysAgo(n) => sub_days(today, *n),
            DateOperand::DaysFromNow(n) => add_days(today, *n),
        }
    }
}

/// Named period accepted by `isWithin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithinPeriod {
    PastWeek,
    PastMonth,
    PastYear,
    NextWeek,
    NextMonth,
    NextYear,
    CurrentWeek,
    CurrentMonth,
    CurrentYear,
}

impl WithinPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pastWeek" => Some(WithinPeriod::PastWeek),
            "pastMonth" => Some(WithinPeriod::PastMonth),
            "pastYear" => Some(WithinPeriod::PastYear),
            "nextWeek" => Some(WithinPeriod::NextWeek),
            "nextMonth" => Some(WithinPeriod::NextMonth),
            "nextYear" => Some(WithinPeriod::NextYear),
            "currentWeek" => Some(WithinPeriod::CurrentWeek),
            "currentMonth" => Some(WithinPeriod::CurrentMonth),
            "currentYear" => Some(WithinPeriod::CurrentYear),
            _ => None,
        }
    }
}

/// Operand of `isWithin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithinOperand {
    Period(WithinPeriod),
    DaysAgo(u32),
    DaysFromNow(u32),
}

impl WithinOperand {
    /// Accepts a period name, `{"value": "daysAgo", "date": 3}` or `["daysAgo", 3]`.
    pub fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => WithinPeriod::parse(s)
                .map(WithinOperand::Period)
                .ok_or_else(|| format!("unknown isWithin period: {}", s)),
            Value::Object(map) => {
                let tag = map
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or("isWithin object needs a string `value`")?;
                let arg = map.get("date").ok_or("isWithin object needs a numeric `date`")?;
                Self::from_tag(tag, arg)
            }
            Value::Array(items) => {
                let (tag, arg) = tagged_pair(items)?;
                Self::from_tag(tag, arg)
            }
            other => Err(format!("expected a period or day count, got {}", kind_name(other))),
        }
    }

    fn from_tag(tag: &str, arg: &Value) -> Result<Self, String> {
        match tag {
            "daysAgo" => day_count(arg).map(WithinOperand::DaysAgo),
            "daysFromNow" => day_count(arg).map(WithinOperand::DaysFromNow),
            other => Err(format!("unknown isWithin form: {}", other)),
        }
    }

    /// Inclusive day range relative to `today`.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            WithinOperand::DaysAgo(n) => (sub_days(today, *n), today),
            WithinOperand::DaysFromNow(n) => (today, add_days(today, *n)),
            WithinOperand::Period(period) => match period {
                WithinPeriod::PastWeek => (sub_days(today, 7), today),
                WithinPeriod::PastMonth => (
                    today.checked_sub_months(Months::new(1)).unwrap_or(today),
                    today,
                ),
                WithinPeriod::PastYear => (
                    today.checked_sub_months(Months::new(12)).unwrap_or(today),
                    today,
                ),
                WithinPeriod::NextWeek => (today, add_days(today, 7)),
                WithinPeriod::NextMonth => (
                    today,
                    today.checked_add_months(Months::new(1)).unwrap_or(today),
                ),
                WithinPeriod::NextYear => (
                    today,
                    today.checked_add_months(Months::new(12)).unwrap_or(today),
                ),
                WithinPeriod::CurrentWeek => {
                    let start = sub_days(today, today.weekday().num_days_from_monday());
                    (start, add_days(start, 6))
                }
                WithinPeriod::CurrentMonth => {
                    let start = today.with_day(1).unwrap_or(today);
                    let end = start
                        .checked_add_months(Months::new(1))
                        .map(|next| sub_days(next, 1))
                        .unwrap_or(today);
                    (start, end)
                }
                WithinPeriod::CurrentYear => {
                    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                    let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                    (start, end)
                }
            },
        }
    }
}

/// Parse a stored cell value as a calendar day. Accepts `YYYY-MM-DD`,
/// RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS` timestamps.
pub fn parse_cell_day(s: &str) -> Option<NaiveDate> {
    if let Some(day) = parse_iso_day(s) {
        return Some(day);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

/// Parse a stored cell value as an instant, treating bare days as midnight UTC.
pub fn parse_cell_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    parse_cell_day(s)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_iso_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn tagged_pair(items: &[Value]) -> Result<(&str, &Value), String> {
    match items {
        [tag, arg] => tag
            .as_str()
            .map(|t| (t, arg))
            .ok_or_else(|| "first element must be a string tag".to_string()),
        _ => Err(format!("expected a [tag, value] pair, got {} elements", items.len())),
    }
}

fn day_count(value: &Value) -> Result<u32, String> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("expected a non-negative day count, got {}", value))
}

fn add_days(day: NaiveDate, n: u32) -> NaiveDate {
    day.checked_add_days(Days::new(u64::from(n))).unwrap_or(day)
}

fn sub_days(day: NaiveDate, n: u32) -> NaiveDate {
    day.checked_sub_days(Days::new(u64::from(n))).unwrap_or(day)
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
