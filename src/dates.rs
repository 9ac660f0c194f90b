//! Calendar-day helpers.
//!
//! Every date the engine stores or compares is a [`NaiveDate`] rendered as
//! `YYYY-MM-DD`. Timestamps coming from clients are collapsed to their UTC
//! calendar day before they reach any comparison.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a client-supplied date. Accepts `YYYY-MM-DD` or an RFC 3339
/// timestamp, which is normalized to its UTC day.
pub fn parse_day(raw: &str) -> anyhow::Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, DAY_FORMAT) {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| anyhow::anyhow!("invalid date: {raw}"))
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a stored `YYYY-MM-DD` column value.
pub fn parse_stored_day(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT)
        .map_err(|e| anyhow::anyhow!("corrupt stored date {s:?}: {e}"))
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(day: NaiveDate) -> u8 {
    day.weekday().num_days_from_sunday() as u8
}

/// Which occurrence of its weekday this day is within the month (1..=5).
pub fn week_of_month(day: NaiveDate) -> u8 {
    ((day.day() - 1) / 7 + 1) as u8
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Parse `YYYY-MM` into the first and last day of that month.
pub fn parse_month(raw: &str) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let (y, m) = raw
        .trim()
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("invalid month: {raw}"))?;
    let year: i32 = y.parse().map_err(|_| anyhow::anyhow!("invalid year in: {raw}"))?;
    let month: u32 = m.parse().map_err(|_| anyhow::anyhow!("invalid month in: {raw}"))?;
    let len = days_in_month(year, month).ok_or_else(|| anyhow::anyhow!("month out of range: {raw}"))?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow::anyhow!("month out of range: {raw}"))?;
    Ok((first, first + Duration::days(len as i64 - 1)))
}

/// Every day from `from` to `to`, inclusive.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

pub fn weekday_name(index: u8) -> &'static str {
    match index {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        _ => "Saturday",
    }
}

pub fn ordinal(n: u8) -> String {
    let suffix = match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
