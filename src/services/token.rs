//! Queue tokens: `{YYYYMMDD}-{weekday letter}-{serial}-LOK`.

use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::dates::weekday_index;
use crate::db::queries;

pub const TOKEN_SUFFIX: &str = "LOK";

/// Sunday..Saturday. Tuesday/Thursday and Sunday/Saturday share a letter.
const WEEKDAY_LETTERS: [char; 7] = ['S', 'M', 'T', 'W', 'T', 'F', 'S'];

pub fn weekday_letter(day: NaiveDate) -> char {
    WEEKDAY_LETTERS[weekday_index(day) as usize]
}

/// The serial is zero-padded to three digits and widens beyond 999.
pub fn format_token(day: NaiveDate, serial: i64) -> String {
    format!(
        "{}-{}-{:03}-{}",
        day.format("%Y%m%d"),
        weekday_letter(day),
        serial,
        TOKEN_SUFFIX
    )
}

/// Mint the next token for `day`.
///
/// Must run inside a write transaction so the counter bump and the booking
/// insert that follows commit together.
pub fn generate(conn: &Connection, day: NaiveDate) -> anyhow::Result<String> {
    let serial = queries::next_day_serial(conn, day)
        .with_context(|| format!("next serial for {day}"))?;
    Ok(format_token(day, serial))
}
