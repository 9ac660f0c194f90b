use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::dates::{format_day, parse_stored_day};
use crate::models::{Booking, BookingStatus, GuestDetails, Holiday, Slot, WeekOffRule};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

// ── Slots ──

const SLOT_COLUMNS: &str = "id, name, start_time, end_time, quota, is_active";

fn parse_slot_row(row: &rusqlite::Row) -> rusqlite::Result<Slot> {
    Ok(Slot {
        id: row.get(0)?,
        name: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        quota: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
    })
}

pub fn list_active_slots(conn: &Connection) -> anyhow::Result<Vec<Slot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots WHERE is_active = 1 ORDER BY start_time ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], parse_slot_row)?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

pub fn get_active_slot(conn: &Connection, id: &str) -> anyhow::Result<Option<Slot>> {
    let slot = conn
        .query_row(
            &format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?1 AND is_active = 1"),
            params![id],
            parse_slot_row,
        )
        .optional()?;
    Ok(slot)
}

pub fn insert_slot(conn: &Connection, slot: &Slot) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO slots (id, name, start_time, end_time, quota, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            slot.id,
            slot.name,
            slot.start_time,
            slot.end_time,
            slot.quota,
            slot.is_active as i32,
        ],
    )?;
    Ok(())
}

/// Set the quota of every active slot, or of one slot when `slot_id` is given.
/// Returns the number of rows changed.
pub fn update_slot_quota(
    conn: &Connection,
    quota: i64,
    slot_id: Option<&str>,
) -> anyhow::Result<usize> {
    let now = now_timestamp();
    let count = match slot_id {
        Some(id) => conn.execute(
            "UPDATE slots SET quota = ?1, updated_at = ?2 WHERE id = ?3 AND is_active = 1",
            params![quota, now, id],
        )?,
        None => conn.execute(
            "UPDATE slots SET quota = ?1, updated_at = ?2 WHERE is_active = 1",
            params![quota, now],
        )?,
    };
    Ok(count)
}

// ── Holidays ──

const HOLIDAY_COLUMNS: &str = "id, name, date, is_active";

fn parse_holiday_row(row: &rusqlite::Row) -> anyhow::Result<Holiday> {
    let date_str: String = row.get(2)?;
    Ok(Holiday {
        id: row.get(0)?,
        name: row.get(1)?,
        date: parse_stored_day(&date_str)?,
        is_active: row.get::<_, i32>(3)? != 0,
    })
}

fn collect_holidays(
    stmt: &mut rusqlite::Statement,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Holiday>> {
    let rows = stmt.query_map(params, |row| Ok(parse_holiday_row(row)))?;
    let mut holidays = vec![];
    for row in rows {
        holidays.push(row??);
    }
    Ok(holidays)
}

pub fn insert_holiday(conn: &Connection, holiday: &Holiday) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO holidays (id, name, date, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            holiday.id,
            holiday.name,
            format_day(holiday.date),
            holiday.is_active as i32,
            now,
        ],
    )?;
    Ok(())
}

pub fn get_active_holiday(conn: &Connection, id: &str) -> anyhow::Result<Option<Holiday>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {HOLIDAY_COLUMNS} FROM holidays WHERE id = ?1 AND is_active = 1"
    ))?;
    Ok(collect_holidays(&mut stmt, params![id])?.into_iter().next())
}

pub fn find_active_holiday_on(conn: &Connection, day: NaiveDate) -> anyhow::Result<Option<Holiday>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {HOLIDAY_COLUMNS} FROM holidays WHERE date = ?1 AND is_active = 1"
    ))?;
    Ok(collect_holidays(&mut stmt, params![format_day(day)])?
        .into_iter()
        .next())
}

pub fn list_active_holidays(conn: &Connection) -> anyhow::Result<Vec<Holiday>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {HOLIDAY_COLUMNS} FROM holidays WHERE is_active = 1 ORDER BY date ASC"
    ))?;
    collect_holidays(&mut stmt, [])
}

pub fn active_holidays_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<Holiday>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {HOLIDAY_COLUMNS} FROM holidays
         WHERE is_active = 1 AND date >= ?1 AND date <= ?2 ORDER BY date ASC"
    ))?;
    collect_holidays(&mut stmt, params![format_day(from), format_day(to)])
}

pub fn update_holiday(
    conn: &Connection,
    id: &str,
    name: &str,
    date: NaiveDate,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE holidays SET name = ?1, date = ?2, updated_at = ?3 WHERE id = ?4 AND is_active = 1",
        params![name, format_day(date), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

pub fn deactivate_holiday(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE holidays SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        params![now_timestamp(), id],
    )?;
    Ok(count > 0)
}

// ── Week-off rules ──

const WEEKOFF_COLUMNS: &str = "id, weekday, weeks, valid_from, valid_to, is_active";

fn parse_weekoff_row(row: &rusqlite::Row) -> anyhow::Result<WeekOffRule> {
    let weeks_json: String = row.get(2)?;
    let valid_from: Option<String> = row.get(3)?;
    let valid_to: Option<String> = row.get(4)?;

    Ok(WeekOffRule {
        id: row.get(0)?,
        weekday: row.get(1)?,
        weeks: serde_json::from_str(&weeks_json)?,
        valid_from: valid_from.as_deref().map(parse_stored_day).transpose()?,
        valid_to: valid_to.as_deref().map(parse_stored_day).transpose()?,
        is_active: row.get::<_, i32>(5)? != 0,
    })
}

fn collect_weekoffs(
    stmt: &mut rusqlite::Statement,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<WeekOffRule>> {
    let rows = stmt.query_map(params, |row| Ok(parse_weekoff_row(row)))?;
    let mut rules = vec![];
    for row in rows {
        rules.push(row??);
    }
    Ok(rules)
}

pub fn insert_weekoff(conn: &Connection, rule: &WeekOffRule) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO weekoffs (id, weekday, weeks, valid_from, valid_to, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            rule.id,
            rule.weekday,
            serde_json::to_string(&rule.weeks)?,
            rule.valid_from.map(format_day),
            rule.valid_to.map(format_day),
            rule.is_active as i32,
            now,
        ],
    )?;
    Ok(())
}

pub fn get_active_weekoff(conn: &Connection, id: &str) -> anyhow::Result<Option<WeekOffRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WEEKOFF_COLUMNS} FROM weekoffs WHERE id = ?1 AND is_active = 1"
    ))?;
    Ok(collect_weekoffs(&mut stmt, params![id])?.into_iter().next())
}

pub fn find_active_weekoff_for_weekday(
    conn: &Connection,
    weekday: u8,
) -> anyhow::Result<Option<WeekOffRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WEEKOFF_COLUMNS} FROM weekoffs WHERE weekday = ?1 AND is_active = 1"
    ))?;
    Ok(collect_weekoffs(&mut stmt, params![weekday])?
        .into_iter()
        .next())
}

pub fn list_active_weekoffs(conn: &Connection) -> anyhow::Result<Vec<WeekOffRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WEEKOFF_COLUMNS} FROM weekoffs WHERE is_active = 1 ORDER BY weekday ASC"
    ))?;
    collect_weekoffs(&mut stmt, [])
}

pub fn update_weekoff(conn: &Connection, rule: &WeekOffRule) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE weekoffs SET weekday = ?1, weeks = ?2, valid_from = ?3, valid_to = ?4, updated_at = ?5
         WHERE id = ?6 AND is_active = 1",
        params![
            rule.weekday,
            serde_json::to_string(&rule.weeks)?,
            rule.valid_from.map(format_day),
            rule.valid_to.map(format_day),
            now_timestamp(),
            rule.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn deactivate_weekoff(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE weekoffs SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        params![now_timestamp(), id],
    )?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, token, booking_date, slot_id, status, name, email, phone, \
     court_case_no, vehicle_no, chalan_no, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    let created_at = booking.created_at.format(TIMESTAMP_FORMAT).to_string();
    let updated_at = booking.updated_at.format(TIMESTAMP_FORMAT).to_string();

    conn.execute(
        "INSERT INTO bookings (id, token, booking_date, slot_id, status, name, email, phone,
                               court_case_no, vehicle_no, chalan_no, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.token,
            format_day(booking.booking_date),
            booking.slot_id,
            booking.status.as_str(),
            booking.guest.name,
            booking.guest.email,
            booking.guest.phone,
            booking.guest.court_case_no,
            booking.guest.vehicle_no,
            booking.guest.chalan_no,
            created_at,
            updated_at,
        ],
    )?;
    Ok(())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let booking_date_str: String = row.get(2)?;
    let status_str: String = row.get(4)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    Ok(Booking {
        id: row.get(0)?,
        token: row.get(1)?,
        booking_date: parse_stored_day(&booking_date_str)?,
        slot_id: row.get(3)?,
        status: BookingStatus::parse(&status_str)?,
        guest: GuestDetails {
            name: row.get(5)?,
            email: row.get(6)?,
            phone: row.get(7)?,
            court_case_no: row.get(8)?,
            vehicle_no: row.get(9)?,
            chalan_no: row.get(10)?,
        },
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)?,
    })
}

fn find_booking_by(conn: &Connection, column: &str, value: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = ?1"),
        params![value],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    find_booking_by(conn, "id", id)
}

pub fn get_booking_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<Booking>> {
    find_booking_by(conn, "token", token)
}

/// Every booking recorded for the day, whatever its status.
pub fn count_bookings_on(conn: &Connection, day: NaiveDate) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE booking_date = ?1",
        params![format_day(day)],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Bookings holding capacity in a slot on a day (cancelled ones do not).
pub fn count_active_bookings(conn: &Connection, day: NaiveDate, slot_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE booking_date = ?1 AND slot_id = ?2 AND status != 'cancelled'",
        params![format_day(day), slot_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn active_booking_counts_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<HashMap<(NaiveDate, String), i64>> {
    let mut stmt = conn.prepare(
        "SELECT booking_date, slot_id, COUNT(*) FROM bookings
         WHERE booking_date >= ?1 AND booking_date <= ?2 AND status != 'cancelled'
         GROUP BY booking_date, slot_id",
    )?;
    let rows = stmt.query_map(params![format_day(from), format_day(to)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut counts = HashMap::new();
    for row in rows {
        let (day, slot_id, count) = row?;
        counts.insert((parse_stored_day(&day)?, slot_id), count);
    }
    Ok(counts)
}

/// Booking count per stored status. Statuses with no bookings are absent.
pub fn booking_counts_by_status(conn: &Connection) -> anyhow::Result<Vec<(BookingStatus, i64)>> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = vec![];
    for row in rows {
        let (status, count) = row?;
        counts.push((BookingStatus::parse(&status)?, count));
    }
    Ok(counts)
}

pub fn recent_bookings(conn: &Connection, limit: i64) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, rowid DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

// ── Day counters ──

/// Advance the serial counter for a day and return the new value.
///
/// The first call for a day seeds the counter from the bookings already on
/// record, so days booked before the counter existed continue their sequence.
/// Callers must hold a write transaction for the read-back to be race free.
pub fn next_day_serial(conn: &Connection, day: NaiveDate) -> anyhow::Result<i64> {
    let day = format_day(day);

    conn.execute(
        "INSERT INTO booking_day_counters (booking_date, last_serial)
         VALUES (?1, (SELECT COUNT(*) FROM bookings WHERE booking_date = ?1) + 1)
         ON CONFLICT(booking_date) DO UPDATE SET last_serial = last_serial + 1",
        params![day],
    )?;

    let serial: i64 = conn.query_row(
        "SELECT last_serial FROM booking_day_counters WHERE booking_date = ?1",
        params![day],
        |row| row.get(0),
    )?;
    Ok(serial)
}
