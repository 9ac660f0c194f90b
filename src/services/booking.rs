use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{NaiveDate, SubsecRound, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::dates::{format_day, parse_day};
use crate::db::queries;
use crate::errors::{AppError, ConflictReason};
use crate::models::{Booking, BookingStats, BookingStatus, GuestDetails, Slot};
use crate::services::{capacity, closure, token};

/// Insert attempts before giving up on a token collision.
const MAX_TOKEN_ATTEMPTS: usize = 3;

const DEFAULT_RECENT: i64 = 5;
const MAX_RECENT: i64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(alias = "date")]
    pub booking_date: Option<String>,
    pub slot_id: Option<String>,
    #[serde(flatten)]
    pub guest: GuestDetails,
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::invalid(format!("{field} is required")))
}

fn is_token_collision(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("bookings.token")
    )
}

/// Reject `day`/`slot_id` when the day is closed or the slot has no room left.
/// Callers hold a write transaction so the answer stays true until they commit.
fn ensure_bookable(conn: &Connection, day: NaiveDate, slot_id: &str) -> Result<Slot, AppError> {
    let status = closure::is_closed(conn, day)
        .with_context(|| format!("closure check date={day}"))?;
    if let Some(reason) = status.reason.filter(|_| status.closed) {
        tracing::info!(date = %day, reason = ?reason, "booking rejected: day closed");
        return Err(AppError::conflict(
            reason.into(),
            format!(
                "cannot book {}: {}",
                format_day(day),
                status.label.unwrap_or_default()
            ),
        ));
    }

    let slot = queries::get_active_slot(conn, slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))?;

    let remaining = capacity::slot_availability(conn, day, &slot)?;
    if remaining.available == 0 {
        tracing::info!(date = %day, slot = %slot.id, quota = slot.quota, "booking rejected: slot full");
        return Err(AppError::conflict(
            ConflictReason::SlotFull,
            format!("{} on {} is fully booked", slot.name, format_day(day)),
        ));
    }

    Ok(slot)
}

/// Validate a booking request and persist it.
///
/// Everything from the closure check to the insert runs in one IMMEDIATE
/// transaction, so concurrent requests for the same day see each other's
/// bookings and never share a serial. A rejection rolls back: no token is
/// consumed and nothing is written.
pub fn create_booking(
    conn: &mut Connection,
    req: &BookingRequest,
    today: NaiveDate,
) -> Result<Booking, AppError> {
    let raw_date = required(req.booking_date.as_deref(), "booking_date")?;
    let day = parse_day(raw_date).map_err(|e| AppError::invalid(e.to_string()))?;
    if day < today {
        return Err(AppError::invalid("cannot create booking for a past date"));
    }
    let slot_id = required(req.slot_id.as_deref(), "slot_id")?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let slot = ensure_bookable(&tx, day, slot_id)?;

    let now = Utc::now().naive_utc().trunc_subsecs(0);
    let mut booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        token: String::new(),
        booking_date: day,
        slot_id: slot.id.clone(),
        status: BookingStatus::Pending,
        guest: req.guest.clone(),
        created_at: now,
        updated_at: now,
    };

    for attempt in 1..=MAX_TOKEN_ATTEMPTS {
        booking.token = token::generate(&tx, day)?;
        match queries::insert_booking(&tx, &booking) {
            Ok(()) => {
                tx.commit()?;
                tracing::info!(id = %booking.id, token = %booking.token, slot = %booking.slot_id, "booking created");
                return Ok(booking);
            }
            Err(e) if is_token_collision(&e) => {
                tracing::warn!(token = %booking.token, attempt, "token already taken, retrying");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("create_booking insert date={day} slot={slot_id}"))
                    .into());
            }
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "create_booking: no free token for {day} after {MAX_TOKEN_ATTEMPTS} attempts"
    )))
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn get_booking_by_token(conn: &Connection, token: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_token(conn, token)?
        .ok_or_else(|| AppError::NotFound(format!("booking with token {token}")))
}

/// Change a booking's status. Cancelling releases its capacity; its token
/// serial stays used. Bringing a cancelled booking back has to fit the day
/// and slot again, as a new booking would.
pub fn set_status(
    conn: &mut Connection,
    id: &str,
    status: BookingStatus,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current = get_booking(&tx, id)?;
    if current.status == BookingStatus::Cancelled && status != BookingStatus::Cancelled {
        ensure_bookable(&tx, current.booking_date, &current.slot_id)?;
    }

    if !queries::update_booking_status(&tx, id, status)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    let updated = get_booking(&tx, id)?;
    tx.commit()?;

    tracing::info!(id, from = current.status.as_str(), to = status.as_str(), "booking status changed");
    Ok(updated)
}

/// Totals per status plus the `recent` latest bookings (default 5, at most 50).
pub fn stats(conn: &Connection, recent: Option<i64>) -> Result<BookingStats, AppError> {
    let limit = recent.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);

    let mut by_status: BTreeMap<BookingStatus, i64> =
        BookingStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for (status, count) in queries::booking_counts_by_status(conn).context("booking stats counts")? {
        by_status.insert(status, count);
    }

    Ok(BookingStats {
        total: by_status.values().sum(),
        by_status,
        recent: queries::recent_bookings(conn, limit).context("booking stats recent")?,
    })
}
