use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};

use crate::dates::{days_between, format_day, parse_month};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{DayAvailability, Slot, SlotAvailability};
use crate::services::closure;

/// Per-day, per-slot capacity for every day from `from` to `to` inclusive.
///
/// Slots, holidays, week-off rules and booking counts are each read once for
/// the whole range. Quotas are always read fresh from the store.
pub fn availability(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
    slot_filter: Option<&str>,
    max_days: u32,
) -> Result<Vec<DayAvailability>, AppError> {
    if from > to {
        return Err(AppError::invalid("range start must not be after its end"));
    }
    let span = (to - from).num_days() + 1;
    if span > max_days as i64 {
        return Err(AppError::invalid(format!(
            "range covers {span} days, at most {max_days} allowed"
        )));
    }

    let slots = selected_slots(conn, slot_filter)?;
    let range = format!("{}..{}", format_day(from), format_day(to));
    let holidays: HashMap<NaiveDate, _> = queries::active_holidays_between(conn, from, to)
        .with_context(|| format!("availability holidays {range}"))?
        .into_iter()
        .map(|h| (h.date, h))
        .collect();
    let rules = queries::list_active_weekoffs(conn)
        .with_context(|| format!("availability weekoffs {range}"))?;
    let counts = queries::active_booking_counts_between(conn, from, to)
        .with_context(|| format!("availability counts {range}"))?;

    let days = days_between(from, to)
        .into_iter()
        .map(|day| {
            let status = closure::resolve(day, holidays.get(&day), &rules);
            let slots = slots
                .iter()
                .map(|slot| {
                    let booked = counts
                        .get(&(day, slot.id.clone()))
                        .copied()
                        .unwrap_or(0);
                    SlotAvailability::compute(slot, booked, status.closed)
                })
                .collect();
            DayAvailability {
                date: day,
                is_closed: status.closed,
                blocked_reason: status.reason,
                label: status.label,
                slots,
            }
        })
        .collect();

    Ok(days)
}

/// Whole-month grid for a `YYYY-MM` month.
pub fn month_availability(
    conn: &Connection,
    month: &str,
    slot_filter: Option<&str>,
    max_days: u32,
) -> Result<Vec<DayAvailability>, AppError> {
    let (first, last) = parse_month(month).map_err(|e| AppError::invalid(e.to_string()))?;
    availability(conn, first, last, slot_filter, max_days)
}

/// Rolling window of `days` days starting at `start`.
pub fn window_availability(
    conn: &Connection,
    start: NaiveDate,
    days: u32,
    slot_filter: Option<&str>,
    max_days: u32,
) -> Result<Vec<DayAvailability>, AppError> {
    if days == 0 {
        return Err(AppError::invalid("window must cover at least one day"));
    }
    let end = start + Duration::days(days as i64 - 1);
    availability(conn, start, end, slot_filter, max_days)
}

/// Remaining capacity of one slot on one day. Does not consider closures.
pub fn slot_availability(conn: &Connection, day: NaiveDate, slot: &Slot) -> anyhow::Result<SlotAvailability> {
    let booked = queries::count_active_bookings(conn, day, &slot.id)
        .with_context(|| format!("count bookings date={} slot={}", format_day(day), slot.id))?;
    Ok(SlotAvailability::compute(slot, booked, false))
}

pub fn list_slots(conn: &Connection) -> Result<Vec<Slot>, AppError> {
    Ok(queries::list_active_slots(conn)?)
}

/// Set the quota on every active slot, or on one slot. Returns rows changed.
pub fn update_quota(
    conn: &mut Connection,
    quota: i64,
    slot_id: Option<&str>,
) -> Result<usize, AppError> {
    if quota < 0 {
        return Err(AppError::invalid("quota must not be negative"));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let changed = queries::update_slot_quota(&tx, quota, slot_id)
        .with_context(|| format!("update_quota quota={quota} slot={slot_id:?}"))?;
    if changed == 0 {
        return Err(AppError::NotFound(match slot_id {
            Some(id) => format!("active slot {id}"),
            None => "no active slots".to_string(),
        }));
    }
    tx.commit()?;

    tracing::info!(quota, changed, slot_id = ?slot_id, "slot quota updated");
    Ok(changed)
}

fn selected_slots(conn: &Connection, slot_filter: Option<&str>) -> Result<Vec<Slot>, AppError> {
    match slot_filter {
        Some(id) => {
            let slot = queries::get_active_slot(conn, id)?
                .ok_or_else(|| AppError::NotFound(format!("slot {id}")))?;
            Ok(vec![slot])
        }
        None => Ok(queries::list_active_slots(conn)?),
    }
}
