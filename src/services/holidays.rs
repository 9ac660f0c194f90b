use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::dates::{format_day, parse_day};
use crate::db::queries;
use crate::errors::{AppError, ConflictReason};
use crate::models::Holiday;
use crate::services::closure;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HolidayInput {
    pub name: Option<String>,
    pub date: Option<String>,
}

impl HolidayInput {
    fn validate(&self, today: NaiveDate) -> Result<(String, NaiveDate), AppError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::invalid("holiday name is required"))?;
        let raw = self
            .date
            .as_deref()
            .ok_or_else(|| AppError::invalid("holiday date is required"))?;
        let date = parse_day(raw).map_err(|e| AppError::invalid(e.to_string()))?;
        if date <= today {
            return Err(AppError::invalid("holiday date must be after today"));
        }
        Ok((name.to_string(), date))
    }
}

/// Reject a holiday date that is a week-off, already a holiday, or already
/// has bookings. `exclude_id` skips the holiday being moved.
fn check_date_is_free(
    conn: &Connection,
    date: NaiveDate,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    if let Some(rule) = closure::weekoff_on(conn, date)? {
        return Err(AppError::conflict(
            ConflictReason::Weekoff,
            format!("cannot add holiday on a weekly off day ({})", rule.label()),
        ));
    }

    if let Some(existing) = queries::find_active_holiday_on(conn, date)? {
        if exclude_id != Some(existing.id.as_str()) {
            return Err(AppError::conflict(
                ConflictReason::DuplicateHoliday,
                format!("a holiday already exists on {}", format_day(date)),
            ));
        }
    }

    if queries::count_bookings_on(conn, date)? > 0 {
        return Err(AppError::conflict(
            ConflictReason::BookingsExist,
            format!("cannot add holiday on {}: bookings exist", format_day(date)),
        ));
    }

    Ok(())
}

pub fn create_holiday(
    conn: &mut Connection,
    input: &HolidayInput,
    today: NaiveDate,
) -> Result<Holiday, AppError> {
    let (name, date) = input.validate(today)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    check_date_is_free(&tx, date, None)?;

    let holiday = Holiday {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        date,
        is_active: true,
    };
    queries::insert_holiday(&tx, &holiday)
        .with_context(|| format!("create_holiday date={}", format_day(date)))?;
    tx.commit()?;

    tracing::info!(id = %holiday.id, date = %holiday.date, "holiday created");
    Ok(holiday)
}

pub fn update_holiday(
    conn: &mut Connection,
    id: &str,
    input: &HolidayInput,
    today: NaiveDate,
) -> Result<Holiday, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = queries::get_active_holiday(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("holiday {id}")))?;
    if existing.date <= today {
        return Err(AppError::invalid("cannot update a holiday that has started"));
    }

    let (name, date) = input.validate(today)?;
    if date != existing.date {
        check_date_is_free(&tx, date, Some(id))?;
    }

    queries::update_holiday(&tx, id, &name, date)
        .with_context(|| format!("update_holiday id={id}"))?;
    tx.commit()?;

    tracing::info!(id, date = %date, "holiday updated");
    Ok(Holiday {
        id: existing.id,
        name,
        date,
        is_active: true,
    })
}

pub fn delete_holiday(conn: &Connection, id: &str, today: NaiveDate) -> Result<(), AppError> {
    let existing = queries::get_active_holiday(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("holiday {id}")))?;
    if existing.date <= today {
        return Err(AppError::invalid("cannot delete a holiday that has started"));
    }

    if !queries::deactivate_holiday(conn, id)? {
        return Err(AppError::NotFound(format!("holiday {id}")));
    }
    tracing::info!(id, "holiday deleted");
    Ok(())
}

pub fn list_holidays(conn: &Connection) -> Result<Vec<Holiday>, AppError> {
    Ok(queries::list_active_holidays(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::WeekOffRule;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn input(name: &str, date: &str) -> HolidayInput {
        HolidayInput {
            name: Some(name.to_string()),
            date: Some(date.to_string()),
        }
    }

    fn today() -> NaiveDate {
        d("2025-06-01")
    }

    fn every_tuesday(conn: &Connection) {
        queries::insert_weekoff(
            conn,
            &WeekOffRule {
                id: "tue".to_string(),
                weekday: 2,
                weeks: vec![],
                valid_from: None,
                valid_to: None,
                is_active: true,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_create_holiday() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("Founders Day", "2025-06-12"), today()).unwrap();
        assert_eq!(h.date, d("2025-06-12"));
        assert_eq!(list_holidays(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_create_rejects_missing_fields() {
        let mut conn = setup_db();
        let err = create_holiday(&mut conn, &HolidayInput::default(), today()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = create_holiday(&mut conn, &input("  ", "2025-06-12"), today()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = create_holiday(&mut conn, &input("X", "not-a-date"), today()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_create_rejects_today_and_past() {
        let mut conn = setup_db();
        for date in ["2025-06-01", "2025-05-20"] {
            let err = create_holiday(&mut conn, &input("X", date), today()).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{date}");
        }
    }

    #[test]
    fn test_create_on_weekoff_conflicts() {
        let mut conn = setup_db();
        every_tuesday(&conn);
        // 2025-06-10 is a Tuesday
        let err = create_holiday(&mut conn, &input("X", "2025-06-10"), today()).unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict {
                reason: ConflictReason::Weekoff,
                ..
            }
        ));
        assert!(list_holidays(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_create_duplicate_conflicts() {
        let mut conn = setup_db();
        create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        let err = create_holiday(&mut conn, &input("B", "2025-06-12T10:00:00Z"), today()).unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict {
                reason: ConflictReason::DuplicateHoliday,
                ..
            }
        ));
    }

    #[test]
    fn test_create_on_booked_day_conflicts() {
        let mut conn = setup_db();
        let now = chrono::Utc::now().naive_utc();
        queries::insert_booking(
            &conn,
            &crate::models::Booking {
                id: "b1".to_string(),
                token: "20250612-T-001-LOK".to_string(),
                booking_date: d("2025-06-12"),
                slot_id: "morning".to_string(),
                status: crate::models::BookingStatus::Pending,
                guest: Default::default(),
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();

        let err = create_holiday(&mut conn, &input("X", "2025-06-12"), today()).unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict {
                reason: ConflictReason::BookingsExist,
                ..
            }
        ));
    }

    #[test]
    fn test_update_moves_holiday() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        let updated = update_holiday(&mut conn, &h.id, &input("A2", "2025-06-13"), today()).unwrap();
        assert_eq!(updated.name, "A2");
        assert_eq!(updated.date, d("2025-06-13"));

        assert!(queries::find_active_holiday_on(&conn, d("2025-06-12")).unwrap().is_none());
        assert!(queries::find_active_holiday_on(&conn, d("2025-06-13")).unwrap().is_some());
    }

    #[test]
    fn test_update_rename_same_day_skips_conflict_checks() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        let updated = update_holiday(&mut conn, &h.id, &input("Renamed", "2025-06-12"), today()).unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[test]
    fn test_update_onto_weekoff_conflicts() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        every_tuesday(&conn);
        let err = update_holiday(&mut conn, &h.id, &input("A", "2025-06-17"), today()).unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let mut conn = setup_db();
        let err = update_holiday(&mut conn, "missing", &input("A", "2025-06-12"), today()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_past_holiday_is_frozen() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        let later = d("2025-06-20");

        let err = update_holiday(&mut conn, &h.id, &input("A", "2025-06-25"), later).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = delete_holiday(&conn, &h.id, later).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_holiday_is_frozen_on_its_own_day() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        let same_day = d("2025-06-12");

        let err = update_holiday(&mut conn, &h.id, &input("A", "2025-06-25"), same_day).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = delete_holiday(&conn, &h.id, same_day).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(list_holidays(&conn).unwrap().len(), 1);

        // the day before it is still editable
        delete_holiday(&conn, &h.id, d("2025-06-11")).unwrap();
    }

    #[test]
    fn test_delete_is_soft() {
        let mut conn = setup_db();
        let h = create_holiday(&mut conn, &input("A", "2025-06-12"), today()).unwrap();
        delete_holiday(&conn, &h.id, today()).unwrap();
        assert!(list_holidays(&conn).unwrap().is_empty());

        let err = delete_holiday(&conn, &h.id, today()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM holidays", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);

        // the date is free again
        create_holiday(&mut conn, &input("B", "2025-06-12"), today()).unwrap();
    }
}
