use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::dates::{parse_day, weekday_name};
use crate::db::queries;
use crate::errors::{AppError, ConflictReason};
use crate::models::WeekOffRule;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeekOffInput {
    pub weekday: Option<i64>,
    #[serde(default)]
    pub weeks: Vec<i64>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

struct ValidWeekOff {
    weekday: u8,
    weeks: Vec<u8>,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
}

impl WeekOffInput {
    fn validate(&self) -> Result<ValidWeekOff, AppError> {
        let weekday = self
            .weekday
            .ok_or_else(|| AppError::invalid("weekday is required"))?;
        if !(0..=6).contains(&weekday) {
            return Err(AppError::invalid(
                "weekday must be between 0 (Sunday) and 6 (Saturday)",
            ));
        }

        if let Some(bad) = self.weeks.iter().find(|w| !(1..=5).contains(*w)) {
            return Err(AppError::invalid(format!(
                "weeks must be numbers between 1 and 5, got {bad}"
            )));
        }
        let mut weeks: Vec<u8> = self.weeks.iter().map(|w| *w as u8).collect();
        weeks.sort_unstable();
        weeks.dedup();

        let parse = |raw: &Option<String>| {
            raw.as_deref()
                .map(parse_day)
                .transpose()
                .map_err(|e| AppError::invalid(e.to_string()))
        };
        let valid_from = parse(&self.valid_from)?;
        let valid_to = parse(&self.valid_to)?;
        match (valid_from, valid_to) {
            (Some(from), Some(to)) if from > to => {
                return Err(AppError::invalid("valid_from cannot be after valid_to"));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::invalid(
                    "valid_from and valid_to must be given together",
                ));
            }
            _ => {}
        }

        Ok(ValidWeekOff {
            weekday: weekday as u8,
            weeks,
            valid_from,
            valid_to,
        })
    }
}

fn ensure_weekday_free(conn: &Connection, weekday: u8, exclude_id: Option<&str>) -> Result<(), AppError> {
    if let Some(existing) = queries::find_active_weekoff_for_weekday(conn, weekday)? {
        if exclude_id != Some(existing.id.as_str()) {
            return Err(AppError::conflict(
                ConflictReason::DuplicateWeekoff,
                format!("a week off already exists for {}", weekday_name(weekday)),
            ));
        }
    }
    Ok(())
}

/// Create a week-off rule. Existing holidays do not block it.
pub fn create_weekoff(conn: &mut Connection, input: &WeekOffInput) -> Result<WeekOffRule, AppError> {
    let valid = input.validate()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_weekday_free(&tx, valid.weekday, None)?;

    let rule = WeekOffRule {
        id: uuid::Uuid::new_v4().to_string(),
        weekday: valid.weekday,
        weeks: valid.weeks,
        valid_from: valid.valid_from,
        valid_to: valid.valid_to,
        is_active: true,
    };
    queries::insert_weekoff(&tx, &rule)
        .with_context(|| format!("create_weekoff weekday={}", rule.weekday))?;
    tx.commit()?;

    tracing::info!(id = %rule.id, label = %rule.label(), "week off created");
    Ok(rule)
}

pub fn update_weekoff(
    conn: &mut Connection,
    id: &str,
    input: &WeekOffInput,
) -> Result<WeekOffRule, AppError> {
    let valid = input.validate()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::get_active_weekoff(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("week off {id}")))?;
    ensure_weekday_free(&tx, valid.weekday, Some(id))?;

    let rule = WeekOffRule {
        id: id.to_string(),
        weekday: valid.weekday,
        weeks: valid.weeks,
        valid_from: valid.valid_from,
        valid_to: valid.valid_to,
        is_active: true,
    };
    queries::update_weekoff(&tx, &rule).with_context(|| format!("update_weekoff id={id}"))?;
    tx.commit()?;

    tracing::info!(id, label = %rule.label(), "week off updated");
    Ok(rule)
}

pub fn delete_weekoff(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::deactivate_weekoff(conn, id)? {
        return Err(AppError::NotFound(format!("week off {id}")));
    }
    tracing::info!(id, "week off deleted");
    Ok(())
}

pub fn list_weekoffs(conn: &Connection) -> Result<Vec<WeekOffRule>, AppError> {
    Ok(queries::list_active_weekoffs(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::holidays::{self, HolidayInput};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn input(weekday: i64, weeks: &[i64]) -> WeekOffInput {
        WeekOffInput {
            weekday: Some(weekday),
            weeks: weeks.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_normalizes_weeks() {
        let mut conn = setup_db();
        let rule = create_weekoff(&mut conn, &input(6, &[4, 2, 2])).unwrap();
        assert_eq!(rule.weeks, vec![2, 4]);
        assert_eq!(list_weekoffs(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_values() {
        let mut conn = setup_db();
        for bad in [input(7, &[]), input(-1, &[]), input(0, &[0]), input(0, &[6])] {
            let err = create_weekoff(&mut conn, &bad).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }

        let err = create_weekoff(&mut conn, &WeekOffInput::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_validity_window_checks() {
        let mut conn = setup_db();
        let mut only_from = input(1, &[]);
        only_from.valid_from = Some("2025-06-01".to_string());
        assert!(matches!(
            create_weekoff(&mut conn, &only_from).unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let mut reversed = input(1, &[]);
        reversed.valid_from = Some("2025-07-01".to_string());
        reversed.valid_to = Some("2025-06-01".to_string());
        assert!(matches!(
            create_weekoff(&mut conn, &reversed).unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let mut ok = input(1, &[]);
        ok.valid_from = Some("2025-06-01".to_string());
        ok.valid_to = Some("2025-07-01".to_string());
        let rule = create_weekoff(&mut conn, &ok).unwrap();
        assert!(rule.valid_from.is_some());
    }

    #[test]
    fn test_one_active_rule_per_weekday() {
        let mut conn = setup_db();
        create_weekoff(&mut conn, &input(0, &[])).unwrap();
        let err = create_weekoff(&mut conn, &input(0, &[1])).unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict {
                reason: ConflictReason::DuplicateWeekoff,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_frees_weekday() {
        let mut conn = setup_db();
        let rule = create_weekoff(&mut conn, &input(0, &[])).unwrap();
        delete_weekoff(&conn, &rule.id).unwrap();
        assert!(matches!(delete_weekoff(&conn, &rule.id).unwrap_err(), AppError::NotFound(_)));
        create_weekoff(&mut conn, &input(0, &[2])).unwrap();
    }

    #[test]
    fn test_update_rule() {
        let mut conn = setup_db();
        let sunday = create_weekoff(&mut conn, &input(0, &[])).unwrap();
        create_weekoff(&mut conn, &input(6, &[])).unwrap();

        // same weekday, new weeks
        let updated = update_weekoff(&mut conn, &sunday.id, &input(0, &[1, 3])).unwrap();
        assert_eq!(updated.weeks, vec![1, 3]);

        // moving onto Saturday collides with the other rule
        let err = update_weekoff(&mut conn, &sunday.id, &input(6, &[])).unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let err = update_weekoff(&mut conn, "missing", &input(3, &[])).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_existing_holiday_does_not_block_weekoff() {
        let mut conn = setup_db();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        holidays::create_holiday(
            &mut conn,
            &HolidayInput {
                name: Some("Tuesday holiday".to_string()),
                date: Some("2025-06-10".to_string()),
            },
            today,
        )
        .unwrap();

        create_weekoff(&mut conn, &input(2, &[])).unwrap();
    }
}
