use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{ClosureReason, ClosureStatus, Holiday, WeekOffRule};

/// Decide whether `day` is closed, given the holiday on that day (if any)
/// and the active week-off rules. A holiday wins over a week-off.
pub fn resolve(day: NaiveDate, holiday: Option<&Holiday>, rules: &[WeekOffRule]) -> ClosureStatus {
    if let Some(h) = holiday.filter(|h| h.is_active && h.date == day) {
        return ClosureStatus::closed(ClosureReason::Holiday, h.name.clone());
    }
    if let Some(rule) = rules.iter().find(|r| r.matches(day)) {
        return ClosureStatus::closed(ClosureReason::Weekoff, rule.label());
    }
    ClosureStatus::open()
}

pub fn is_closed(conn: &Connection, day: NaiveDate) -> anyhow::Result<ClosureStatus> {
    let holiday = queries::find_active_holiday_on(conn, day)?;
    let rules = queries::list_active_weekoffs(conn)?;
    Ok(resolve(day, holiday.as_ref(), &rules))
}

/// The week-off rule closing `day`, if one does.
pub fn weekoff_on(conn: &Connection, day: NaiveDate) -> anyhow::Result<Option<WeekOffRule>> {
    let rules = queries::list_active_weekoffs(conn)?;
    Ok(rules.into_iter().find(|r| r.matches(day)))
}
