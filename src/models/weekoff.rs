use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{ordinal, week_of_month, weekday_index, weekday_name};

/// A recurring closure on one weekday.
///
/// `weeks` lists which occurrences of the weekday within a month are closed
/// (1..=5). An empty list, or one naming all five, closes every occurrence.
/// When `valid_from`/`valid_to` are set the rule only applies inside that
/// inclusive window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekOffRule {
    pub id: String,
    pub weekday: u8,
    pub weeks: Vec<u8>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub is_active: bool,
}

impl WeekOffRule {
    pub fn every_week(&self) -> bool {
        self.weeks.is_empty() || (1..=5).all(|w| self.weeks.contains(&w))
    }

    pub fn matches(&self, day: NaiveDate) -> bool {
        if !self.is_active || weekday_index(day) != self.weekday {
            return false;
        }
        if let (Some(from), Some(to)) = (self.valid_from, self.valid_to) {
            if day < from || day > to {
                return false;
            }
        }
        self.every_week() || self.weeks.contains(&week_of_month(day))
    }

    /// e.g. "Every Sunday" or "2nd, 4th Saturday".
    pub fn label(&self) -> String {
        let day = weekday_name(self.weekday);
        if self.every_week() {
            return format!("Every {day}");
        }
        let weeks = self
            .weeks
            .iter()
            .map(|w| ordinal(*w))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{weeks} {day}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rule(weekday: u8, weeks: &[u8]) -> WeekOffRule {
        WeekOffRule {
            id: "w".to_string(),
            weekday,
            weeks: weeks.to_vec(),
            valid_from: None,
            valid_to: None,
            is_active: true,
        }
    }

    #[test]
    fn test_empty_weeks_matches_every_occurrence() {
        let sundays = rule(0, &[]);
        for day in ["2025-06-01", "2025-06-08", "2025-06-15", "2025-06-22", "2025-06-29"] {
            assert!(sundays.matches(d(day)), "{day} should be closed");
        }
        assert!(!sundays.matches(d("2025-06-02")));
    }

    #[test]
    fn test_full_week_set_is_every_week() {
        let r = rule(6, &[1, 2, 3, 4, 5]);
        assert!(r.every_week());
        assert_eq!(r.label(), "Every Saturday");
    }

    #[test]
    fn test_specific_occurrences() {
        // 2nd and 4th Saturday of June 2025: 14th and 28th
        let r = rule(6, &[2, 4]);
        assert!(!r.matches(d("2025-06-07")));
        assert!(r.matches(d("2025-06-14")));
        assert!(!r.matches(d("2025-06-21")));
        assert!(r.matches(d("2025-06-28")));
        assert_eq!(r.label(), "2nd, 4th Saturday");
    }

    #[test]
    fn test_inactive_rule_never_matches() {
        let mut r = rule(0, &[]);
        r.is_active = false;
        assert!(!r.matches(d("2025-06-01")));
    }

    #[test]
    fn test_validity_window() {
        let mut r = rule(2, &[]);
        r.valid_from = Some(d("2025-06-05"));
        r.valid_to = Some(d("2025-06-20"));
        assert!(!r.matches(d("2025-06-03")));
        assert!(r.matches(d("2025-06-10")));
        assert!(r.matches(d("2025-06-17")));
        assert!(!r.matches(d("2025-06-24")));
    }
}
