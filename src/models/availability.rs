use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureReason {
    Holiday,
    Weekoff,
}

/// Result of asking whether a day is closed for bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureStatus {
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ClosureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ClosureStatus {
    pub fn open() -> Self {
        Self {
            closed: false,
            reason: None,
            label: None,
        }
    }

    pub fn closed(reason: ClosureReason, label: impl Into<String>) -> Self {
        Self {
            closed: true,
            reason: Some(reason),
            label: Some(label.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub slot_id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub quota: i64,
    pub booked: i64,
    pub available: i64,
}

impl SlotAvailability {
    /// Remaining capacity for a slot. A closed day has none, whatever the quota.
    pub fn compute(slot: &Slot, booked: i64, closed: bool) -> Self {
        let available = if closed {
            0
        } else {
            (slot.quota - booked).max(0)
        };
        Self {
            slot_id: slot.id.clone(),
            name: slot.name.clone(),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            quota: slot.quota,
            booked,
            available,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub is_closed: bool,
    pub blocked_reason: Option<ClosureReason>,
    pub label: Option<String>,
    pub slots: Vec<SlotAvailability>,
}
