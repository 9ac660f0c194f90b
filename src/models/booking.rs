use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub token: String,
    pub booking_date: NaiveDate,
    pub slot_id: String,
    pub status: BookingStatus,
    #[serde(flatten)]
    pub guest: GuestDetails,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Contact and case details captured with a booking. All optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub court_case_no: Option<String>,
    pub vehicle_no: Option<String>,
    pub chalan_no: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => anyhow::bail!("unknown booking status: {other:?}"),
        }
    }
}

/// Booking totals with the most recently created bookings.
#[derive(Debug, Clone, Serialize)]
pub struct BookingStats {
    pub total: i64,
    pub by_status: BTreeMap<BookingStatus, i64>,
    pub recent: Vec<Booking>,
}
