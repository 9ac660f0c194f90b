use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::dates::{self, parse_day};
use crate::errors::AppError;
use crate::models::{DayAvailability, Slot};
use crate::services::capacity;
use crate::state::AppState;

// GET /api/slots
pub async fn list_slots(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Slot>>, AppError> {
    let db = state.conn()?;
    Ok(Json(capacity::list_slots(&db)?))
}

// GET /api/slots/availability?month=YYYY-MM | ?from=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub month: Option<String>,
    pub from: Option<String>,
    pub slot_id: Option<String>,
}

pub async fn availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<DayAvailability>>, AppError> {
    let max_days = state.config.max_range_days;
    let slot_filter = query.slot_id.as_deref().filter(|s| !s.is_empty());

    let db = state.conn()?;
    let days = match (&query.month, &query.from) {
        (Some(month), _) => capacity::month_availability(&db, month, slot_filter, max_days)?,
        (None, from) => {
            let start = match from {
                Some(raw) => parse_day(raw).map_err(|e| AppError::invalid(e.to_string()))?,
                None => dates::today(),
            };
            capacity::window_availability(
                &db,
                start,
                state.config.availability_window_days,
                slot_filter,
                max_days,
            )?
        }
    };
    Ok(Json(days))
}

// PUT /api/slots/quota
#[derive(Deserialize)]
pub struct QuotaRequest {
    pub quota: i64,
    pub slot_id: Option<String>,
}

pub async fn update_quota(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuotaRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = {
        let mut db = state.conn()?;
        capacity::update_quota(&mut db, body.quota, body.slot_id.as_deref())?
    };
    Ok(Json(serde_json::json!({"ok": true, "updated": updated})))
}
